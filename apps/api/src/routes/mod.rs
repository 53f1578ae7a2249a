pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        .route("/api/v1/jobs/:id/generate", post(jobs::handle_generate))
        .route("/api/v1/jobs/:id/fail", post(jobs::handle_fail_job))
        // Resumes API
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes)
                .post(resumes::handle_upload_resume)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/resumes/default", post(resumes::handle_set_default))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::USER_ID_HEADER;
    use crate::blob::tests::MemoryBlobStore;
    use crate::config::{Config, GeneratorBackend, StoreBackend};
    use crate::generation::TemplateContentGenerator;
    use crate::jobs::JobLifecycle;
    use crate::models::resume::tests::sample_resume;
    use crate::repositories::{JobRepository, ResumeRepository};
    use crate::resumes::{DefaultResumeCoordinator, ResumeUploads};
    use crate::store::{DocumentStore, MemoryDocumentStore};

    fn test_config() -> Config {
        Config {
            document_store: StoreBackend::Memory,
            database_url: None,
            s3_bucket: "test".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            content_generator: GeneratorBackend::Template,
            anthropic_api_key: None,
            generation_stale_after_secs: None,
            max_upload_bytes: 1024,
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn test_app() -> (Router, ResumeRepository) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let resume_repo = ResumeRepository::new(store.clone());
        let config = test_config();
        let state = AppState {
            jobs: Arc::new(JobLifecycle::new(
                JobRepository::new(store),
                Arc::new(TemplateContentGenerator),
                None,
            )),
            resumes: Arc::new(DefaultResumeCoordinator::new(resume_repo.clone())),
            uploads: Arc::new(ResumeUploads::new(
                resume_repo.clone(),
                Arc::new(MemoryBlobStore::default()),
                config.max_upload_bytes,
            )),
            config,
        };
        (build_router(state), resume_repo)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, user: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(USER_ID_HEADER, user)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app();
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_and_generate_job_over_http() {
        let (app, _) = test_app();

        let (status, job) = send(
            &app,
            post_json(
                "/api/v1/jobs",
                "u1",
                json!({"jobTitle": "Backend Engineer", "jobDescription": "Build APIs"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(job["status"], "queued");
        let id = job["id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/jobs/{id}/generate");
        let (status, body) = send(&app, post_json(&uri, "u1", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyGenerated"], false);
        assert_eq!(body["job"]["status"], "completed");
        assert_eq!(
            body["job"]["outputs"]["resume"]["fileName"],
            "Resume - Company - Backend Engineer.txt"
        );

        let (_, again) = send(&app, post_json(&uri, "u1", json!({}))).await;
        assert_eq!(again["alreadyGenerated"], true);
    }

    #[tokio::test]
    async fn test_error_mapping_over_http() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            post_json("/api/v1/jobs", "u1", json!({"jobTitle": "Only title"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &app,
            post_json("/api/v1/jobs/missing/generate", "u1", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let unauthenticated = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs")
            .header("content-type", "application/json")
            .body(Body::from(json!({}).to_string()))
            .unwrap();
        let (status, _) = send(&app, unauthenticated).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_mistyped_json_fields_are_validation_errors() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/jobs",
                "u1",
                json!({"jobTitle": "T", "jobDescription": "D", "studentMode": "yes"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("studentMode"));

        let (status, body) = send(
            &app,
            post_json("/api/v1/resumes/default", "u1", json!({"resumeId": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let broken = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs")
            .header(USER_ID_HEADER, "u1")
            .header("content-type", "application/json")
            .body(Body::from("{\"jobTitle\": "))
            .unwrap();
        let (status, body) = send(&app, broken).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_set_default_resume_over_http() {
        let (app, repo) = test_app();
        repo.create(sample_resume("r1", "u1", false)).await.unwrap();
        repo.create(sample_resume("r2", "u1", true)).await.unwrap();

        let (status, body) = send(
            &app,
            post_json("/api/v1/resumes/default", "u1", json!({"resumeId": "r1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let request = Request::get("/api/v1/resumes")
            .header(USER_ID_HEADER, "u1")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["defaultResumeId"], "r1");
        assert_eq!(body["resumes"].as_array().unwrap().len(), 2);

        let (status, _) = send(
            &app,
            post_json("/api/v1/resumes/default", "u1", json!({"resumeId": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_resume_multipart() {
        let (app, _) = test_app();
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"cv.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             %PDF-1.7\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/resumes")
            .header(USER_ID_HEADER, "u1")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, resume) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(resume["id"], "u1-current");
        assert_eq!(resume["isDefault"], true);
        assert_eq!(resume["originalName"], "cv.pdf");
    }
}
