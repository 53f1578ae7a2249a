mod auth;
mod blob;
mod config;
mod db;
mod errors;
mod extract;
mod generation;
mod jobs;
mod llm_client;
mod models;
mod repositories;
mod resumes;
mod routes;
mod state;
mod store;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::blob::S3BlobStore;
use crate::config::{Config, GeneratorBackend, StoreBackend};
use crate::db::{create_pool, ensure_schema};
use crate::generation::{ContentGenerator, LlmContentGenerator, TemplateContentGenerator};
use crate::jobs::JobLifecycle;
use crate::llm_client::LlmClient;
use crate::repositories::{JobRepository, ResumeRepository};
use crate::resumes::{DefaultResumeCoordinator, ResumeUploads};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{DocumentStore, MemoryDocumentStore, PostgresDocumentStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting applytrack API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize document store
    let store = build_document_store(&config).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let blobs = Arc::new(S3BlobStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_endpoint.clone(),
    ));
    info!("S3 client initialized");

    // Initialize content generator (template by default, swap via CONTENT_GENERATOR)
    let generator = build_content_generator(&config)?;

    let stale_after = config.generation_stale_after();
    match stale_after {
        Some(ttl) => info!("Stale generation claims reclaimable after {}s", ttl.num_seconds()),
        None => info!("Stale generation reclaim disabled"),
    }

    // Build app state
    let resume_repo = ResumeRepository::new(store.clone());
    let state = AppState {
        jobs: Arc::new(JobLifecycle::new(
            JobRepository::new(store),
            generator,
            stale_after,
        )),
        resumes: Arc::new(DefaultResumeCoordinator::new(resume_repo.clone())),
        uploads: Arc::new(ResumeUploads::new(
            resume_repo,
            blobs,
            config.max_upload_bytes,
        )),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict CORS origins once the web client's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_document_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match config.document_store {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres store"))?;
            let pool = create_pool(database_url).await?;
            ensure_schema(&pool).await?;
            Ok(Arc::new(PostgresDocumentStore::new(pool)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory document store; data will not survive a restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}

fn build_content_generator(config: &Config) -> Result<Arc<dyn ContentGenerator>> {
    match config.content_generator {
        GeneratorBackend::Template => {
            info!("Content generator: template");
            Ok(Arc::new(TemplateContentGenerator))
        }
        GeneratorBackend::Llm => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY is required for the llm generator"))?;
            let llm = LlmClient::new(api_key)?;
            info!("Content generator: llm (model: {})", llm_client::MODEL);
            Ok(Arc::new(LlmContentGenerator(llm)))
        }
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "applytrack-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
