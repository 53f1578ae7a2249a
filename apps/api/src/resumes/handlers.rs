//! Axum route handlers for the Resumes API.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::auth::Principal;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::resume::Resume;
use crate::resumes::{ResumeUpload, UploadSlot};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDefaultRequest {
    pub resume_id: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeListResponse {
    pub resumes: Vec<Resume>,
    /// Resolved with the most-recently-updated rule when several are flagged.
    pub default_resume_id: Option<String>,
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ResumeListResponse>, AppError> {
    let resumes = state.resumes.list(&principal.user_id).await?;
    let default_resume_id = state
        .resumes
        .effective_default(&principal.user_id)
        .await?
        .map(|r| r.id);
    Ok(Json(ResumeListResponse {
        resumes,
        default_resume_id,
    }))
}

/// POST /api/v1/resumes/default
///
/// Idempotent. A partial failure (500 with `updatedIds`) is safe to retry as-is.
pub async fn handle_set_default(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(request): AppJson<SetDefaultRequest>,
) -> Result<Json<OkResponse>, AppError> {
    if request.resume_id.trim().is_empty() {
        return Err(AppError::Validation("resumeId is required".to_string()));
    }
    state
        .resumes
        .set_default(&principal.user_id, request.resume_id.trim())
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/v1/resumes
///
/// Multipart body: `file` (required) and `slot` (`current` | `new`, default `current`).
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut slot: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("resume").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("could not read file: {e}")))?;
                file = Some((original_name, content_type, bytes));
            }
            Some("slot") => {
                slot = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("invalid slot: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let (original_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    let upload = ResumeUpload {
        original_name,
        content_type,
        bytes,
        slot: UploadSlot::parse(slot.as_deref())?,
    };

    let resume = state.uploads.save(&principal.user_id, upload).await?;
    Ok((StatusCode::CREATED, Json(resume)))
}
