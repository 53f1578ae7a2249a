//! Axum route handlers for the Jobs API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::Principal;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::jobs::{GenerationOutcome, NewJob};
use crate::models::job::Job;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FailJobRequest {
    pub reason: String,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    principal: Principal,
    AppJson(fields): AppJson<NewJob>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = state.jobs.create(&principal.user_id, fields).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Job>>, AppError> {
    Ok(Json(state.jobs.list(&principal.user_id).await?))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.jobs.get(&job_id, &principal.user_id).await?))
}

/// POST /api/v1/jobs/:id/generate
///
/// Safe to retry: a completed job is returned as-is with `alreadyGenerated: true`.
/// A 409 means another run holds the job; re-read before retrying.
pub async fn handle_generate(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
) -> Result<Json<GenerationOutcome>, AppError> {
    Ok(Json(state.jobs.generate(&job_id, &principal.user_id).await?))
}

/// POST /api/v1/jobs/:id/fail
pub async fn handle_fail_job(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
    AppJson(request): AppJson<FailJobRequest>,
) -> Result<Json<Job>, AppError> {
    if request.reason.trim().is_empty() {
        return Err(AppError::Validation("reason cannot be empty".to_string()));
    }
    let job = state
        .jobs
        .mark_failed(&job_id, &principal.user_id, request.reason.trim())
        .await?;
    Ok(Json(job))
}
