//! Job Lifecycle: drives a job through `queued → generating → completed | failed`.
//!
//! There is no in-process lock. Every transition is a read followed by a conditional
//! replace on the etag that was read, so two concurrent `generate` calls for the same
//! job race on the `queued → generating` replace and exactly one of them wins. The
//! loser gets `AppError::Conflict` and is expected to re-read; nothing here retries.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{ContentGenerator, GeneratedContent};
use crate::models::job::{Job, JobOutputs, JobStatus, Output, TransitionError};
use crate::repositories::{JobRepository, Versioned};
use crate::store::StoreError;

pub const DEFAULT_AI_MODE: &str = "standard";

// ────────────────────────────────────────────────────────────────────────────
// Request / result types
// ────────────────────────────────────────────────────────────────────────────

/// Caller-supplied fields for a new job. Everything is optional at the type level so
/// that missing required fields surface as `AppError::Validation`, not as a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub seniority: Option<String>,
    /// Kept raw so a malformed value can be normalized instead of rejected.
    pub keywords: Option<Value>,
    pub ai_mode: Option<String>,
    pub student_mode: Option<bool>,
    pub resume_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub job: Job,
    pub already_generated: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// JobLifecycle
// ────────────────────────────────────────────────────────────────────────────

pub struct JobLifecycle {
    jobs: JobRepository,
    generator: Arc<dyn ContentGenerator>,
    /// A `generating` job untouched for longer than this may be reclaimed by a new
    /// `generate` call. `None` disables reclaiming entirely.
    stale_after: Option<Duration>,
}

impl JobLifecycle {
    pub fn new(
        jobs: JobRepository,
        generator: Arc<dyn ContentGenerator>,
        stale_after: Option<Duration>,
    ) -> Self {
        Self {
            jobs,
            generator,
            stale_after,
        }
    }

    /// Validates and persists a new job in `queued` state.
    pub async fn create(&self, user_id: &str, fields: NewJob) -> Result<Job, AppError> {
        let user_id = require("userId", Some(user_id))?;
        let job_title = require("jobTitle", fields.job_title.as_deref())?;
        let job_description = require("jobDescription", fields.job_description.as_deref())?;

        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4().to_string(),
            user_id,
            job_title,
            company: clean(fields.company),
            website: clean(fields.website),
            location: clean(fields.location),
            seniority: clean(fields.seniority),
            keywords: normalize_keywords(fields.keywords),
            job_description,
            ai_mode: clean(fields.ai_mode).unwrap_or_else(|| DEFAULT_AI_MODE.to_string()),
            student_mode: fields.student_mode.unwrap_or(false),
            resume_id: clean(fields.resume_id),
            status: JobStatus::Queued,
            outputs: JobOutputs::default(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            failure_reason: None,
        };

        let what = format!("Job {}", job.id);
        let created = self
            .jobs
            .create(job)
            .await
            .map_err(|e| AppError::from_store(e, &what))?;

        info!(
            "Created job {} for user {}",
            created.value.id, created.value.user_id
        );
        Ok(created.value)
    }

    pub async fn get(&self, job_id: &str, user_id: &str) -> Result<Job, AppError> {
        Ok(self.load(job_id, user_id).await?.value)
    }

    /// All jobs of a user, newest first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Job>, AppError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .list(user_id)
            .await?
            .into_iter()
            .map(|v| v.value)
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    /// Runs generation for a job.
    ///
    /// Steps:
    /// 1. read the job (NotFound if absent)
    /// 2. completed with both outputs → return it untouched, `already_generated = true`
    /// 3. conditional replace to `generating` (Conflict if someone else got there first)
    /// 4. call the content generator; on failure persist `failed` and surface Upstream
    /// 5. build outputs with synthesized file names
    /// 6. conditional replace to `completed`; a store failure here is recorded as
    ///    `failed` too, so the job never stays in `generating`
    pub async fn generate(
        &self,
        job_id: &str,
        user_id: &str,
    ) -> Result<GenerationOutcome, AppError> {
        let current = self.load(job_id, user_id).await?;

        if current.value.status == JobStatus::Completed && current.value.has_all_outputs() {
            info!("Job {job_id} already generated; returning stored outputs");
            return Ok(GenerationOutcome {
                job: current.value,
                already_generated: true,
            });
        }

        let claimed = self.claim(current).await?;
        info!(
            "Generating content for job {job_id} (backend: {})",
            self.generator.backend()
        );

        let generated = self.generator.generate(&claimed.value).await;
        let content = match generated {
            Ok(content) => content,
            Err(err) => return Err(self.record_failure(claimed, err).await),
        };

        let mut job = claimed.value.clone();
        job.outputs = build_outputs(&job, content);
        job.transition_to(JobStatus::Completed, Utc::now())
            .map_err(|e| transition_conflict(&job.id, e))?;

        let written = self.jobs.replace(job, &claimed.etag).await;
        let completed = match written {
            Ok(completed) => completed,
            // Someone else moved the job on; it is theirs to finish.
            Err(e @ (StoreError::PreconditionFailed | StoreError::NotFound)) => {
                return Err(AppError::from_store(e, format!("Job {job_id}")));
            }
            Err(e) => return Err(self.record_failure(claimed, AppError::Store(e)).await),
        };

        info!("Job {job_id} completed");
        Ok(GenerationOutcome {
            job: completed.value,
            already_generated: false,
        })
    }

    /// Explicitly moves a non-terminal job to `failed`.
    pub async fn mark_failed(
        &self,
        job_id: &str,
        user_id: &str,
        reason: &str,
    ) -> Result<Job, AppError> {
        let Versioned { value: mut job, etag } = self.load(job_id, user_id).await?;

        job.transition_to(JobStatus::Failed, Utc::now())
            .map_err(|e| transition_conflict(job_id, e))?;
        job.failure_reason = Some(reason.to_string());

        let failed = self
            .jobs
            .replace(job, &etag)
            .await
            .map_err(|e| AppError::from_store(e, format!("Job {job_id}")))?;

        warn!("Job {job_id} marked failed: {reason}");
        Ok(failed.value)
    }

    async fn load(&self, job_id: &str, user_id: &str) -> Result<Versioned<Job>, AppError> {
        self.jobs
            .get(job_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))
    }

    /// Conditional `→ generating` replace. Only one concurrent caller can succeed
    /// against a given etag.
    async fn claim(&self, current: Versioned<Job>) -> Result<Versioned<Job>, AppError> {
        let Versioned { value: mut job, etag } = current;
        let now = Utc::now();

        if job.status == JobStatus::Generating {
            if !self.is_stale(&job, now) {
                return Err(AppError::Conflict(format!(
                    "Job {} is already being generated",
                    job.id
                )));
            }
            warn!(
                "Reclaiming job {} stuck in generating since {}",
                job.id, job.updated_at
            );
        }

        job.transition_to(JobStatus::Generating, now)
            .map_err(|e| transition_conflict(&job.id, e))?;

        let job_id = job.id.clone();
        self.jobs.replace(job, &etag).await.map_err(|e| {
            let err = AppError::from_store(e, format!("Job {job_id}"));
            if matches!(err, AppError::Conflict(_)) {
                warn!("Lost generation race for job {job_id}");
            }
            err
        })
    }

    fn is_stale(&self, job: &Job, now: DateTime<Utc>) -> bool {
        self.stale_after
            .map(|ttl| now - job.updated_at >= ttl)
            .unwrap_or(false)
    }

    /// Persists `failed` with the error recorded, then returns the error to surface.
    /// If the failed state itself cannot be written, that is logged and the original
    /// error still surfaces.
    async fn record_failure(&self, claimed: Versioned<Job>, cause: AppError) -> AppError {
        let reason = cause.to_string();
        let Versioned { value: mut job, etag } = claimed;
        let job_id = job.id.clone();

        match job.transition_to(JobStatus::Failed, Utc::now()) {
            Ok(()) => {
                job.failure_reason = Some(reason.clone());
                match self.jobs.replace(job, &etag).await {
                    Ok(_) => warn!("Job {job_id} failed during generation: {reason}"),
                    Err(e) => error!("Could not persist failed state for job {job_id}: {e}"),
                }
            }
            Err(e) => error!("Could not mark job {job_id} failed: {e}"),
        }

        match cause {
            AppError::Upstream(_) => cause,
            other => AppError::Upstream(other.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn require(field: &str, value: Option<&str>) -> Result<String, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Absent or malformed keywords become an empty list. Only an array made entirely
/// of strings is accepted, and its order is preserved.
fn normalize_keywords(raw: Option<Value>) -> Vec<String> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

pub fn output_file_name(kind: &str, job: &Job) -> String {
    format!("{kind} - {} - {}.txt", job.company_or_default(), job.job_title)
}

fn build_outputs(job: &Job, content: GeneratedContent) -> JobOutputs {
    JobOutputs {
        resume: Some(Output {
            text: content.resume_text,
            file_name: output_file_name("Resume", job),
            generated_at: Utc::now(),
        }),
        cover_letter: Some(Output {
            text: content.cover_letter_text,
            file_name: output_file_name("Cover Letter", job),
            generated_at: Utc::now(),
        }),
    }
}

fn transition_conflict(job_id: &str, err: TransitionError) -> AppError {
    AppError::Conflict(format!("Job {job_id}: {err}"))
}
