use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder used in output file names when a job has no company.
pub const DEFAULT_COMPANY: &str = "Company";

/// Job lifecycle state.
///
/// ```text
/// queued ──► generating ──► completed
///    │           │
///    └───────────┴────────► failed
/// ```
///
/// `completed` and `failed` are terminal. `generating → generating` is only used to
/// reclaim a stale claim and never leaves the non-terminal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Generating)
                | (Generating, Generating)
                | (Generating, Completed)
                | (Queued, Failed)
                | (Generating, Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Generating => write!(f, "generating"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("invalid job state transition: {from} -> {to}")]
    Invalid { from: JobStatus, to: JobStatus },

    #[error("job cannot complete without both resume and cover letter outputs")]
    MissingOutputs,
}

/// A single generated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub text: String,
    pub file_name: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutputs {
    pub resume: Option<Output>,
    pub cover_letter: Option<Output>,
}

/// A tracked job application, partitioned by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub user_id: String,
    pub job_title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub seniority: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub job_description: String,
    pub ai_mode: String,
    #[serde(default)]
    pub student_mode: bool,
    #[serde(default)]
    pub resume_id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub outputs: JobOutputs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Job {
    pub fn has_all_outputs(&self) -> bool {
        self.outputs.resume.is_some() && self.outputs.cover_letter.is_some()
    }

    pub fn company_or_default(&self) -> &str {
        self.company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_COMPANY)
    }

    /// Bumps `updated_at` without ever moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = self.updated_at.max(now);
    }

    /// Applies a state-machine transition and stamps `updated_at`.
    /// Entering `completed` also stamps `completed_at` and requires both outputs.
    pub fn transition_to(
        &mut self,
        next: JobStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::Invalid {
                from: self.status,
                to: next,
            });
        }
        if next == JobStatus::Completed && !self.has_all_outputs() {
            return Err(TransitionError::MissingOutputs);
        }

        self.status = next;
        self.touch(now);
        if next == JobStatus::Completed {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }
}
