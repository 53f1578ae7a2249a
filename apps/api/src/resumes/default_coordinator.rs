//! Single-default resume coordination.
//!
//! Invariant: per user, at most one resume has `is_default = true` whenever the full
//! partition is observed with no writer in flight.
//!
//! The store has no multi-document transaction, so `set_default` is a convergent
//! read-all / write-only-diffs loop of independent conditional replaces. Re-running it
//! with the same target always reaches the same end state. While a run is in flight
//! (or after one aborted) a reader may see two defaults; `effective_default` resolves
//! that by taking the most recently modified one. The target is written first so that
//! rule already points at it if the loop stops early.

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::resume::Resume;
use crate::repositories::{ResumeRepository, Versioned};

pub struct DefaultResumeCoordinator {
    resumes: ResumeRepository,
}

impl DefaultResumeCoordinator {
    pub fn new(resumes: ResumeRepository) -> Self {
        Self { resumes }
    }

    /// Marks `resume_id` as the user's only default resume.
    ///
    /// Resumes whose flag is already correct are not rewritten. A failed rewrite aborts
    /// the loop with `AppError::PartialFailure` listing the ids already updated.
    pub async fn set_default(&self, user_id: &str, resume_id: &str) -> Result<(), AppError> {
        let all = self.resumes.list(user_id).await?;
        if all.is_empty() {
            return Err(AppError::NotFound(format!(
                "No resumes found for user {user_id}"
            )));
        }
        if !all.iter().any(|r| r.value.id == resume_id) {
            return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
        }

        let (target, others): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|r| r.value.id == resume_id);
        let pending: Vec<Versioned<Resume>> = target
            .into_iter()
            .chain(others)
            .filter(|r| r.value.is_default != (r.value.id == resume_id))
            .collect();

        let mut updated_ids = Vec::with_capacity(pending.len());
        for Versioned { value: mut resume, etag } in pending {
            resume.is_default = resume.id == resume_id;
            resume.updated_at = Some(Utc::now().max(resume.last_modified()));

            let id = resume.id.clone();
            if let Err(e) = self.resumes.replace(resume, &etag).await {
                warn!(
                    "Setting default resume {resume_id} for user {user_id} stopped at {id} \
                     after updating {updated_ids:?}: {e}"
                );
                return Err(AppError::PartialFailure {
                    updated_ids,
                    message: format!("failed to update resume {id}: {e}"),
                });
            }
            updated_ids.push(id);
        }

        info!(
            "Default resume for user {user_id} is now {resume_id} ({} rewrites)",
            updated_ids.len()
        );
        Ok(())
    }

    /// The resume readers should treat as default. With several flagged, the most
    /// recently modified wins; ties go to the greater id.
    pub async fn effective_default(&self, user_id: &str) -> Result<Option<Resume>, AppError> {
        let flagged = self.resumes.list_where(user_id, |r| r.is_default).await?;
        Ok(pick_effective_default(flagged.into_iter().map(|v| v.value)))
    }

    /// All resumes of a user, most recently uploaded first.
    pub async fn list(&self, user_id: &str) -> Result<Vec<Resume>, AppError> {
        let mut resumes: Vec<Resume> = self
            .resumes
            .list(user_id)
            .await?
            .into_iter()
            .map(|v| v.value)
            .collect();
        resumes.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(resumes)
    }
}

pub(crate) fn pick_effective_default(flagged: impl Iterator<Item = Resume>) -> Option<Resume> {
    flagged.max_by(|a, b| {
        a.last_modified()
            .cmp(&b.last_modified())
            .then_with(|| a.id.cmp(&b.id))
    })
}
