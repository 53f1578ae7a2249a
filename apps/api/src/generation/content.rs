//! Content Generator: pluggable, trait-based producer of resume and cover-letter text.
//!
//! Default: `TemplateContentGenerator` (deterministic, no I/O, cannot fail).
//! Alternative: `LlmContentGenerator` (Claude via `llm_client`).
//!
//! Implementations must not touch the job document; JobLifecycle owns every write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::job::Job;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub resume_text: String,
    pub cover_letter_text: String,
}

/// Carried in `AppState` (inside JobLifecycle) as `Arc<dyn ContentGenerator>`.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, job: &Job) -> Result<GeneratedContent, AppError>;

    /// Backend name, logged with every generation run.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// TemplateContentGenerator
// ────────────────────────────────────────────────────────────────────────────

pub struct TemplateContentGenerator;

#[async_trait]
impl ContentGenerator for TemplateContentGenerator {
    async fn generate(&self, job: &Job) -> Result<GeneratedContent, AppError> {
        Ok(GeneratedContent {
            resume_text: render_resume(job),
            cover_letter_text: render_cover_letter(job),
        })
    }

    fn backend(&self) -> &'static str {
        "template"
    }
}

fn render_resume(job: &Job) -> String {
    let company = job.company_or_default();
    let mut text = format!("Tailored resume for {} at {}\n\n", job.job_title, company);

    if let Some(seniority) = job.seniority.as_deref().filter(|s| !s.trim().is_empty()) {
        text.push_str(&format!("Target level: {seniority}\n"));
    }
    if let Some(location) = job.location.as_deref().filter(|s| !s.trim().is_empty()) {
        text.push_str(&format!("Location: {location}\n"));
    }

    text.push_str("\nSummary\n");
    text.push_str(&format!(
        "Candidate focused on the {} role, aligned with the responsibilities described by {}.\n",
        job.job_title, company
    ));

    if !job.keywords.is_empty() {
        text.push_str("\nCore Skills\n");
        for keyword in &job.keywords {
            text.push_str(&format!("- {keyword}\n"));
        }
    }

    if job.student_mode {
        text.push_str("\nEducation\nEducation and coursework listed first for early-career applicants.\n");
    } else {
        text.push_str("\nExperience\nMost relevant experience listed first.\n");
    }

    text.push_str(&format!("\nGenerated in {} mode.\n", job.ai_mode));
    text
}

fn render_cover_letter(job: &Job) -> String {
    let company = job.company_or_default();
    let mut text = format!("Dear {company} Hiring Team,\n\n");
    text.push_str(&format!(
        "I am excited to apply for the {} position at {}.",
        job.job_title, company
    ));
    if !job.keywords.is_empty() {
        text.push_str(&format!(
            " My background in {} matches what you are looking for.",
            job.keywords.join(", ")
        ));
    }
    text.push_str("\n\nThank you for your consideration.\n\nSincerely,\nApplicant\n");
    text
}
