//! LLM-backed content generator.
//!
//! Any failure (transport, API, malformed JSON, empty fields) surfaces as
//! `AppError::Upstream`, which JobLifecycle records as a `failed` job.

use async_trait::async_trait;
use tracing::info;

use crate::errors::AppError;
use crate::generation::content::{ContentGenerator, GeneratedContent};
use crate::generation::prompts::{APPLICATION_PROMPT_TEMPLATE, APPLICATION_SYSTEM};
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::LlmClient;
use crate::models::job::Job;

pub struct LlmContentGenerator(pub LlmClient);

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(&self, job: &Job) -> Result<GeneratedContent, AppError> {
        let prompt = build_prompt(job);
        info!("Requesting LLM content for job {}", job.id);

        let content: GeneratedContent = self
            .0
            .call_json(&prompt, APPLICATION_SYSTEM)
            .await
            .map_err(|e| AppError::Upstream(format!("content generation failed: {e}")))?;

        if content.resume_text.trim().is_empty() || content.cover_letter_text.trim().is_empty() {
            return Err(AppError::Upstream(
                "content generation returned empty text".to_string(),
            ));
        }
        Ok(content)
    }

    fn backend(&self) -> &'static str {
        "llm"
    }
}

fn build_prompt(job: &Job) -> String {
    let or_unspecified = |v: &Option<String>| {
        v.as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("unspecified")
            .to_string()
    };

    APPLICATION_PROMPT_TEMPLATE
        .replace("{job_title}", &job.job_title)
        .replace("{company}", job.company_or_default())
        .replace("{location}", &or_unspecified(&job.location))
        .replace("{seniority}", &or_unspecified(&job.seniority))
        .replace("{keywords}", &job.keywords.join(", "))
        .replace("{ai_mode}", &job.ai_mode)
        .replace("{student_mode}", if job.student_mode { "yes" } else { "no" })
        .replace("{job_description}", &job.job_description)
        .replace("{grounding}", GROUNDING_INSTRUCTION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::tests::sample_job;

    #[test]
    fn test_prompt_fills_every_placeholder() {
        let mut job = sample_job("j1", "u1");
        job.keywords = vec!["Rust".to_string(), "gRPC".to_string()];
        let prompt = build_prompt(&job);

        for placeholder in [
            "{job_title}",
            "{company}",
            "{location}",
            "{seniority}",
            "{keywords}",
            "{ai_mode}",
            "{student_mode}",
            "{job_description}",
            "{grounding}",
        ] {
            assert!(!prompt.contains(placeholder), "{placeholder} left unfilled");
        }
        assert!(prompt.contains("COMPANY: Company"));
        assert!(prompt.contains("KEYWORDS: Rust, gRPC"));
        assert!(prompt.contains("LOCATION: unspecified"));
    }

    #[test]
    fn test_response_schema_is_camel_case() {
        let parsed: GeneratedContent =
            serde_json::from_str(r#"{"resumeText": "r", "coverLetterText": "c"}"#).unwrap();
        assert_eq!(parsed.resume_text, "r");
        assert_eq!(parsed.cover_letter_text, "c");
    }
}
