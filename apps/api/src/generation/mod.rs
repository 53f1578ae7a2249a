// Content generation for job applications.
// `ContentGenerator` is the only seam JobLifecycle depends on; backends are swapped at startup.
// All LLM calls go through llm_client.

pub mod content;
pub mod llm;
pub mod prompts;

pub use content::{ContentGenerator, GeneratedContent, TemplateContentGenerator};
pub use llm::LlmContentGenerator;
