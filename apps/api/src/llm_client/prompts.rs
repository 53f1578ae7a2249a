// Cross-cutting prompt fragments shared by every LLM-backed service.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Common instruction appended to all generation prompts.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Use only facts present in the job details above. \
    Do NOT invent employers, degrees, certifications, or metrics. \
    If a detail is not supported by the input, leave it out.";
