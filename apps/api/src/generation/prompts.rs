// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for application content generation; enforces JSON-only output.
pub const APPLICATION_SYSTEM: &str =
    "You are an expert career writer who tailors resumes and cover letters to a specific job. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Generation prompt template. Replace every `{placeholder}` before sending.
pub const APPLICATION_PROMPT_TEMPLATE: &str = r#"Write a tailored resume and cover letter for this job.

JOB TITLE: {job_title}
COMPANY: {company}
LOCATION: {location}
SENIORITY: {seniority}
KEYWORDS: {keywords}
MODE: {ai_mode}
STUDENT APPLICANT: {student_mode}

JOB DESCRIPTION:
{job_description}

Return a JSON object with this EXACT schema (no extra fields):
{
  "resumeText": "plain-text resume",
  "coverLetterText": "plain-text cover letter"
}

{grounding}"#;
