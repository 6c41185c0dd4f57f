//! Extraction & scoring agent (agent 1) — the main LLM call.
//!
//! Turns résumé text plus optional job context into a validated
//! `CandidateProfile`. Also hosts the identity heuristics: the regex salvage
//! pass for barely-readable documents and the rules deciding when an
//! extracted name/email may overwrite what the upload recorded.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::gate::truncate_chars;
use crate::analysis::prompts::{EXTRACTION_SYSTEM_TEMPLATE, STRICT_MODE_DIRECTIVE};
use crate::analysis::schema::CandidateProfile;
use crate::errors::AppError;
use crate::llm_client::{LlmClient, Usage};
use crate::models::job::JobRow;
use crate::pipeline::retry::RetryPolicy;

const ANALYSIS_EXCERPT_CHARS: usize = 15_000;

/// Analysis strictness requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    #[default]
    Normal,
    Strict,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Normal => "normal",
            AnalysisMode::Strict => "strict",
        }
    }
}

/// Job fields interpolated into the extraction prompt.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
}

impl JobContext {
    pub fn from_row(job: &JobRow) -> Self {
        Self {
            title: job.title.clone(),
            description: job.description.clone(),
            requirements: job.requirements.clone(),
        }
    }
}

/// Per-call context for the extraction agent. The candidate name comes from
/// the upload filename and is only a naming fallback — the prompt instructs
/// the model to prefer the real name found in the text.
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub candidate_name: Option<String>,
    pub job: Option<JobContext>,
    pub mode: AnalysisMode,
}

/// Builds the context block appended to the extraction system prompt.
/// No job means the general talent pool.
pub fn job_context_prompt(job: Option<&JobContext>) -> String {
    match job {
        None => "CONTEXT: Talent pool (general professional profile analysis)".to_string(),
        Some(j) => format!(
            "CONTEXT: Specific job\nTITLE: \"{}\"\nDESCRIPTION: \"{}\"\nREQUIREMENTS: \"{}\"",
            j.title,
            j.description
                .as_deref()
                .unwrap_or("General profile evaluation."),
            j.requirements
                .as_deref()
                .unwrap_or("Good communication and relevant experience."),
        ),
    }
}

/// Runs the extraction call and coerces the response against the versioned
/// schema. JSON that parses but lacks optional fields is accepted with
/// defaults; an unparseable response is retried and then surfaces as a hard
/// error.
pub async fn analyze(
    llm: &LlmClient,
    retry: &RetryPolicy,
    resume_text: &str,
    ctx: &AnalysisContext,
) -> Result<(CandidateProfile, Usage), AppError> {
    let mode_directive = match ctx.mode {
        AnalysisMode::Normal => "",
        AnalysisMode::Strict => STRICT_MODE_DIRECTIVE,
    };
    let system = EXTRACTION_SYSTEM_TEMPLATE
        .replace("{mode_directive}", mode_directive)
        .replace("{job_context}", &job_context_prompt(ctx.job.as_ref()));

    let user = format!(
        "Candidate: {}\nText:\n{}",
        ctx.candidate_name.as_deref().unwrap_or("Unknown"),
        truncate_chars(resume_text, ANALYSIS_EXCERPT_CHARS)
    );

    let (profile, usage) = retry
        .run(|| llm.call_json::<CandidateProfile>(&system, &user, 0.3))
        .await
        .map_err(|e| AppError::Llm(format!("Resume analysis failed: {e}")))?;

    Ok((profile.normalize(), usage))
}

// ────────────────────────────────────────────────────────────────────────────
// Identity heuristics
// ────────────────────────────────────────────────────────────────────────────

/// Whether the extracted personal name should replace the stored one.
/// The stored name often comes from a filename; it is replaced when absent,
/// shorter than the extracted name, or when it still looks like a filename.
pub fn should_replace_name(stored: Option<&str>, extracted: &str) -> bool {
    if extracted.trim().is_empty() {
        return false;
    }
    match stored {
        None => true,
        Some(s) => {
            let s = s.trim();
            s.is_empty() || s.len() < extracted.trim().len() || s.contains('.')
        }
    }
}

/// The extracted email only fills a missing or invalid stored email.
pub fn should_replace_email(stored: Option<&str>, extracted: &str) -> bool {
    if !extracted.contains('@') {
        return false;
    }
    match stored {
        None => true,
        Some(s) => !s.contains('@'),
    }
}

/// Best-effort name/email salvage for documents whose extraction came back
/// nearly empty (scanned PDFs, images). Keeps at least the contact row
/// usable even when full analysis is impossible.
pub fn salvage_contact(text: &str) -> (Option<String>, Option<String>) {
    let email_re =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z0-9_-]+").expect("valid regex");
    let email = email_re
        .find(text)
        .map(|m| m.as_str().to_lowercase());

    // Prefer an explicit "Name:" label, then a leading capitalized sequence.
    let labeled_re = Regex::new(
        r"(?i)\bname\s*[:\-]\s*([A-ZÀ-Þ][a-zà-ÿ'\-]+(?: [A-ZÀ-Þ][a-zà-ÿ'\-]+){1,3})",
    )
    .expect("valid regex");
    let leading_re =
        Regex::new(r"^([A-ZÀ-Þ][a-zà-ÿ'\-]+(?: [A-ZÀ-Þ][a-zà-ÿ'\-]+){1,3})").expect("valid regex");

    let name = labeled_re
        .captures(text)
        .or_else(|| leading_re.captures(text.trim_start()))
        .map(|c| c[1].to_string());

    (name, email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_context_prompt_talent_pool() {
        let prompt = job_context_prompt(None);
        assert!(prompt.contains("Talent pool"));
    }

    #[test]
    fn test_job_context_prompt_specific_job() {
        let job = JobContext {
            title: "Data Engineer".to_string(),
            description: Some("Build pipelines".to_string()),
            requirements: None,
        };
        let prompt = job_context_prompt(Some(&job));
        assert!(prompt.contains("Specific job"));
        assert!(prompt.contains("Data Engineer"));
        assert!(prompt.contains("Build pipelines"));
        // Missing requirements fall back to a generic line.
        assert!(prompt.contains("relevant experience"));
    }

    #[test]
    fn test_name_replacement_rules() {
        assert!(should_replace_name(None, "Ana Souza"));
        assert!(should_replace_name(Some(""), "Ana Souza"));
        // Filename-looking stored names are replaced.
        assert!(should_replace_name(Some("ana-souza.pdf"), "Ana Souza"));
        // Longer extracted names win over short fragments.
        assert!(should_replace_name(Some("Ana"), "Ana Souza"));
        // A good stored name is kept.
        assert!(!should_replace_name(Some("Ana Clara Souza"), "Ana Souza"));
        // An empty extraction never overwrites.
        assert!(!should_replace_name(Some("Ana Souza"), "  "));
    }

    #[test]
    fn test_email_replacement_rules() {
        assert!(should_replace_email(None, "ana@example.com"));
        assert!(should_replace_email(Some("not-an-email"), "ana@example.com"));
        assert!(!should_replace_email(
            Some("stored@example.com"),
            "ana@example.com"
        ));
        assert!(!should_replace_email(None, "no-at-sign"));
    }

    #[test]
    fn test_salvage_finds_labeled_name_and_email() {
        let (name, email) =
            salvage_contact("Name: Ana Souza Skills: Python Contact: Ana.Souza@Example.com");
        assert_eq!(name.as_deref(), Some("Ana Souza"));
        assert_eq!(email.as_deref(), Some("ana.souza@example.com"));
    }

    #[test]
    fn test_salvage_leading_capitalized_name() {
        let (name, _) = salvage_contact("Ana Souza Senior Data Engineer");
        // Grabs up to four leading capitalized words.
        assert_eq!(name.as_deref(), Some("Ana Souza Senior Data"));
    }

    #[test]
    fn test_salvage_nothing_found() {
        let (name, email) = salvage_contact("0000 1111 2222");
        assert!(name.is_none());
        assert!(email.is_none());
    }

    #[test]
    fn test_analysis_mode_serde() {
        let mode: AnalysisMode = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(mode, AnalysisMode::Strict);
        assert_eq!(AnalysisMode::default(), AnalysisMode::Normal);
        assert_eq!(mode.as_str(), "strict");
    }
}
