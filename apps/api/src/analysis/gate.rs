//! Document Gate (agent 0) — résumé / non-résumé classifier.
//!
//! Runs before the expensive extraction call. A negative verdict means the
//! caller deletes the application record: if it isn't a résumé, it doesn't
//! exist. A malformed classifier response is a retryable LLM error; there is
//! no gate-specific timeout beyond the per-call retry policy.

use serde::{Deserialize, Serialize};

use crate::analysis::prompts::DOCUMENT_GATE_SYSTEM;
use crate::errors::AppError;
use crate::llm_client::{LlmClient, Usage};
use crate::pipeline::retry::RetryPolicy;

/// Only the head of the document is needed to classify it.
const GATE_EXCERPT_CHARS: usize = 3_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateVerdict {
    pub is_resume: bool,
    #[serde(default)]
    pub justification: String,
}

/// Classifies extracted text. Returns the verdict plus token usage so the
/// caller can aggregate cost across agents.
pub async fn classify(
    llm: &LlmClient,
    retry: &RetryPolicy,
    text: &str,
) -> Result<(GateVerdict, Usage), AppError> {
    let excerpt = truncate_chars(text, GATE_EXCERPT_CHARS);
    let user = format!("Document:\n{excerpt}");

    retry
        .run(|| llm.call_json::<GateVerdict>(DOCUMENT_GATE_SYSTEM, &user, 0.0))
        .await
        .map_err(|e| AppError::Llm(format!("Document gate failed: {e}")))
}

/// Truncates to at most `max_chars` characters without splitting a
/// character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
