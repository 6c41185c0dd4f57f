use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::extractor::TextExtractor;
use crate::llm_client::LlmClient;
use crate::pipeline::retry::RetryPolicy;
use crate::storage::DocumentStore;

/// Shared application state passed to all route handlers.
///
/// Storage and extraction sit behind trait objects so the pipeline can be
/// wired with in-memory fakes in tests.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    pub store: Arc<dyn DocumentStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub retry: RetryPolicy,
    pub config: Config,
}
