use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A candidate application row — the unit of work for the analysis pipeline.
///
/// Other subsystems (the pipeline board, the public form) read and write the
/// same table; this struct enumerates only the fields the pipeline depends
/// on. `criteria_evaluation` holds the structured profile as an opaque JSON
/// blob, `execution_stage` is a free-form progress label and `heartbeat` is
/// the liveness timestamp driving stuck-job recovery.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateApplicationRow {
    pub id: Uuid,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub resume_url: Option<String>,
    /// Absent means the general talent pool.
    pub job_id: Option<Uuid>,
    pub ai_status: String,
    pub execution_stage: Option<String>,
    pub heartbeat: Option<DateTime<Utc>>,
    pub criteria_evaluation: Option<Value>,
    pub ai_score: Option<i32>,
    /// Human-readable note: progress messages while running, terminal error
    /// text on failure.
    pub ai_explanation: Option<String>,
    pub resume_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}
