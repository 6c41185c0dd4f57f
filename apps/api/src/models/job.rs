use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A job posting row. The pipeline reads it for extraction context and for
/// the ranking agent's evaluation directives.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub department: Option<String>,
    pub seniority: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub essential_requirements: Option<Value>,
    pub created_at: DateTime<Utc>,
}
