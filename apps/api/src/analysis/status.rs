//! Candidate application status state machine and execution stages.
//!
//! Status is the coarse lifecycle (`PENDING → UPLOADING → EXTRACTED →
//! ANALYZING → DONE`); `execution_stage` is the fine-grained, free-form
//! progress label used for observability and staleness detection. The two
//! are deliberately separate columns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiStatus {
    Pending,
    New,
    Uploading,
    Extracted,
    Analyzing,
    Done,
    Error,
}

impl AiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiStatus::Pending => "PENDING",
            AiStatus::New => "NEW",
            AiStatus::Uploading => "UPLOADING",
            AiStatus::Extracted => "EXTRACTED",
            AiStatus::Analyzing => "ANALYZING",
            AiStatus::Done => "DONE",
            AiStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<AiStatus> {
        match s {
            "PENDING" => Some(AiStatus::Pending),
            "NEW" => Some(AiStatus::New),
            "UPLOADING" => Some(AiStatus::Uploading),
            "EXTRACTED" => Some(AiStatus::Extracted),
            "ANALYZING" => Some(AiStatus::Analyzing),
            "DONE" => Some(AiStatus::Done),
            "ERROR" => Some(AiStatus::Error),
            _ => None,
        }
    }

    /// Whether a transition is legal. Any state may fail into ERROR.
    /// ANALYZING may fall back to PENDING (stuck-job recovery) and DONE may
    /// re-enter via PENDING (explicit reanalyze). ERROR is terminal.
    pub fn can_transition_to(&self, next: AiStatus) -> bool {
        use AiStatus::*;
        match (self, next) {
            (Error, _) => false,
            (_, Error) => true,
            (Pending | New, Uploading) => true,
            (Pending | New | Uploading, Extracted) => true,
            (Extracted, Analyzing) => true,
            (Analyzing, Done) => true,
            // Advisory recovery: stale ANALYZING rows are reset, not failed.
            (Analyzing, Pending) => true,
            // Reanalyze re-enters the pipeline from DONE.
            (Done, Pending) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AiStatus::Done | AiStatus::Error)
    }
}

/// Execution stage labels. Free-form in the schema; these are the values the
/// pipeline itself writes.
pub mod stage {
    pub const STARTING: &str = "STARTING";
    pub const FETCHING_JOB: &str = "FETCHING_JOB";
    pub const EXTRACTING: &str = "EXTRACTING";
    pub const VALIDATING: &str = "VALIDATING";
    pub const ANALYZING: &str = "ANALYZING";
    pub const SAVING_RESULTS: &str = "SAVING_RESULTS";
    pub const DONE: &str = "DONE";
    pub const DONE_CACHED: &str = "DONE_CACHED";
    pub const ERROR: &str = "ERROR";
    pub const RECOVERED_STUCK: &str = "RECOVERED_STUCK";
    pub const QUEUED_REANALYSIS: &str = "QUEUED_REANALYSIS";
    pub const STARTING_JOB_ANALYSIS: &str = "STARTING_JOB_ANALYSIS";
}

/// Stages that must bypass the identical-text analysis cache: both mark a
/// deliberate request to recompute against (new) job context.
pub const CACHE_BYPASS_STAGES: [&str; 2] = [stage::QUEUED_REANALYSIS, stage::STARTING_JOB_ANALYSIS];

/// Statuses eligible for claiming by the analysis pipeline.
pub const ANALYZABLE_STATUSES: [AiStatus; 4] = [
    AiStatus::Pending,
    AiStatus::New,
    AiStatus::Uploading,
    AiStatus::Extracted,
];
