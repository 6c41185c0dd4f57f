//! Heartbeat stamping and stuck-job recovery.
//!
//! Every stage change refreshes `heartbeat`; a periodic sweep resets
//! ANALYZING rows whose heartbeat went stale back to PENDING with stage
//! `RECOVERED_STUCK`, making them eligible for reprocessing. There is no
//! distributed lock: recovery is advisory and idempotent, and
//! double-processing an item is tolerated because later writes simply
//! overwrite status (last write wins).

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::status::{stage, AiStatus};
use crate::errors::AppError;

/// An ANALYZING row with no progress for this long is considered stuck.
pub const STUCK_THRESHOLD_MINUTES: i64 = 5;

/// How often the recovery sweep runs, independent of any request.
const SWEEP_INTERVAL_SECS: u64 = 60;

/// Stamps the heartbeat and execution stage for one application.
pub async fn update_heartbeat(
    pool: &PgPool,
    application_id: Uuid,
    stage: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE job_applications SET heartbeat = NOW(), execution_stage = $2 WHERE id = $1")
        .bind(application_id)
        .bind(stage)
        .execute(pool)
        .await?;
    Ok(())
}

/// Advances the status and stage together, refreshing the heartbeat.
pub async fn advance(
    pool: &PgPool,
    application_id: Uuid,
    status: AiStatus,
    stage: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE job_applications \
         SET ai_status = $2, execution_stage = $3, heartbeat = NOW() \
         WHERE id = $1",
    )
    .bind(application_id)
    .bind(status.as_str())
    .bind(stage)
    .execute(pool)
    .await?;
    Ok(())
}

/// Staleness predicate. A missing heartbeat on an ANALYZING row counts as
/// stale — the worker died before its first stamp.
pub fn is_stale(heartbeat: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match heartbeat {
        None => true,
        Some(hb) => now - hb > threshold,
    }
}

/// Resets every stuck ANALYZING row to PENDING / `RECOVERED_STUCK` with the
/// heartbeat cleared. Returns how many rows were recovered.
pub async fn recover_stuck_applications(pool: &PgPool) -> Result<u64, AppError> {
    let cutoff = Utc::now() - Duration::minutes(STUCK_THRESHOLD_MINUTES);

    let result = sqlx::query(
        "UPDATE job_applications \
         SET ai_status = $1, execution_stage = $2, heartbeat = NULL \
         WHERE ai_status = $3 AND (heartbeat IS NULL OR heartbeat < $4)",
    )
    .bind(AiStatus::Pending.as_str())
    .bind(stage::RECOVERED_STUCK)
    .bind(AiStatus::Analyzing.as_str())
    .bind(cutoff)
    .execute(pool)
    .await?;

    let recovered = result.rows_affected();
    if recovered > 0 {
        info!("Recovered {recovered} stuck application(s), reset to PENDING");
    }
    Ok(recovered)
}

/// Spawns the periodic recovery sweep. Runs for the lifetime of the process.
pub fn spawn_recovery_sweep(pool: PgPool) {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            if let Err(e) = recover_stuck_applications(&pool).await {
                warn!("Recovery sweep failed: {e}");
            }
        }
    });
}
