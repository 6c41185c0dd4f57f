//! The per-application pipeline: download, extract, gate, analyze, persist.
//!
//! One invocation owns one application row from claim to terminal state.
//! Progress is written through `ai_status` plus the finer `execution_stage`
//! label, each write refreshing the heartbeat that the recovery sweep
//! watches. Every failure path ends in a durable ERROR row; the caller never
//! needs to clean up after a returned error.

use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::extraction::{
    self, salvage_contact, should_replace_email, should_replace_name, AnalysisContext,
    AnalysisMode, JobContext,
};
use crate::analysis::gate;
use crate::analysis::hashing::content_hash;
use crate::analysis::schema::CandidateProfile;
use crate::analysis::scoring::{weighted_score, DEFAULT_TECH_WEIGHT};
use crate::analysis::status::{stage, AiStatus, ANALYZABLE_STATUSES, CACHE_BYPASS_STAGES};
use crate::errors::AppError;
use crate::models::candidate::CandidateApplicationRow;
use crate::models::job::JobRow;
use crate::pipeline::heartbeat::{advance, update_heartbeat};
use crate::state::AppState;

/// Below this many characters the text cannot support a full analysis; we
/// salvage contact details and stop.
const MIN_ANALYZABLE_CHARS: usize = 150;

/// Below this the document carries nothing worth keeping; the row is
/// deleted outright.
const MIN_SALVAGE_CHARS: usize = 50;

const APPLICATION_COLUMNS: &str = "id, candidate_name, candidate_email, resume_url, job_id, \
     ai_status, execution_stage, heartbeat, criteria_evaluation, ai_score, \
     ai_explanation, resume_hash, created_at";

/// Terminal result of one pipeline run.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Full analysis completed and persisted.
    Completed { score: u8 },
    /// An identical document was already analyzed for this job in the same
    /// mode; its evaluation was copied instead of re-running the agents.
    CompletedFromCache { score: Option<i32> },
    /// The gate rejected the document, or it was too short to keep. The row
    /// no longer exists.
    Deleted { reason: String },
    /// Text was readable enough to salvage contact details but not to
    /// analyze. The row is left in ERROR with whatever identity was found.
    Unreadable,
}

/// Runs the full pipeline for one application. On any error the row is
/// marked ERROR with the failure text before the error propagates.
pub async fn process_application(
    state: &AppState,
    application_id: Uuid,
    fallback_name: Option<&str>,
    mode: AnalysisMode,
) -> Result<PipelineOutcome, AppError> {
    match run_pipeline(state, application_id, fallback_name, mode).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            record_failure(&state.db, application_id, &e.to_string()).await;
            Err(e)
        }
    }
}

async fn run_pipeline(
    state: &AppState,
    application_id: Uuid,
    fallback_name: Option<&str>,
    mode: AnalysisMode,
) -> Result<PipelineOutcome, AppError> {
    let app = load_application(&state.db, application_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;

    let mut current = AiStatus::parse(&app.ai_status)
        .ok_or_else(|| AppError::Validation(format!("Unknown ai_status '{}'", app.ai_status)))?;
    if !ANALYZABLE_STATUSES.contains(&current) {
        let detail = if current.is_terminal() {
            "already in a terminal state"
        } else {
            "already being processed"
        };
        return Err(AppError::Validation(format!(
            "Application {application_id} is {} ({detail})",
            app.ai_status
        )));
    }

    // Reanalysis and whole-job runs must not reuse earlier evaluations.
    let bypass_cache = matches!(
        app.execution_stage.as_deref(),
        Some(s) if CACHE_BYPASS_STAGES.contains(&s)
    );

    let resume_url = app
        .resume_url
        .clone()
        .ok_or_else(|| AppError::Validation("Application has no document attached".to_string()))?;

    step(&state.db, application_id, &mut current, AiStatus::Uploading, stage::STARTING).await?;

    update_heartbeat(&state.db, application_id, stage::FETCHING_JOB).await?;
    let job = match app.job_id {
        Some(job_id) => {
            let job = load_job(&state.db, job_id).await?;
            if job.is_none() {
                warn!("Job {job_id} not found, analyzing as talent pool");
            }
            job
        }
        None => None,
    };

    update_heartbeat(&state.db, application_id, stage::EXTRACTING).await?;
    let bytes = state.retry.run(|| state.store.fetch(&resume_url)).await?;
    let filename = filename_from_url(&resume_url);
    let text = state
        .extractor
        .extract(&bytes, filename)
        .map_err(|e| AppError::Extraction(e.to_string()))?;

    step(&state.db, application_id, &mut current, AiStatus::Extracted, stage::EXTRACTING).await?;

    if text.chars().count() < MIN_ANALYZABLE_CHARS {
        return handle_short_text(&state.db, &app, &text).await;
    }

    let hash = content_hash(&text);
    sqlx::query("UPDATE job_applications SET resume_hash = $2 WHERE id = $1")
        .bind(application_id)
        .bind(&hash)
        .execute(&state.db)
        .await?;

    if !bypass_cache {
        if let Some(cached) = find_cached_sibling(&state.db, &app, &hash, mode).await? {
            return reuse_cached_evaluation(&state.db, application_id, &cached).await;
        }
    }

    step(&state.db, application_id, &mut current, AiStatus::Analyzing, stage::VALIDATING).await?;

    let (verdict, gate_usage) = gate::classify(&state.llm, &state.retry, &text).await?;
    if !verdict.is_resume {
        info!(
            "Document gate rejected application {application_id}: {}",
            verdict.justification
        );
        delete_application(&state.db, application_id).await?;
        return Ok(PipelineOutcome::Deleted {
            reason: verdict.justification,
        });
    }

    update_heartbeat(&state.db, application_id, stage::ANALYZING).await?;

    let ctx = AnalysisContext {
        candidate_name: app
            .candidate_name
            .clone()
            .or_else(|| fallback_name.map(str::to_string)),
        job: job.as_ref().map(JobContext::from_row),
        mode,
    };
    let (profile, analyze_usage) =
        extraction::analyze(&state.llm, &state.retry, &text, &ctx).await?;
    let usage = gate_usage.add(analyze_usage);

    let score = weighted_score(&profile.base_scores, DEFAULT_TECH_WEIGHT);

    update_heartbeat(&state.db, application_id, stage::SAVING_RESULTS).await?;
    persist_results(state, &app, &profile, score, mode, &hash, &usage).await?;

    info!(
        "Application {application_id} analyzed: score={score}, tokens={}",
        usage.total_tokens()
    );
    Ok(PipelineOutcome::Completed { score })
}

/// Advances the status when the transition is legal from where the row
/// actually is; otherwise only the stage and heartbeat are stamped. Lets a
/// row resumed mid-pipeline (recovered UPLOADING or EXTRACTED states) rejoin
/// without walking through states it is already past.
async fn step(
    pool: &PgPool,
    application_id: Uuid,
    current: &mut AiStatus,
    target: AiStatus,
    stage_label: &str,
) -> Result<(), AppError> {
    if current.can_transition_to(target) {
        advance(pool, application_id, target, stage_label).await?;
        *current = target;
    } else {
        update_heartbeat(pool, application_id, stage_label).await?;
    }
    Ok(())
}

async fn load_application(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<CandidateApplicationRow>, AppError> {
    let row = sqlx::query_as::<_, CandidateApplicationRow>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn load_job(pool: &PgPool, id: Uuid) -> Result<Option<JobRow>, AppError> {
    let row = sqlx::query_as::<_, JobRow>(
        "SELECT id, title, description, requirements, department, seniority, \
         location, salary_range, essential_requirements, created_at \
         FROM jobs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Salvages contact details from barely-readable text, or deletes the row
/// when there is nothing to keep.
async fn handle_short_text(
    pool: &PgPool,
    app: &CandidateApplicationRow,
    text: &str,
) -> Result<PipelineOutcome, AppError> {
    if text.chars().count() < MIN_SALVAGE_CHARS {
        info!(
            "Application {} document is unreadable ({} chars), deleting",
            app.id,
            text.chars().count()
        );
        delete_application(pool, app.id).await?;
        return Ok(PipelineOutcome::Deleted {
            reason: "Document produced no readable text".to_string(),
        });
    }

    let (name, email) = salvage_contact(text);
    let name = name.filter(|n| should_replace_name(app.candidate_name.as_deref(), n));
    let email = email.filter(|e| should_replace_email(app.candidate_email.as_deref(), e));

    sqlx::query(
        "UPDATE job_applications \
         SET candidate_name = COALESCE($2, candidate_name), \
             candidate_email = COALESCE($3, candidate_email), \
             ai_status = $4, execution_stage = $5, ai_explanation = $6, \
             heartbeat = NOW() \
         WHERE id = $1",
    )
    .bind(app.id)
    .bind(name)
    .bind(email)
    .bind(AiStatus::Error.as_str())
    .bind(stage::ERROR)
    .bind("Document text too short for analysis; contact details salvaged where possible")
    .execute(pool)
    .await?;

    Ok(PipelineOutcome::Unreadable)
}

/// Looks for a finished sibling of the same job with an identical document
/// analyzed in the same mode.
async fn find_cached_sibling(
    pool: &PgPool,
    app: &CandidateApplicationRow,
    hash: &str,
    mode: AnalysisMode,
) -> Result<Option<CandidateApplicationRow>, AppError> {
    let row = sqlx::query_as::<_, CandidateApplicationRow>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM job_applications \
         WHERE id != $1 AND job_id IS NOT DISTINCT FROM $2 \
           AND resume_hash = $3 AND ai_status = $4 \
           AND criteria_evaluation IS NOT NULL \
           AND criteria_evaluation->>'analysis_mode' = $5 \
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(app.id)
    .bind(app.job_id)
    .bind(hash)
    .bind(AiStatus::Done.as_str())
    .bind(mode.as_str())
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn reuse_cached_evaluation(
    pool: &PgPool,
    application_id: Uuid,
    cached: &CandidateApplicationRow,
) -> Result<PipelineOutcome, AppError> {
    info!(
        "Application {application_id} matches already-analyzed document {}, reusing evaluation",
        cached.id
    );

    sqlx::query(
        "UPDATE job_applications \
         SET criteria_evaluation = $2, ai_score = $3, ai_explanation = $4, \
             ai_status = $5, execution_stage = $6, heartbeat = NOW() \
         WHERE id = $1",
    )
    .bind(application_id)
    .bind(&cached.criteria_evaluation)
    .bind(cached.ai_score)
    .bind(&cached.ai_explanation)
    .bind(AiStatus::Done.as_str())
    .bind(stage::DONE_CACHED)
    .execute(pool)
    .await?;

    Ok(PipelineOutcome::CompletedFromCache {
        score: cached.ai_score,
    })
}

/// Writes the full result payload. If the full write fails, a minimal
/// payload is written instead so the analysis is never lost to a schema
/// mismatch on a secondary column.
async fn persist_results(
    state: &AppState,
    app: &CandidateApplicationRow,
    profile: &CandidateProfile,
    score: u8,
    mode: AnalysisMode,
    hash: &str,
    usage: &crate::llm_client::Usage,
) -> Result<(), AppError> {
    let blob = criteria_blob(profile, score, mode);

    let name = Some(profile.candidate_name.clone())
        .filter(|n| profile.has_real_name() && should_replace_name(app.candidate_name.as_deref(), n));
    let email = profile
        .candidate_email
        .clone()
        .filter(|e| should_replace_email(app.candidate_email.as_deref(), e));

    let full_write = sqlx::query(
        "UPDATE job_applications \
         SET ai_status = $2, execution_stage = $3, ai_score = $4, \
             ai_explanation = $5, criteria_evaluation = $6, resume_hash = $7, \
             candidate_name = COALESCE($8, candidate_name), \
             candidate_email = COALESCE($9, candidate_email), \
             ai_tokens_input = $10, ai_tokens_output = $11, \
             ai_tokens_total = $12, ai_cost = $13, \
             heartbeat = NOW() \
         WHERE id = $1",
    )
    .bind(app.id)
    .bind(AiStatus::Done.as_str())
    .bind(stage::DONE)
    .bind(score as i32)
    .bind(&profile.consolidated_rationale)
    .bind(&blob)
    .bind(hash)
    .bind(name)
    .bind(email)
    .bind(usage.prompt_tokens as i64)
    .bind(usage.completion_tokens as i64)
    .bind(usage.total_tokens() as i64)
    .bind(usage.cost_usd())
    .execute(&state.db)
    .await;

    if let Err(e) = full_write {
        warn!(
            "Full result write failed for application {}, falling back to minimal payload: {e}",
            app.id
        );
        sqlx::query(
            "UPDATE job_applications \
             SET ai_status = $2, execution_stage = $3, ai_score = $4, \
                 ai_explanation = $5, criteria_evaluation = $6 \
             WHERE id = $1",
        )
        .bind(app.id)
        .bind(AiStatus::Done.as_str())
        .bind(stage::DONE)
        .bind(score as i32)
        .bind(&profile.consolidated_rationale)
        .bind(&blob)
        .execute(&state.db)
        .await?;
    }

    Ok(())
}

/// The stored evaluation: the profile itself plus run metadata that lets
/// later reads (ranking, cache reuse, UI) interpret it without guessing.
fn criteria_blob(profile: &CandidateProfile, score: u8, mode: AnalysisMode) -> Value {
    let mut blob = serde_json::to_value(profile).unwrap_or_else(|_| json!({}));
    if let Some(map) = blob.as_object_mut() {
        map.insert("analysis_mode".to_string(), json!(mode.as_str()));
        map.insert("match_global".to_string(), json!(score));
        map.insert(
            "weights_used".to_string(),
            json!({ "technical": DEFAULT_TECH_WEIGHT }),
        );
    }
    blob
}

async fn delete_application(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM job_applications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks the row ERROR with the failure text. Best effort: a write failure
/// here is logged, not propagated, because the original error matters more.
async fn record_failure(pool: &PgPool, application_id: Uuid, error: &str) {
    let result = sqlx::query(
        "UPDATE job_applications \
         SET ai_status = $2, execution_stage = $3, ai_explanation = $4, \
             heartbeat = NOW() \
         WHERE id = $1",
    )
    .bind(application_id)
    .bind(AiStatus::Error.as_str())
    .bind(stage::ERROR)
    .bind(format!("Processing failed: {error}"))
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!("Could not record failure for application {application_id}: {e}");
    }
}

fn filename_from_url(resume_url: &str) -> &str {
    let path = resume_url.split('?').next().unwrap_or(resume_url);
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::schema::CandidateProfile;

    #[test]
    fn test_filename_from_public_url() {
        assert_eq!(
            filename_from_url("https://storage.example.com/v1/resumes/bulk/ana.pdf?token=x"),
            "ana.pdf"
        );
    }

    #[test]
    fn test_filename_from_bare_key() {
        assert_eq!(filename_from_url("cv.pdf"), "cv.pdf");
    }

    #[test]
    fn test_criteria_blob_carries_run_metadata() {
        let profile: CandidateProfile = serde_json::from_str("{}").unwrap();
        let blob = criteria_blob(&profile.normalize(), 72, AnalysisMode::Strict);

        assert_eq!(blob["analysis_mode"], "strict");
        assert_eq!(blob["match_global"], 72);
        assert_eq!(blob["weights_used"]["technical"], DEFAULT_TECH_WEIGHT);
        // The profile fields sit at the top level next to the metadata.
        assert_eq!(blob["schema_version"], "1.2");
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let v = serde_json::to_value(PipelineOutcome::Completed { score: 80 }).unwrap();
        assert_eq!(v["outcome"], "completed");
        assert_eq!(v["score"], 80);

        let v = serde_json::to_value(PipelineOutcome::Deleted {
            reason: "Not a resume".to_string(),
        })
        .unwrap();
        assert_eq!(v["outcome"], "deleted");
    }
}
