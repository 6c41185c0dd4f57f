use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analysis::extraction::AnalysisMode;
use crate::analysis::ranking::{rank_candidates_for_job, RankingRunReport};
use crate::analysis::status::{stage, AiStatus, ANALYZABLE_STATUSES};
use crate::errors::AppError;
use crate::pipeline::batch::{settle_all, BatchItemError};
use crate::pipeline::runner::{process_application, PipelineOutcome};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BatchFile {
    pub id: Uuid,
    /// Bucket-relative storage path, used when no public URL exists yet.
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    /// Original upload filename, used as a naming fallback when the
    /// document itself carries no personal name.
    pub name: String,
}

#[derive(Deserialize)]
pub struct BatchAnalyzeRequest {
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[serde(default)]
    pub analysis_mode: Option<AnalysisMode>,
    pub files: Vec<BatchFile>,
}

#[derive(Serialize)]
pub struct BatchAnalyzeResponse {
    pub processed: usize,
    pub succeeded: usize,
    pub errors: Vec<BatchItemError>,
}

/// POST /api/v1/analyze/batch
///
/// Runs the pipeline for every listed upload concurrently and waits for all
/// of them. One item's failure never aborts its siblings.
pub async fn handle_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchAnalyzeRequest>,
) -> Result<Json<BatchAnalyzeResponse>, AppError> {
    if req.files.is_empty() {
        return Err(AppError::Validation("Batch contains no files".to_string()));
    }

    let mode = req.analysis_mode.unwrap_or_default();
    info!(
        "Starting batch analysis of {} file(s), mode={}",
        req.files.len(),
        mode.as_str()
    );

    // Attach the document reference and job before fanning out; the rows
    // were created at upload time and may predate both.
    for file in &req.files {
        let url = file.public_url.clone().or_else(|| file.storage_path.clone());
        sqlx::query(
            "UPDATE job_applications \
             SET resume_url = COALESCE($2, resume_url), \
                 job_id = COALESCE($3, job_id) \
             WHERE id = $1",
        )
        .bind(file.id)
        .bind(url)
        .bind(req.job_id)
        .execute(&state.db)
        .await?;
    }

    let items: Vec<(Uuid, String)> = req.files.into_iter().map(|f| (f.id, f.name)).collect();

    let batch = settle_all(items, move |id, name| {
        let state = state.clone();
        async move { process_application(&state, id, Some(&name), mode).await }
    })
    .await;

    Ok(Json(BatchAnalyzeResponse {
        processed: batch.total(),
        succeeded: batch.succeeded.len(),
        errors: batch.errors,
    }))
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub application_id: Uuid,
    #[serde(default)]
    pub analysis_mode: Option<AnalysisMode>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub application_id: Uuid,
    #[serde(flatten)]
    pub result: PipelineOutcome,
}

/// POST /api/v1/analyze
///
/// Runs the pipeline for one application inline and returns its terminal
/// outcome.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mode = req.analysis_mode.unwrap_or_default();
    let result =
        process_application(&state, req.application_id, req.filename.as_deref(), mode).await?;

    Ok(Json(AnalyzeResponse {
        application_id: req.application_id,
        result,
    }))
}

#[derive(Deserialize)]
pub struct RankRequest {
    pub job_id: Uuid,
}

#[derive(Serialize)]
pub struct RankResponse {
    /// Candidates that had no stored evaluation and were analyzed first.
    pub analyzed: usize,
    #[serde(flatten)]
    pub report: RankingRunReport,
}

/// POST /api/v1/analyze/rank
///
/// Ranks every finished candidate of a job against the job's requirements.
/// Candidates attached to the job that were never analyzed (talent-pool
/// additions) are analyzed first, with job context and the cache bypassed.
pub async fn handle_rank(
    State(state): State<AppState>,
    Json(req): Json<RankRequest>,
) -> Result<Json<RankResponse>, AppError> {
    let analyzable: Vec<String> = ANALYZABLE_STATUSES
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();

    let unanalyzed: Vec<Uuid> = sqlx::query_scalar(
        "UPDATE job_applications \
         SET execution_stage = $2, heartbeat = NULL \
         WHERE job_id = $1 AND ai_status = ANY($3) \
         RETURNING id",
    )
    .bind(req.job_id)
    .bind(stage::STARTING_JOB_ANALYSIS)
    .bind(&analyzable)
    .fetch_all(&state.db)
    .await?;

    let analyzed = unanalyzed.len();
    if analyzed > 0 {
        info!(
            "Analyzing {analyzed} candidate(s) of job {} before ranking",
            req.job_id
        );
        let items: Vec<(Uuid, ())> = unanalyzed.into_iter().map(|id| (id, ())).collect();
        let inner = state.clone();
        let batch = settle_all(items, move |id, ()| {
            let state = inner.clone();
            async move { process_application(&state, id, None, AnalysisMode::Normal).await }
        })
        .await;
        if !batch.errors.is_empty() {
            info!(
                "{} candidate(s) failed pre-ranking analysis and will be skipped",
                batch.errors.len()
            );
        }
    }

    let report = rank_candidates_for_job(&state.db, &state.llm, &state.retry, req.job_id).await?;
    Ok(Json(RankResponse { analyzed, report }))
}

#[derive(Deserialize)]
pub struct ReanalyzeRequest {
    pub job_id: Uuid,
    #[serde(default)]
    pub analysis_mode: Option<AnalysisMode>,
}

#[derive(Serialize)]
pub struct ReanalyzeResponse {
    pub job_id: Uuid,
    pub queued: usize,
}

/// POST /api/v1/candidates/reanalyze
///
/// Resets every finished candidate of a job back to PENDING and reprocesses
/// them in the background. The queued stage marks the rows so the dedup
/// cache is bypassed and the analysis actually reruns.
pub async fn handle_reanalyze(
    State(state): State<AppState>,
    Json(req): Json<ReanalyzeRequest>,
) -> Result<Json<ReanalyzeResponse>, AppError> {
    let mode = req.analysis_mode.unwrap_or_default();

    let ids: Vec<Uuid> = sqlx::query_scalar(
        "UPDATE job_applications \
         SET ai_status = $2, execution_stage = $3, ai_explanation = $4, \
             heartbeat = NULL \
         WHERE job_id = $1 AND ai_status = $5 \
         RETURNING id",
    )
    .bind(req.job_id)
    .bind(AiStatus::Pending.as_str())
    .bind(stage::QUEUED_REANALYSIS)
    .bind("Queued for reanalysis")
    .bind(AiStatus::Done.as_str())
    .fetch_all(&state.db)
    .await?;

    let queued = ids.len();
    info!("Queued {queued} candidate(s) of job {} for reanalysis", req.job_id);

    if queued > 0 {
        let items: Vec<(Uuid, ())> = ids.into_iter().map(|id| (id, ())).collect();
        tokio::spawn(async move {
            let batch = settle_all(items, move |id, ()| {
                let state = state.clone();
                async move { process_application(&state, id, None, mode).await }
            })
            .await;
            info!(
                "Reanalysis finished: {} succeeded, {} failed",
                batch.succeeded.len(),
                batch.errors.len()
            );
        });
    }

    Ok(Json(ReanalyzeResponse {
        job_id: req.job_id,
        queued,
    }))
}
