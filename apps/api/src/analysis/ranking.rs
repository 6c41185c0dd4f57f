//! Ranking agent (agent 2) — job-specific semantic match.
//!
//! Re-scores already-extracted candidates against one job's requirements.
//! Runs only for applications whose extraction output exists (status DONE);
//! produces a `RankingResult` independent of the profile's own base scores,
//! upserted per (application, job) pair.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::prompts::{RANKING_PROMPT_TEMPLATE, RANKING_SYSTEM};
use crate::analysis::schema::CandidateProfile;
use crate::analysis::status::AiStatus;
use crate::errors::AppError;
use crate::llm_client::{LlmClient, MODEL};
use crate::models::candidate::CandidateApplicationRow;
use crate::models::job::JobRow;
use crate::pipeline::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approved,
    Interview,
    Rejected,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approved => "APPROVED",
            Recommendation::Interview => "INTERVIEW",
            Recommendation::Rejected => "REJECTED",
        }
    }
}

/// Fixed-shape ranking output. Unlike the extraction profile this schema is
/// strict: a response that does not validate is a hard error for that
/// candidate only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingResult {
    pub semantic_match_score: f64,
    pub matched_skills: Vec<String>,
    pub skills_gap: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub ai_reasoning: String,
    pub recommendation: Recommendation,
}

/// Interpolates the ranking prompt from the job row and the candidate's
/// stored profile.
pub fn build_ranking_prompt(
    job: &JobRow,
    candidate_name: &str,
    profile: &CandidateProfile,
) -> String {
    RANKING_PROMPT_TEMPLATE
        .replace("{{job_title}}", &job.title)
        .replace(
            "{{job_department}}",
            job.department.as_deref().unwrap_or("Not specified"),
        )
        .replace(
            "{{job_seniority}}",
            job.seniority.as_deref().unwrap_or("Not specified"),
        )
        .replace(
            "{{job_location}}",
            job.location.as_deref().unwrap_or("Not specified"),
        )
        .replace(
            "{{job_salary}}",
            job.salary_range.as_deref().unwrap_or("Negotiable"),
        )
        .replace(
            "{{job_description}}",
            job.description.as_deref().unwrap_or(""),
        )
        .replace(
            "{{job_essential_requirements}}",
            &job.essential_requirements
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "[]".to_string()),
        )
        .replace("{{candidate_name}}", candidate_name)
        .replace("{{candidate_summary}}", &profile.professional_summary)
        .replace(
            "{{candidate_skills}}",
            &serde_json::to_string(&profile.top_skills).unwrap_or_else(|_| "[]".to_string()),
        )
        .replace("{{candidate_seniority}}", &profile.estimated_seniority)
}

/// Ranks a single candidate against the job.
pub async fn rank(
    llm: &LlmClient,
    retry: &RetryPolicy,
    job: &JobRow,
    candidate_name: &str,
    profile: &CandidateProfile,
) -> Result<RankingResult, AppError> {
    let prompt = build_ranking_prompt(job, candidate_name, profile);

    let (result, _usage) = retry
        .run(|| llm.call_json::<RankingResult>(RANKING_SYSTEM, &prompt, 0.1))
        .await
        .map_err(|e| AppError::Llm(format!("Ranking failed for '{candidate_name}': {e}")))?;

    Ok(result)
}

/// Upserts the ranking result keyed by (application, job). Rerunning the
/// ranking for the same pair overwrites; it never creates duplicates.
pub async fn save_ranking(
    pool: &PgPool,
    application_id: Uuid,
    job_id: Uuid,
    result: &RankingResult,
) -> Result<(), AppError> {
    let decision_log = json!({
        "model": MODEL,
        "analyzed_at": Utc::now(),
        "application_id": application_id,
    });

    sqlx::query(
        r#"
        INSERT INTO screening_matrix
            (application_id, job_id, semantic_match_score, matched_skills,
             skills_gap, strengths, weaknesses, ai_reasoning, recommendation,
             auditable_decision_log, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
        ON CONFLICT (application_id, job_id) DO UPDATE SET
            semantic_match_score = EXCLUDED.semantic_match_score,
            matched_skills = EXCLUDED.matched_skills,
            skills_gap = EXCLUDED.skills_gap,
            strengths = EXCLUDED.strengths,
            weaknesses = EXCLUDED.weaknesses,
            ai_reasoning = EXCLUDED.ai_reasoning,
            recommendation = EXCLUDED.recommendation,
            auditable_decision_log = EXCLUDED.auditable_decision_log,
            updated_at = NOW()
        "#,
    )
    .bind(application_id)
    .bind(job_id)
    .bind(result.semantic_match_score.round() as i32)
    .bind(json!(result.matched_skills))
    .bind(json!(result.skills_gap))
    .bind(json!(result.strengths))
    .bind(json!(result.weaknesses))
    .bind(&result.ai_reasoning)
    .bind(result.recommendation.as_str())
    .bind(decision_log)
    .execute(pool)
    .await?;

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct RankingItemError {
    pub application_id: Uuid,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RankingRunReport {
    pub job_id: Uuid,
    pub ranked: usize,
    pub errors: Vec<RankingItemError>,
}

/// Ranks every DONE candidate of a job, settle-all.
///
/// Failing to load the job aborts the whole run; a single candidate's
/// failure (bad stored profile, LLM error, validation error) is recorded and
/// never aborts the others.
pub async fn rank_candidates_for_job(
    pool: &PgPool,
    llm: &LlmClient,
    retry: &RetryPolicy,
    job_id: Uuid,
) -> Result<RankingRunReport, AppError> {
    let job = sqlx::query_as::<_, JobRow>(
        "SELECT id, title, description, requirements, department, seniority, \
         location, salary_range, essential_requirements, created_at \
         FROM jobs WHERE id = $1",
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let candidates = sqlx::query_as::<_, CandidateApplicationRow>(
        "SELECT id, candidate_name, candidate_email, resume_url, job_id, \
         ai_status, execution_stage, heartbeat, criteria_evaluation, ai_score, \
         ai_explanation, resume_hash, created_at \
         FROM job_applications \
         WHERE job_id = $1 AND ai_status = $2 AND criteria_evaluation IS NOT NULL",
    )
    .bind(job_id)
    .bind(AiStatus::Done.as_str())
    .fetch_all(pool)
    .await?;

    info!(
        "Ranking {} extracted candidates for job '{}'",
        candidates.len(),
        job.title
    );

    let mut tasks = JoinSet::new();
    for app in candidates {
        let pool = pool.clone();
        let llm = llm.clone();
        let retry = *retry;
        let job = job.clone();
        tasks.spawn(async move {
            let result = rank_one(&pool, &llm, &retry, &job, &app).await;
            (app.id, result)
        });
    }

    let mut ranked = 0usize;
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => ranked += 1,
            Ok((id, Err(e))) => {
                error!("Ranking failed for application {id}: {e}");
                errors.push(RankingItemError {
                    application_id: id,
                    error: e.to_string(),
                });
            }
            Err(join_err) => {
                error!("Ranking task panicked: {join_err}");
            }
        }
    }

    Ok(RankingRunReport {
        job_id,
        ranked,
        errors,
    })
}

async fn rank_one(
    pool: &PgPool,
    llm: &LlmClient,
    retry: &RetryPolicy,
    job: &JobRow,
    app: &CandidateApplicationRow,
) -> Result<(), AppError> {
    let evaluation = app
        .criteria_evaluation
        .clone()
        .ok_or_else(|| AppError::Validation("Candidate has no stored evaluation".to_string()))?;

    // The stored blob coerces through the same schema that produced it.
    let profile: CandidateProfile = serde_json::from_value(evaluation)
        .map_err(|e| AppError::Validation(format!("Stored evaluation is unreadable: {e}")))?;

    let profile = profile.normalize();
    let candidate_name = app.candidate_name.as_deref().unwrap_or("Unknown");
    let result = rank(llm, retry, job, candidate_name, &profile).await?;

    save_ranking(pool, app.id, job.id, &result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_job() -> JobRow {
        JobRow {
            id: Uuid::nil(),
            title: "Backend Engineer".to_string(),
            description: Some("Build APIs".to_string()),
            requirements: Some("Rust, SQL".to_string()),
            department: Some("Engineering".to_string()),
            seniority: Some("Senior".to_string()),
            location: Some("Remote".to_string()),
            salary_range: None,
            essential_requirements: Some(json!(["English", "Driver's license"])),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_ranking_result_parses() {
        let json_str = r#"{
            "semantic_match_score": 82,
            "matched_skills": ["Rust", "SQL"],
            "skills_gap": ["Kubernetes"],
            "strengths": ["Strong systems background"],
            "weaknesses": ["No cloud experience"],
            "ai_reasoning": "Good technical fit, minor infra gap.",
            "recommendation": "INTERVIEW"
        }"#;
        let result: RankingResult = serde_json::from_str(json_str).unwrap();
        assert_eq!(result.semantic_match_score, 82.0);
        assert_eq!(result.recommendation, Recommendation::Interview);
        assert_eq!(result.matched_skills.len(), 2);
    }

    #[test]
    fn test_unknown_recommendation_is_rejected() {
        let json_str = r#"{
            "semantic_match_score": 50,
            "matched_skills": [],
            "skills_gap": [],
            "strengths": [],
            "weaknesses": [],
            "ai_reasoning": "",
            "recommendation": "MAYBE"
        }"#;
        assert!(serde_json::from_str::<RankingResult>(json_str).is_err());
    }

    #[test]
    fn test_prompt_interpolation() {
        let profile: CandidateProfile = serde_json::from_str(
            r#"{
                "candidate_name": "Ana Souza",
                "professional_summary": "Senior data engineer",
                "top_skills": ["Python", "SQL"],
                "estimated_seniority": "Senior"
            }"#,
        )
        .unwrap();

        let prompt = build_ranking_prompt(&sample_job(), "Ana Souza", &profile);
        assert!(prompt.contains("Job: Backend Engineer"));
        assert!(prompt.contains("Department: Engineering"));
        assert!(prompt.contains("Driver's license"));
        assert!(prompt.contains("Candidate: Ana Souza"));
        assert!(prompt.contains("\"Python\""));
        assert!(prompt.contains("Seniority/maturity analysis: Senior"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_prompt_defaults_for_missing_job_fields() {
        let mut job = sample_job();
        job.department = None;
        job.essential_requirements = None;
        let profile: CandidateProfile = serde_json::from_str("{}").unwrap();
        let prompt = build_ranking_prompt(&job, "Unknown", &profile);
        assert!(prompt.contains("Department: Not specified"));
        assert!(prompt.contains("Essential requirements: []"));
    }
}
