//! Versioned, coercing schema for the extraction agent's output.
//!
//! This is the single boundary where untyped LLM text enters the system.
//! The rule is coerce, not reject: a response that is valid JSON but missing
//! optional fields is accepted with documented defaults. Only a response
//! that cannot be parsed as JSON at all is a hard error (handled upstream by
//! the retry policy).

use serde::{Deserialize, Deserializer, Serialize};

pub const SCHEMA_VERSION: &str = "1.2";

/// Placeholder used when no personal name is present in the document.
pub const UNIDENTIFIED_CANDIDATE: &str = "Candidate not identified";

const DEFAULT_DIMENSION_SCORE: f64 = 50.0;

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_candidate_name() -> String {
    UNIDENTIFIED_CANDIDATE.to_string()
}

fn default_archetype() -> String {
    "other".to_string()
}

fn default_briefing_category() -> String {
    "Operational".to_string()
}

fn default_seniority() -> String {
    "Junior".to_string()
}

fn default_dimension_score() -> f64 {
    DEFAULT_DIMENSION_SCORE
}

/// Accepts `null` where a plain string is expected.
fn null_to_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// One value per scoring dimension. Used for both base scores and
/// per-dimension confidence; missing dimensions default to 50.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimensionScores {
    #[serde(default = "default_dimension_score")]
    pub technical: f64,
    #[serde(default = "default_dimension_score")]
    pub cultural: f64,
    #[serde(default = "default_dimension_score")]
    pub performance: f64,
    #[serde(default = "default_dimension_score")]
    pub maturity: f64,
}

impl Default for DimensionScores {
    fn default() -> Self {
        Self {
            technical: DEFAULT_DIMENSION_SCORE,
            cultural: DEFAULT_DIMENSION_SCORE,
            performance: DEFAULT_DIMENSION_SCORE,
            maturity: DEFAULT_DIMENSION_SCORE,
        }
    }
}

impl DimensionScores {
    fn clamp_all(&mut self) {
        self.technical = self.technical.clamp(0.0, 100.0);
        self.cultural = self.cultural.clamp(0.0, 100.0);
        self.performance = self.performance.clamp(0.0, 100.0);
        self.maturity = self.maturity.clamp(0.0, 100.0);
    }
}

/// Free-text rationale per dimension. The four dimensions are justified
/// independently; no scalar collapses them here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionNotes {
    #[serde(default, deserialize_with = "null_to_empty")]
    pub technical: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub cultural: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub performance: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub maturity: String,
}

/// Audit record for a heuristic ceiling imposed on a dimension score.
/// The reason is the user-visible explanation for the cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapApplied {
    pub dimension: String,
    pub cap_value: f64,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub reason: String,
}

/// Technical evidence graded by strength: proven results, contextual
/// signals, and bare declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalEvidence {
    #[serde(default)]
    pub proven: Vec<String>,
    #[serde(default)]
    pub contextual: Vec<String>,
    #[serde(default)]
    pub declared: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehavioralEvidence {
    #[serde(default)]
    pub demonstrated: Vec<String>,
    #[serde(default)]
    pub indirect_signals: Vec<String>,
    #[serde(default)]
    pub self_claims: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Differential {
    pub item: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub why_it_matters: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub impact: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "null_to_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub role: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub period: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifiedRisk {
    #[serde(rename = "type", default, deserialize_with = "null_to_empty")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub detail: String,
}

/// The structured candidate profile produced by the extraction agent.
/// Stored opaquely in `criteria_evaluation` and read back by ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_candidate_name", deserialize_with = "null_to_empty")]
    pub candidate_name: String,
    #[serde(default)]
    pub candidate_email: Option<String>,
    #[serde(default)]
    pub candidate_phone: Option<String>,
    #[serde(default)]
    pub candidate_location: Option<String>,
    #[serde(default = "default_archetype", deserialize_with = "null_to_empty")]
    pub role_archetype: String,
    #[serde(
        default = "default_briefing_category",
        deserialize_with = "null_to_empty"
    )]
    pub briefing_category: String,
    #[serde(default)]
    pub top_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub professional_summary: String,
    #[serde(default = "default_seniority", deserialize_with = "null_to_empty")]
    pub estimated_seniority: String,
    #[serde(default)]
    pub base_scores: DimensionScores,
    #[serde(default)]
    pub confidence_by_dimension: DimensionScores,
    #[serde(default)]
    pub detailed_rationale: DimensionNotes,
    #[serde(default)]
    pub caps_applied: Vec<CapApplied>,
    #[serde(default)]
    pub technical_capacity: TechnicalEvidence,
    #[serde(default)]
    pub behavioral_profile: BehavioralEvidence,
    #[serde(default)]
    pub identified_differentials: Vec<Differential>,
    #[serde(default)]
    pub real_gaps: Vec<String>,
    #[serde(default)]
    pub detailed_experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub identified_risks: Vec<IdentifiedRisk>,
    #[serde(default)]
    pub interview_questions: Vec<String>,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub consolidated_rationale: String,
}

impl CandidateProfile {
    /// Post-parse coercion: pins the schema version, clamps every score and
    /// confidence into [0,100] and restores the name placeholder when the
    /// model returned an empty name.
    pub fn normalize(mut self) -> Self {
        self.schema_version = SCHEMA_VERSION.to_string();
        self.base_scores.clamp_all();
        self.confidence_by_dimension.clamp_all();
        for cap in &mut self.caps_applied {
            cap.cap_value = cap.cap_value.clamp(0.0, 100.0);
        }
        if self.candidate_name.trim().is_empty() {
            self.candidate_name = UNIDENTIFIED_CANDIDATE.to_string();
        }
        if self.estimated_seniority.trim().is_empty() {
            self.estimated_seniority = default_seniority();
        }
        self
    }

    /// True when the model extracted an actual personal name.
    pub fn has_real_name(&self) -> bool {
        let name = self.candidate_name.trim();
        !name.is_empty() && name != UNIDENTIFIED_CANDIDATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_coerces_to_full_defaults() {
        let profile: CandidateProfile = serde_json::from_str("{}").unwrap();
        let profile = profile.normalize();
        assert_eq!(profile.schema_version, SCHEMA_VERSION);
        assert_eq!(profile.candidate_name, UNIDENTIFIED_CANDIDATE);
        assert_eq!(profile.base_scores.technical, 50.0);
        assert_eq!(profile.base_scores.cultural, 50.0);
        assert_eq!(profile.base_scores.performance, 50.0);
        assert_eq!(profile.base_scores.maturity, 50.0);
        assert_eq!(profile.confidence_by_dimension.technical, 50.0);
        assert!(profile.top_skills.is_empty());
        assert!(profile.caps_applied.is_empty());
        assert_eq!(profile.briefing_category, "Operational");
        assert_eq!(profile.estimated_seniority, "Junior");
        assert!(!profile.has_real_name());
    }

    #[test]
    fn test_partial_scores_fill_missing_dimensions() {
        let json = r#"{"base_scores": {"technical": 92}}"#;
        let profile: CandidateProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.base_scores.technical, 92.0);
        assert_eq!(profile.base_scores.cultural, 50.0);
        assert_eq!(profile.base_scores.maturity, 50.0);
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        let json = r#"{"base_scores": {"technical": 130, "cultural": -5}}"#;
        let profile: CandidateProfile = serde_json::from_str::<CandidateProfile>(json).unwrap().normalize();
        assert_eq!(profile.base_scores.technical, 100.0);
        assert_eq!(profile.base_scores.cultural, 0.0);
    }

    #[test]
    fn test_null_strings_are_tolerated() {
        let json = r#"{
            "candidate_name": null,
            "consolidated_rationale": null,
            "candidate_email": null
        }"#;
        let profile: CandidateProfile = serde_json::from_str::<CandidateProfile>(json).unwrap().normalize();
        assert_eq!(profile.candidate_name, UNIDENTIFIED_CANDIDATE);
        assert_eq!(profile.consolidated_rationale, "");
        assert!(profile.candidate_email.is_none());
    }

    #[test]
    fn test_caps_applied_roundtrip() {
        let json = r#"{
            "caps_applied": [
                {"dimension": "technical", "cap_value": 70, "reason": "Buzzwords without context"},
                {"dimension": "performance", "cap_value": 140, "reason": null}
            ]
        }"#;
        let profile: CandidateProfile = serde_json::from_str::<CandidateProfile>(json).unwrap().normalize();
        assert_eq!(profile.caps_applied.len(), 2);
        assert_eq!(profile.caps_applied[0].cap_value, 70.0);
        assert_eq!(profile.caps_applied[0].reason, "Buzzwords without context");
        // Out-of-range cap values are clamped like scores.
        assert_eq!(profile.caps_applied[1].cap_value, 100.0);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"candidate_name": "Ana Souza", "some_future_field": [1, 2, 3]}"#;
        let profile: CandidateProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.candidate_name, "Ana Souza");
        assert!(profile.has_real_name());
    }

    #[test]
    fn test_full_profile_parses() {
        let json = r#"{
            "schema_version": "1.2",
            "candidate_name": "Ana Souza",
            "candidate_email": "ana@example.com",
            "role_archetype": "engineering",
            "briefing_category": "Specialist/Senior",
            "top_skills": ["Python", "SQL", "Leadership"],
            "estimated_seniority": "Senior",
            "base_scores": {"technical": 88, "cultural": 75, "performance": 80, "maturity": 85},
            "confidence_by_dimension": {"technical": 90, "cultural": 60, "performance": 70, "maturity": 80},
            "detailed_rationale": {"technical": "Proven delivery", "cultural": "Team lead", "performance": "KPIs", "maturity": "10y"},
            "technical_capacity": {"proven": ["Shipped ETL platform"], "contextual": [], "declared": ["Kubernetes"]},
            "detailed_experience": [{"company": "Acme", "role": "Data Engineer", "period": "2019-2024", "achievements": ["Cut costs 30%"]}],
            "identified_risks": [{"type": "gap", "detail": "6 month gap in 2021"}],
            "consolidated_rationale": "Strong senior profile."
        }"#;
        let profile: CandidateProfile = serde_json::from_str::<CandidateProfile>(json).unwrap().normalize();
        assert!(profile.has_real_name());
        assert_eq!(profile.top_skills.len(), 3);
        assert_eq!(profile.detailed_experience[0].company, "Acme");
        assert_eq!(profile.identified_risks[0].kind, "gap");
        assert_eq!(profile.base_scores.technical, 88.0);
    }
}
