//! Weighted score calculator.
//!
//! Pure and referentially transparent: the display score is recomputed on
//! every read and sort, never persisted, so identical inputs must always
//! yield identical output. Ties keep their original ordering upstream.

use crate::analysis::schema::DimensionScores;

/// Clamp band for the technical weight. Neither dimension may fully
/// dominate: a requested weight of 0 or 100 lands on the band edge.
pub const MIN_WEIGHT: u8 = 15;
pub const MAX_WEIGHT: u8 = 85;

pub const DEFAULT_TECH_WEIGHT: u8 = 50;

/// Combines the technical and cultural base scores into one display score in
/// [0,100]. `tech_weight` is a percentage (0-100); the culture weight is its
/// complement. Both are clamped into [MIN_WEIGHT, MAX_WEIGHT].
pub fn weighted_score(scores: &DimensionScores, tech_weight: u8) -> u8 {
    let wt = tech_weight.clamp(MIN_WEIGHT, MAX_WEIGHT) as f64 / 100.0;
    let wc = 1.0 - wt;
    let combined = scores.technical.clamp(0.0, 100.0) * wt + scores.cultural.clamp(0.0, 100.0) * wc;
    combined.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(technical: f64, cultural: f64) -> DimensionScores {
        DimensionScores {
            technical,
            cultural,
            ..DimensionScores::default()
        }
    }

    #[test]
    fn test_deterministic() {
        let s = scores(80.0, 60.0);
        assert_eq!(weighted_score(&s, 70), weighted_score(&s, 70));
    }

    #[test]
    fn test_even_split() {
        // 0.5*80 + 0.5*60 = 70
        assert_eq!(weighted_score(&scores(80.0, 60.0), 50), 70);
    }

    #[test]
    fn test_monotonic_in_tech_weight() {
        let s = scores(90.0, 40.0);
        let mut last = weighted_score(&s, MIN_WEIGHT);
        for w in (20..=MAX_WEIGHT).step_by(5) {
            let current = weighted_score(&s, w);
            assert!(current >= last, "weight {w} decreased the score");
            last = current;
        }
        assert!(weighted_score(&s, MAX_WEIGHT) > weighted_score(&s, MIN_WEIGHT));
    }

    #[test]
    fn test_weight_clamped_to_band() {
        let s = scores(100.0, 0.0);
        // tech=0 clamps to 15%, tech=100 clamps to 85% — never pure weighting.
        assert_eq!(weighted_score(&s, 0), weighted_score(&s, MIN_WEIGHT));
        assert_eq!(weighted_score(&s, 100), weighted_score(&s, MAX_WEIGHT));
        assert_eq!(weighted_score(&s, 0), 15);
        assert_eq!(weighted_score(&s, 100), 85);
    }

    #[test]
    fn test_equal_dimensions_ignore_weight() {
        let s = scores(70.0, 70.0);
        assert_eq!(weighted_score(&s, MIN_WEIGHT), 70);
        assert_eq!(weighted_score(&s, MAX_WEIGHT), 70);
    }

    #[test]
    fn test_output_stays_in_range() {
        assert_eq!(weighted_score(&scores(0.0, 0.0), 50), 0);
        assert_eq!(weighted_score(&scores(100.0, 100.0), 50), 100);
        // Out-of-range inputs are clamped before combining.
        assert_eq!(weighted_score(&scores(500.0, 500.0), 50), 100);
    }
}
