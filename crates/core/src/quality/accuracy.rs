//! Factual/technical accuracy scoring.
//!
//! The provider's own validation pass is the primary signal; it is
//! blended with local source-reliability heuristics (unsupported
//! absolute claims pull the score down, attribution markers push it
//! up). When no provider signal is available the heuristic stands
//! alone.

use crate::content::GeneratedContent;

use super::{Scorer, ScoringContext, DIM_ACCURACY};

// ---------------------------------------------------------------------------
// Blend weights
// ---------------------------------------------------------------------------

/// Weight of the provider validation signal when present.
const WEIGHT_PROVIDER: f64 = 0.7;
/// Weight of the local heuristic when a provider signal is present.
const WEIGHT_HEURISTIC: f64 = 0.3;

// ---------------------------------------------------------------------------
// Heuristic keyword tables
// ---------------------------------------------------------------------------

/// Phrases typical of unsupported absolute claims.
const UNSUPPORTED_MARKERS: &[&str] = &[
    "it is well known",
    "everyone knows",
    "always works",
    "never fails",
    "100% guaranteed",
    "the only way",
    "obviously",
    "undoubtedly",
];

/// Phrases indicating attribution or hedged, checkable statements.
const RELIABILITY_MARKERS: &[&str] = &[
    "according to",
    "the documentation",
    "the specification",
    "for instance",
    "in practice",
    "as defined",
    "research shows",
    "typically",
];

/// Penalty per unsupported-claim marker.
const PENALTY_PER_MARKER: f64 = 0.08;
/// Bonus per reliability marker.
const BONUS_PER_MARKER: f64 = 0.02;
/// Heuristic baseline before markers are applied.
const HEURISTIC_BASELINE: f64 = 0.9;

// ---------------------------------------------------------------------------
// Heuristic
// ---------------------------------------------------------------------------

/// Source-reliability heuristic over the chapter text, in 0–1.
pub fn reliability_heuristic(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let penalties: usize = UNSUPPORTED_MARKERS
        .iter()
        .map(|m| lower.match_indices(m).count())
        .sum();
    let bonuses = RELIABILITY_MARKERS
        .iter()
        .filter(|m| lower.contains(**m))
        .count();

    (HEURISTIC_BASELINE - penalties as f64 * PENALTY_PER_MARKER
        + bonuses as f64 * BONUS_PER_MARKER)
        .clamp(0.0, 1.0)
}

/// Blend the provider accuracy signal with the local heuristic.
pub fn blend(provider_accuracy: Option<f64>, heuristic: f64) -> f64 {
    match provider_accuracy {
        Some(p) => (WEIGHT_PROVIDER * p.clamp(0.0, 1.0) + WEIGHT_HEURISTIC * heuristic)
            .clamp(0.0, 1.0),
        None => heuristic,
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Default accuracy scorer.
#[derive(Default)]
pub struct AccuracyScorer;

impl Scorer for AccuracyScorer {
    fn dimension(&self) -> &'static str {
        DIM_ACCURACY
    }

    fn score(&self, content: &GeneratedContent, ctx: &ScoringContext<'_>) -> f64 {
        let heuristic = reliability_heuristic(&content.combined_text());
        blend(ctx.provider_signal.map(|s| s.accuracy), heuristic)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_text_near_baseline() {
        let score = reliability_heuristic("Rust uses ownership to manage memory.");
        assert!((score - HEURISTIC_BASELINE).abs() < f64::EPSILON);
    }

    #[test]
    fn unsupported_claims_penalized() {
        let clean = reliability_heuristic("The borrow checker enforces the rules.");
        let sloppy = reliability_heuristic(
            "Obviously this always works and is 100% guaranteed. Everyone knows that.",
        );
        assert!(sloppy < clean);
    }

    #[test]
    fn attribution_rewarded() {
        let plain = reliability_heuristic("The function returns a Result.");
        let attributed = reliability_heuristic(
            "According to the documentation, the function typically returns a Result.",
        );
        assert!(attributed > plain);
    }

    #[test]
    fn heuristic_clamped() {
        let text = "obviously ".repeat(50);
        assert_eq!(reliability_heuristic(&text), 0.0);
    }

    #[test]
    fn blend_weighs_provider_signal() {
        let blended = blend(Some(1.0), 0.5);
        assert!((blended - (0.7 + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn blend_without_signal_is_heuristic_only() {
        assert!((blend(None, 0.8) - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn blend_clamps_provider_signal() {
        assert!(blend(Some(2.0), 1.0) <= 1.0);
    }
}
