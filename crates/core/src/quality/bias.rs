//! Bias detection across demographic axes plus modality balance.
//!
//! Two components, both keyword-driven:
//!
//! 1. weighted category detector over gender / cultural / racial /
//!    age / socioeconomic / ability axes,
//! 2. an educational-modality balance check: over-reliance on a
//!    single framing (visual, auditory, kinesthetic) is itself flagged.
//!
//! Lower scores are better; the gate tolerates at most
//! [`super::QualityThresholds::max_bias`].

use crate::content::GeneratedContent;

use super::{Scorer, ScoringContext, DIM_BIAS};

// ---------------------------------------------------------------------------
// Category tables
// ---------------------------------------------------------------------------

/// A bias category: axis name, indicator phrases, and weight.
pub struct BiasCategory {
    pub axis: &'static str,
    pub keywords: &'static [&'static str],
    pub weight: f64,
}

/// Indicator phrases per demographic axis. Weights reflect how
/// strongly a hit suggests exclusionary framing.
pub const BIAS_CATEGORIES: &[BiasCategory] = &[
    BiasCategory {
        axis: "gender",
        keywords: &[
            "chairman",
            "manpower",
            "mankind",
            "he or she will simply",
            "like a girl",
            "man up",
            "guys will understand",
        ],
        weight: 1.0,
    },
    BiasCategory {
        axis: "cultural",
        keywords: &[
            "third-world",
            "exotic culture",
            "primitive society",
            "civilized world",
            "normal culture",
        ],
        weight: 1.0,
    },
    BiasCategory {
        axis: "racial",
        keywords: &["whitelist only", "blacklist only", "master race"],
        weight: 1.2,
    },
    BiasCategory {
        axis: "age",
        keywords: &[
            "too old to learn",
            "young and energetic",
            "old-fashioned thinkers",
            "digital native",
        ],
        weight: 0.8,
    },
    BiasCategory {
        axis: "socioeconomic",
        keywords: &[
            "anyone can afford",
            "just buy",
            "low-class",
            "poor people simply",
        ],
        weight: 0.8,
    },
    BiasCategory {
        axis: "ability",
        keywords: &[
            "crazy idea",
            "insane amount",
            "blind to the fact",
            "falls on deaf ears",
            "crippled by",
            "lame approach",
        ],
        weight: 0.8,
    },
];

/// Score contribution per weighted keyword hit.
const HIT_SCALE: f64 = 0.05;

// ---------------------------------------------------------------------------
// Modality balance
// ---------------------------------------------------------------------------

/// Learning-modality framings tracked for balance.
const MODALITIES: &[(&str, &[&str])] = &[
    ("visual", &["look at", "see the", "picture", "diagram", "observe", "visualize"]),
    ("auditory", &["listen", "hear", "sounds like", "discuss", "talk through"]),
    ("kinesthetic", &["try it", "hands-on", "practice", "build", "experiment", "write out"]),
];

/// Minimum total modality mentions before imbalance is measured.
const MODALITY_MIN_MENTIONS: usize = 5;
/// Share of a single modality above which content is flagged.
const MODALITY_DOMINANCE: f64 = 0.7;
/// Penalty added when one modality dominates.
const MODALITY_PENALTY: f64 = 0.1;

/// Penalty for over-reliance on a single learning modality.
///
/// Returns [`MODALITY_PENALTY`] when one modality accounts for more
/// than [`MODALITY_DOMINANCE`] of at least [`MODALITY_MIN_MENTIONS`]
/// total mentions, else 0.0.
pub fn modality_imbalance(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let counts: Vec<usize> = MODALITIES
        .iter()
        .map(|(_, kws)| {
            kws.iter()
                .map(|kw| lower.match_indices(kw).count())
                .sum::<usize>()
        })
        .collect();
    let total: usize = counts.iter().sum();
    if total < MODALITY_MIN_MENTIONS {
        return 0.0;
    }
    let max = counts.iter().copied().max().unwrap_or(0);
    if max as f64 / total as f64 > MODALITY_DOMINANCE {
        MODALITY_PENALTY
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Weighted keyword bias score over all categories, before the
/// modality penalty. 0 is unbiased; clamped to 1.
pub fn keyword_bias(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let weighted_hits: f64 = BIAS_CATEGORIES
        .iter()
        .map(|cat| {
            let hits: usize = cat
                .keywords
                .iter()
                .map(|kw| lower.match_indices(kw).count())
                .sum();
            hits as f64 * cat.weight
        })
        .sum();
    (weighted_hits * HIT_SCALE).min(1.0)
}

/// Full bias score: keyword detector plus modality imbalance.
pub fn bias_score(text: &str) -> f64 {
    (keyword_bias(text) + modality_imbalance(text)).min(1.0)
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Default bias scorer.
#[derive(Default)]
pub struct BiasScorer;

impl Scorer for BiasScorer {
    fn dimension(&self) -> &'static str {
        DIM_BIAS
    }

    fn score(&self, content: &GeneratedContent, _ctx: &ScoringContext<'_>) -> f64 {
        bias_score(&content.combined_text())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
