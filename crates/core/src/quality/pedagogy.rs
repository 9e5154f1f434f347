//! Pedagogical alignment scoring.
//!
//! Three signals are combined:
//!
//! 1. similarity between the observed cognitive-level distribution
//!    (Bloom's taxonomy, keyword-classified) and the target profile
//!    for the proficiency level, computed as `1 − Σ|actual−expected|/2`,
//! 2. adherence to a low-to-high learning-progression ordering across
//!    content blocks,
//! 3. presence of scaffolding markers.
//!
//! The keyword tables are deliberately simple; the scorer sits behind
//! the [`Scorer`] seam so a heavier classifier can replace it.

use crate::content::GeneratedContent;
use crate::course::ProficiencyLevel;

use super::{Scorer, ScoringContext, DIM_PEDAGOGY};

// ---------------------------------------------------------------------------
// Combination weights
// ---------------------------------------------------------------------------

const WEIGHT_DISTRIBUTION: f64 = 0.60;
const WEIGHT_PROGRESSION: f64 = 0.25;
const WEIGHT_SCAFFOLDING: f64 = 0.15;

/// Scaffolding markers needed for a full scaffolding score.
const SCAFFOLDING_TARGET: usize = 3;

// ---------------------------------------------------------------------------
// Bloom levels
// ---------------------------------------------------------------------------

/// Bloom's taxonomy cognitive levels, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

pub const BLOOM_LEVELS: [BloomLevel; 6] = [
    BloomLevel::Remember,
    BloomLevel::Understand,
    BloomLevel::Apply,
    BloomLevel::Analyze,
    BloomLevel::Evaluate,
    BloomLevel::Create,
];

/// Indicator verbs/phrases per cognitive level.
fn keywords(level: BloomLevel) -> &'static [&'static str] {
    match level {
        BloomLevel::Remember => &[
            "define", "list", "recall", "name", "identify", "memorize", "state", "label",
        ],
        BloomLevel::Understand => &[
            "explain",
            "describe",
            "summarize",
            "interpret",
            "classify",
            "discuss",
            "paraphrase",
        ],
        BloomLevel::Apply => &[
            "apply", "use", "implement", "solve", "demonstrate", "execute", "practice",
        ],
        BloomLevel::Analyze => &[
            "analyze",
            "compare",
            "contrast",
            "differentiate",
            "examine",
            "break down",
            "investigate",
        ],
        BloomLevel::Evaluate => &[
            "evaluate", "assess", "critique", "judge", "justify", "argue", "defend",
        ],
        BloomLevel::Create => &[
            "create", "design", "build", "construct", "develop", "compose", "formulate",
        ],
    }
}

/// Scaffolding markers: phrases that connect new material to prior
/// material or walk the learner through it.
const SCAFFOLDING_MARKERS: &[&str] = &[
    "for example",
    "recall that",
    "as we saw",
    "in the previous",
    "building on",
    "step by step",
    "let's review",
    "remember that",
    "to recap",
];

// ---------------------------------------------------------------------------
// Target profiles
// ---------------------------------------------------------------------------

/// Expected cognitive-level distribution for a proficiency level, in
/// [`BLOOM_LEVELS`] order. Each profile sums to 1.0.
///
/// Beginner material is dominated by Remember+Understand (~70%);
/// Expert material by Analyze+Evaluate+Create (~60%).
pub fn target_distribution(level: ProficiencyLevel) -> [f64; 6] {
    match level {
        ProficiencyLevel::Beginner => [0.40, 0.30, 0.15, 0.10, 0.05, 0.00],
        ProficiencyLevel::Intermediate => [0.20, 0.25, 0.30, 0.15, 0.05, 0.05],
        ProficiencyLevel::Advanced => [0.10, 0.15, 0.25, 0.25, 0.15, 0.10],
        ProficiencyLevel::Expert => [0.05, 0.10, 0.25, 0.25, 0.20, 0.15],
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn count_occurrences(text: &str, needle: &str) -> usize {
    text.match_indices(needle).count()
}

/// Classify a text into a cognitive-level distribution by keyword
/// counting. Returns all zeros when no indicator is found.
pub fn classify_distribution(text: &str) -> [f64; 6] {
    let lower = text.to_lowercase();
    let mut counts = [0usize; 6];
    for (i, level) in BLOOM_LEVELS.iter().enumerate() {
        for kw in keywords(*level) {
            counts[i] += count_occurrences(&lower, kw);
        }
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return [0.0; 6];
    }
    let mut dist = [0.0; 6];
    for i in 0..6 {
        dist[i] = counts[i] as f64 / total as f64;
    }
    dist
}

/// Distribution similarity: `1 − Σ|actual−expected|/2`, in 0–1.
pub fn distribution_similarity(actual: &[f64; 6], expected: &[f64; 6]) -> f64 {
    let diff: f64 = actual
        .iter()
        .zip(expected.iter())
        .map(|(a, e)| (a - e).abs())
        .sum();
    (1.0 - diff / 2.0).clamp(0.0, 1.0)
}

/// Dominant cognitive level of a text, if any indicator is present.
fn dominant_level(text: &str) -> Option<usize> {
    let dist = classify_distribution(text);
    let (idx, max) = dist
        .iter()
        .enumerate()
        .fold((0, 0.0), |acc, (i, v)| if *v > acc.1 { (i, *v) } else { acc });
    (max > 0.0).then_some(idx)
}

/// Learning-progression adherence across content blocks.
///
/// Each block's dominant cognitive level should not drop by more than
/// one step from the previous classifiable block. Returns the fraction
/// of adjacent classifiable pairs that respect this; a chapter with
/// fewer than two classifiable blocks trivially scores 1.0.
pub fn progression_score(block_texts: &[String]) -> f64 {
    let levels: Vec<usize> = block_texts
        .iter()
        .filter_map(|t| dominant_level(t))
        .collect();
    if levels.len() < 2 {
        return 1.0;
    }
    let pairs = levels.len() - 1;
    let ok = levels
        .windows(2)
        .filter(|pair| pair[1] + 1 >= pair[0])
        .count();
    ok as f64 / pairs as f64
}

/// Scaffolding score: distinct markers found, saturating at
/// [`SCAFFOLDING_TARGET`].
pub fn scaffolding_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let found = SCAFFOLDING_MARKERS
        .iter()
        .filter(|m| lower.contains(**m))
        .count();
    (found as f64 / SCAFFOLDING_TARGET as f64).min(1.0)
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Default pedagogical alignment scorer.
pub struct PedagogyScorer;

impl Scorer for PedagogyScorer {
    fn dimension(&self) -> &'static str {
        DIM_PEDAGOGY
    }

    fn score(&self, content: &GeneratedContent, ctx: &ScoringContext<'_>) -> f64 {
        // Objectives and exercises carry the clearest cognitive verbs,
        // so they are classified together with the prose.
        let mut classified = content.combined_text();
        for s in ctx.objectives.iter().chain(content.exercises.iter()) {
            classified.push('\n');
            classified.push_str(s);
        }

        let actual = classify_distribution(&classified);
        let expected = target_distribution(ctx.level);
        let similarity = distribution_similarity(&actual, &expected);

        let block_texts: Vec<String> =
            content.blocks.iter().map(|b| b.body.clone()).collect();
        let progression = progression_score(&block_texts);
        let scaffolding = scaffolding_score(&classified);

        WEIGHT_DISTRIBUTION * similarity
            + WEIGHT_PROGRESSION * progression
            + WEIGHT_SCAFFOLDING * scaffolding
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
