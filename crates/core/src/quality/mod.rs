//! Multi-dimensional quality scoring and the conjunctive quality gate.
//!
//! Content is scored along five independent dimensions. The gate
//! decision (`meets_standards`) is the conjunction of all five
//! per-dimension thresholds, never the weighted aggregate: a chapter
//! with perfect scores everywhere else still fails on incomplete
//! objective coverage (FR-012).
//!
//! The numeric weights and per-level thresholds are defaults, not
//! contract: both are plain data overridable at job submission.
//!
//! Scoring is pure and deterministic: re-scoring identical content
//! with the same context produces an identical [`QualityReport`].

use serde::{Deserialize, Serialize};

use crate::content::GeneratedContent;
use crate::course::ProficiencyLevel;
use crate::error::CoreError;

pub mod accuracy;
pub mod bias;
pub mod coverage;
pub mod pedagogy;
pub mod readability;

pub use accuracy::AccuracyScorer;
pub use bias::BiasScorer;
pub use coverage::CoverageScorer;
pub use pedagogy::PedagogyScorer;
pub use readability::ReadabilityScorer;

// ---------------------------------------------------------------------------
// Dimension constants
// ---------------------------------------------------------------------------

/// Statistical readability, 0–100.
pub const DIM_READABILITY: &str = "readability";
/// Pedagogical alignment, 0–1.
pub const DIM_PEDAGOGY: &str = "pedagogy";
/// Learning-objective coverage, 0–1.
pub const DIM_COVERAGE: &str = "coverage";
/// Factual/technical accuracy, 0–1.
pub const DIM_ACCURACY: &str = "accuracy";
/// Bias score, 0–1, lower is better.
pub const DIM_BIAS: &str = "bias";

/// All scoring dimensions.
pub const ALL_DIMENSIONS: &[&str] = &[
    DIM_READABILITY,
    DIM_PEDAGOGY,
    DIM_COVERAGE,
    DIM_ACCURACY,
    DIM_BIAS,
];

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Severity tag attached to quality issues and regeneration reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// The five per-dimension scores for one piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    /// 0–100 scale.
    pub readability: f64,
    pub pedagogy: f64,
    pub coverage: f64,
    pub accuracy: f64,
    /// Lower is better.
    pub bias: f64,
}

/// A textual issue raised during scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub dimension: String,
    pub severity: Severity,
    pub message: String,
}

/// Immutable result of one quality assessment.
///
/// Reports are never mutated in place; re-scoring produces a new
/// report that supersedes the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub scores: QualityScores,
    /// Weighted aggregate in 0–1, for reporting only.
    pub overall: f64,
    /// Conjunction of all five per-dimension thresholds.
    pub meets_standards: bool,
    pub issues: Vec<QualityIssue>,
}

/// Partial quality signal returned by a provider's validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSignal {
    pub overall: f64,
    pub readability: f64,
    pub pedagogy: f64,
    pub coverage: f64,
    pub accuracy: f64,
    pub issues: Vec<String>,
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Weights for the aggregate overall score.
///
/// Readability is normalised to 0–1 and bias is inverted before
/// weighting, so every term rewards higher-is-better.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityWeights {
    pub coverage: f64,
    pub accuracy: f64,
    pub pedagogy: f64,
    pub readability: f64,
    pub bias: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            coverage: 0.30,
            accuracy: 0.25,
            pedagogy: 0.25,
            readability: 0.15,
            bias: 0.05,
        }
    }
}

/// Validate that weights are non-negative and sum to 1.0.
pub fn validate_weights(weights: &QualityWeights) -> Result<(), CoreError> {
    let all = [
        weights.coverage,
        weights.accuracy,
        weights.pedagogy,
        weights.readability,
        weights.bias,
    ];
    if all.iter().any(|w| *w < 0.0) {
        return Err(CoreError::Validation(
            "Quality weights must be non-negative".to_string(),
        ));
    }
    let sum: f64 = all.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
        return Err(CoreError::Validation(format!(
            "Quality weights must sum to 1.0, got {sum}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Per-dimension minimums the gate checks conjunctively.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum readability, `None` means no floor (Expert level).
    pub min_readability: Option<f64>,
    pub min_pedagogy: f64,
    /// Release requires full coverage: the default is exactly 1.0 and
    /// no partial credit is given (FR-012).
    pub min_coverage: f64,
    pub min_accuracy: f64,
    /// Maximum tolerated bias score.
    pub max_bias: f64,
}

impl QualityThresholds {
    /// Default thresholds for a proficiency level.
    pub fn for_level(level: ProficiencyLevel) -> Self {
        let min_readability = match level {
            ProficiencyLevel::Beginner => Some(70.0),
            ProficiencyLevel::Intermediate => Some(60.0),
            ProficiencyLevel::Advanced => Some(50.0),
            ProficiencyLevel::Expert => None,
        };
        Self {
            min_readability,
            min_pedagogy: 0.80,
            min_coverage: 1.0,
            min_accuracy: 0.90,
            max_bias: 0.10,
        }
    }
}

/// Validate threshold values are within their scales.
pub fn validate_thresholds(t: &QualityThresholds) -> Result<(), CoreError> {
    if let Some(r) = t.min_readability {
        if !(0.0..=100.0).contains(&r) {
            return Err(CoreError::Validation(format!(
                "min_readability must be between 0 and 100, got {r}"
            )));
        }
    }
    for (name, v) in [
        ("min_pedagogy", t.min_pedagogy),
        ("min_coverage", t.min_coverage),
        ("min_accuracy", t.min_accuracy),
        ("max_bias", t.max_bias),
    ] {
        if !(0.0..=1.0).contains(&v) {
            return Err(CoreError::Validation(format!(
                "{name} must be between 0.0 and 1.0, got {v}"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Tolerance for floating-point threshold comparisons. Relevant for
/// the exact-coverage gate where 1.0 may arrive as 0.9999999…
const SCORE_EPSILON: f64 = 1e-9;

/// Weighted aggregate of the five scores, clamped to 0–1.
pub fn overall_score(scores: &QualityScores, weights: &QualityWeights) -> f64 {
    let readability_norm = (scores.readability / 100.0).clamp(0.0, 1.0);
    let total = weights.coverage * scores.coverage
        + weights.accuracy * scores.accuracy
        + weights.pedagogy * scores.pedagogy
        + weights.readability * readability_norm
        + weights.bias * (1.0 - scores.bias);
    total.clamp(0.0, 1.0)
}

/// Severity for a failed dimension based on how far the score missed.
fn shortfall_severity(shortfall: f64, critical_at: f64) -> Severity {
    if shortfall >= critical_at {
        Severity::Critical
    } else if shortfall >= critical_at / 2.0 {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Apply thresholds to a set of scores and produce a report.
///
/// `meets_standards` is true iff every per-dimension threshold is
/// cleared. One issue is recorded per failing dimension; `extra`
/// issues (e.g. from scorers or the provider signal) are appended
/// verbatim.
pub fn evaluate(
    scores: QualityScores,
    thresholds: &QualityThresholds,
    weights: &QualityWeights,
    extra: Vec<QualityIssue>,
) -> QualityReport {
    let mut issues = Vec::new();

    if let Some(floor) = thresholds.min_readability {
        if scores.readability + SCORE_EPSILON < floor {
            issues.push(QualityIssue {
                dimension: DIM_READABILITY.to_string(),
                severity: shortfall_severity(floor - scores.readability, 30.0),
                message: format!(
                    "Readability {:.1} below the required {floor:.1}",
                    scores.readability
                ),
            });
        }
    }
    if scores.pedagogy + SCORE_EPSILON < thresholds.min_pedagogy {
        issues.push(QualityIssue {
            dimension: DIM_PEDAGOGY.to_string(),
            severity: shortfall_severity(thresholds.min_pedagogy - scores.pedagogy, 0.3),
            message: format!(
                "Pedagogical alignment {:.2} below the required {:.2}",
                scores.pedagogy, thresholds.min_pedagogy
            ),
        });
    }
    if scores.coverage + SCORE_EPSILON < thresholds.min_coverage {
        issues.push(QualityIssue {
            dimension: DIM_COVERAGE.to_string(),
            severity: Severity::High,
            message: format!(
                "Objective coverage {:.2} below the required {:.2}; every \
                 objective must be addressed",
                scores.coverage, thresholds.min_coverage
            ),
        });
    }
    if scores.accuracy + SCORE_EPSILON < thresholds.min_accuracy {
        issues.push(QualityIssue {
            dimension: DIM_ACCURACY.to_string(),
            severity: shortfall_severity(thresholds.min_accuracy - scores.accuracy, 0.2),
            message: format!(
                "Accuracy {:.2} below the required {:.2}",
                scores.accuracy, thresholds.min_accuracy
            ),
        });
    }
    if scores.bias > thresholds.max_bias + SCORE_EPSILON {
        issues.push(QualityIssue {
            dimension: DIM_BIAS.to_string(),
            severity: shortfall_severity(scores.bias - thresholds.max_bias, 0.3),
            message: format!(
                "Bias score {:.2} above the tolerated {:.2}",
                scores.bias, thresholds.max_bias
            ),
        });
    }

    let meets_standards = issues.is_empty();
    issues.extend(extra);

    QualityReport {
        overall: overall_score(&scores, weights),
        scores,
        meets_standards,
        issues,
    }
}

// ---------------------------------------------------------------------------
// Scorer seam
// ---------------------------------------------------------------------------

/// Context shared by all scorers for one assessment.
pub struct ScoringContext<'a> {
    pub level: ProficiencyLevel,
    pub objectives: &'a [String],
    pub domain: &'a str,
    /// Provider-side validation result, when one was obtainable.
    pub provider_signal: Option<&'a ValidationSignal>,
}

/// A pluggable per-dimension scoring strategy.
///
/// The default implementations are keyword/statistical heuristics;
/// they can be swapped for heavier NLP scorers without touching the
/// gating logic.
pub trait Scorer: Send + Sync {
    /// Which dimension this scorer produces (one of [`ALL_DIMENSIONS`]).
    fn dimension(&self) -> &'static str;
    /// Score the content. Scale is 0–100 for readability, 0–1 for the
    /// rest.
    fn score(&self, content: &GeneratedContent, ctx: &ScoringContext<'_>) -> f64;
}

/// The five scorers used by one quality gate, one per dimension.
pub struct ScorerSet {
    pub readability: Box<dyn Scorer>,
    pub pedagogy: Box<dyn Scorer>,
    pub coverage: Box<dyn Scorer>,
    pub accuracy: Box<dyn Scorer>,
    pub bias: Box<dyn Scorer>,
}

impl Default for ScorerSet {
    fn default() -> Self {
        Self {
            readability: Box::new(ReadabilityScorer),
            pedagogy: Box::new(PedagogyScorer),
            coverage: Box::new(CoverageScorer),
            accuracy: Box::new(AccuracyScorer::default()),
            bias: Box::new(BiasScorer::default()),
        }
    }
}

impl ScorerSet {
    /// Run all five scorers over one piece of content.
    pub fn score_content(
        &self,
        content: &GeneratedContent,
        ctx: &ScoringContext<'_>,
    ) -> QualityScores {
        QualityScores {
            readability: self.readability.score(content, ctx),
            pedagogy: self.pedagogy.score(content, ctx),
            coverage: self.coverage.score(content, ctx),
            accuracy: self.accuracy.score(content, ctx),
            bias: self.bias.score(content, ctx),
        }
    }
}

/// Score content and apply the gate in one step.
pub fn assess(
    content: &GeneratedContent,
    ctx: &ScoringContext<'_>,
    thresholds: &QualityThresholds,
    weights: &QualityWeights,
    scorers: &ScorerSet,
) -> QualityReport {
    let scores = scorers.score_content(content, ctx);
    let extra = ctx
        .provider_signal
        .map(|signal| {
            signal
                .issues
                .iter()
                .map(|message| QualityIssue {
                    dimension: DIM_ACCURACY.to_string(),
                    severity: Severity::Low,
                    message: message.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    evaluate(scores, thresholds, weights, extra)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
