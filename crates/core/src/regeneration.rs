//! Regeneration classification, scoping, and audit records.
//!
//! When a chapter fails the quality gate the failure reason is
//! classified into a category and severity, which drive what gets
//! regenerated and how urgently. The control loop itself lives in the
//! pipeline crate; this module holds the pure pieces.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::quality::{Severity, DIM_ACCURACY, DIM_BIAS, DIM_COVERAGE, DIM_PEDAGOGY, DIM_READABILITY};
use crate::types::{ChapterId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Automatic regeneration retries after the first failed attempt.
/// Beyond this the chapter is routed to manual review.
pub const MAX_AUTO_RETRIES: u32 = 1;

// ---------------------------------------------------------------------------
// Reason classification
// ---------------------------------------------------------------------------

/// What kind of deficiency triggered a regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    /// Missing or incomplete material.
    Content,
    /// Wrong level for the audience.
    Difficulty,
    /// Hard-to-follow prose.
    Clarity,
    /// Factual or technical errors.
    Accuracy,
    /// Biased or exclusionary framing.
    Bias,
}

impl ReasonCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Difficulty => "difficulty",
            Self::Clarity => "clarity",
            Self::Accuracy => "accuracy",
            Self::Bias => "bias",
        }
    }
}

/// Classify a free-text regeneration reason into category and severity.
///
/// Keyword-driven. Accuracy and bias problems default to High
/// severity, difficulty and clarity to Medium; explicit "critical" or
/// "minor" wording overrides the severity either way. Unrecognized
/// reasons fall back to Content/Medium.
pub fn classify_reason(reason: &str) -> (ReasonCategory, Severity) {
    let lower = reason.to_lowercase();

    let category = if ["inaccura", "incorrect", "wrong", "factual", "error", "outdated"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        ReasonCategory::Accuracy
    } else if ["bias", "stereotyp", "exclusionary", "offensive"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        ReasonCategory::Bias
    } else if ["too hard", "too easy", "too advanced", "too basic", "difficulty", "level"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        ReasonCategory::Difficulty
    } else if ["unclear", "confusing", "hard to follow", "readab", "clarity", "convoluted"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        ReasonCategory::Clarity
    } else {
        ReasonCategory::Content
    };

    let mut severity = match category {
        ReasonCategory::Accuracy | ReasonCategory::Bias => Severity::High,
        ReasonCategory::Difficulty | ReasonCategory::Clarity => Severity::Medium,
        ReasonCategory::Content => Severity::Medium,
    };
    if lower.contains("critical") || lower.contains("severe") {
        severity = Severity::Critical;
    } else if lower.contains("minor") || lower.contains("slight") {
        severity = Severity::Low;
    }

    (category, severity)
}

/// Quality dimensions a regeneration for this category should improve.
/// Used to focus the regeneration prompt.
pub fn improvement_targets(category: ReasonCategory) -> &'static [&'static str] {
    match category {
        ReasonCategory::Content => &[DIM_COVERAGE],
        ReasonCategory::Difficulty => &[DIM_PEDAGOGY],
        ReasonCategory::Clarity => &[DIM_READABILITY, DIM_PEDAGOGY],
        ReasonCategory::Accuracy => &[DIM_ACCURACY],
        ReasonCategory::Bias => &[DIM_BIAS],
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// How much of a chapter a regeneration replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenerationScope {
    /// Replace the whole chapter.
    Full,
    /// Replace only the blocks with these order numbers, keeping the
    /// rest of the prior content.
    Targeted(Vec<u32>),
}

// ---------------------------------------------------------------------------
// Audit record
// ---------------------------------------------------------------------------

/// One regeneration attempt, recorded whether it was accepted or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationRecord {
    pub chapter_id: ChapterId,
    pub reason: String,
    pub category: ReasonCategory,
    pub severity: Severity,
    /// Overall quality before the attempt.
    pub before_overall: f64,
    /// Overall quality after, `None` when the attempt produced no
    /// scorable content.
    pub after_overall: Option<f64>,
    pub duration: std::time::Duration,
    pub provider: String,
    pub at: Timestamp,
}

// ---------------------------------------------------------------------------
// Phase machine
// ---------------------------------------------------------------------------

/// Phases a chapter moves through during one regeneration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegenPhase {
    Stable,
    Analyzing,
    Generating,
    Validating,
}

impl RegenPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Analyzing => "analyzing",
            Self::Generating => "generating",
            Self::Validating => "validating",
        }
    }
}

pub mod phase_machine {
    use super::*;

    /// Valid phase transitions. Validation either accepts (back to
    /// Stable) or loops for another attempt (back to Analyzing).
    pub fn valid_transitions(from: RegenPhase) -> &'static [RegenPhase] {
        match from {
            RegenPhase::Stable => &[RegenPhase::Analyzing],
            RegenPhase::Analyzing => &[RegenPhase::Generating],
            RegenPhase::Generating => &[RegenPhase::Validating],
            RegenPhase::Validating => &[RegenPhase::Stable, RegenPhase::Analyzing],
        }
    }

    pub fn can_transition(from: RegenPhase, to: RegenPhase) -> bool {
        valid_transitions(from).contains(&to)
    }

    pub fn validate_transition(from: RegenPhase, to: RegenPhase) -> Result<(), CoreError> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Invalid regeneration phase transition: {} -> {}",
                from.name(),
                to.name()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- classification -------------------------------------------------------

    #[test]
    fn accuracy_reasons_are_high_severity() {
        let (cat, sev) = classify_reason("The section on lifetimes is factually incorrect");
        assert_eq!(cat, ReasonCategory::Accuracy);
        assert_eq!(sev, Severity::High);
    }

    #[test]
    fn bias_reasons_are_high_severity() {
        let (cat, sev) = classify_reason("Uses gendered stereotypes in examples");
        assert_eq!(cat, ReasonCategory::Bias);
        assert_eq!(sev, Severity::High);
    }

    #[test]
    fn difficulty_reasons_are_medium() {
        let (cat, sev) = classify_reason("Way too advanced for beginners");
        assert_eq!(cat, ReasonCategory::Difficulty);
        assert_eq!(sev, Severity::Medium);
    }

    #[test]
    fn clarity_reasons_are_medium() {
        let (cat, sev) = classify_reason("The explanation is confusing");
        assert_eq!(cat, ReasonCategory::Clarity);
        assert_eq!(sev, Severity::Medium);
    }

    #[test]
    fn unrecognized_reason_defaults_to_content() {
        let (cat, sev) = classify_reason("Please redo this chapter");
        assert_eq!(cat, ReasonCategory::Content);
        assert_eq!(sev, Severity::Medium);
    }

    #[test]
    fn explicit_wording_overrides_severity() {
        let (_, sev) = classify_reason("Critical factual error in the first section");
        assert_eq!(sev, Severity::Critical);
        let (_, sev) = classify_reason("Minor wording issue, slightly unclear");
        assert_eq!(sev, Severity::Low);
    }

    #[test]
    fn targets_follow_category() {
        assert_eq!(improvement_targets(ReasonCategory::Accuracy), &["accuracy"]);
        assert!(improvement_targets(ReasonCategory::Clarity).contains(&"readability"));
    }

    // -- phase machine --------------------------------------------------------

    #[test]
    fn happy_path_cycle() {
        use phase_machine::validate_transition;
        assert!(validate_transition(RegenPhase::Stable, RegenPhase::Analyzing).is_ok());
        assert!(validate_transition(RegenPhase::Analyzing, RegenPhase::Generating).is_ok());
        assert!(validate_transition(RegenPhase::Generating, RegenPhase::Validating).is_ok());
        assert!(validate_transition(RegenPhase::Validating, RegenPhase::Stable).is_ok());
    }

    #[test]
    fn validation_may_loop_back_to_analyzing() {
        assert!(phase_machine::can_transition(
            RegenPhase::Validating,
            RegenPhase::Analyzing
        ));
    }

    #[test]
    fn skipping_phases_rejected() {
        assert!(phase_machine::validate_transition(RegenPhase::Stable, RegenPhase::Generating)
            .is_err());
        assert!(
            phase_machine::validate_transition(RegenPhase::Analyzing, RegenPhase::Stable).is_err()
        );
    }
}
