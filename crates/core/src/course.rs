//! Course and chapter specifications with validation.
//!
//! A [`CourseSpec`] is what callers submit; a [`ChapterSpec`] list is
//! what the structure phase produces. Both are validated before any
//! provider call is issued so malformed input never reaches a backend.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::ChapterId;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Minimum chapter complexity.
pub const MIN_COMPLEXITY: f64 = 1.0;
/// Maximum chapter complexity.
pub const MAX_COMPLEXITY: f64 = 5.0;
/// Hard ceiling on chapters per course to prevent runaway structures.
pub const MAX_CHAPTERS_PER_COURSE: usize = 100;
/// Maximum length of a course or chapter title.
const MAX_TITLE_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Proficiency levels
// ---------------------------------------------------------------------------

/// Target audience proficiency for a course.
///
/// Quality thresholds and the expected cognitive-level distribution
/// both key off this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ProficiencyLevel {
    /// Human-readable label for logs and status payloads.
    pub fn label(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
            Self::Expert => "Expert",
        }
    }
}

// ---------------------------------------------------------------------------
// Course specification
// ---------------------------------------------------------------------------

/// Target course specification supplied at job submission.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CourseSpec {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Subject domain, e.g. "data engineering".
    #[validate(length(min = 1, max = 100))]
    pub domain: String,
    pub level: ProficiencyLevel,
    /// Total duration budget for the course.
    #[validate(range(min = 0.5, max = 500.0))]
    pub duration_hours: f64,
    /// Course-level learning objectives. At least one is required.
    #[validate(length(min = 1))]
    pub objectives: Vec<String>,
    /// Concepts the learner is assumed to already know.
    pub prerequisites: Vec<String>,
}

impl CourseSpec {
    /// Validate the spec, flattening `validator` errors into a
    /// [`CoreError`] for uniform handling.
    pub fn validate_spec(&self) -> Result<(), CoreError> {
        Validate::validate(self)
            .map_err(|e| CoreError::Validation(format!("Invalid course spec: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Chapter specification
// ---------------------------------------------------------------------------

/// One chapter of a course structure.
///
/// Immutable once generated except through the regeneration controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSpec {
    pub id: ChapterId,
    /// 1-based position within the course. Unique per job.
    pub sequence_number: u32,
    pub title: String,
    /// Ordered learning objectives. At least one is required.
    pub objectives: Vec<String>,
    pub duration_minutes: u32,
    /// Difficulty on a 1.0–5.0 scale, non-decreasing across the course.
    pub complexity: f64,
    /// Concepts this chapter assumes from earlier chapters.
    pub prerequisites: Vec<String>,
}

/// Validate a single chapter spec.
///
/// Rules:
/// - `sequence_number` must be >= 1.
/// - Title must be non-empty and at most `MAX_TITLE_LEN` characters.
/// - At least one learning objective.
/// - Positive duration.
/// - Complexity within `MIN_COMPLEXITY..=MAX_COMPLEXITY`.
pub fn validate_chapter(chapter: &ChapterSpec) -> Result<(), CoreError> {
    if chapter.sequence_number < 1 {
        return Err(CoreError::Validation(
            "Chapter sequence_number must be >= 1".to_string(),
        ));
    }
    if chapter.title.is_empty() {
        return Err(CoreError::Validation(
            "Chapter title must not be empty".to_string(),
        ));
    }
    if chapter.title.len() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Chapter title must not exceed {MAX_TITLE_LEN} characters"
        )));
    }
    if chapter.objectives.is_empty() {
        return Err(CoreError::Validation(format!(
            "Chapter {} must have at least one learning objective",
            chapter.sequence_number
        )));
    }
    if chapter.duration_minutes == 0 {
        return Err(CoreError::Validation(format!(
            "Chapter {} must have a positive duration",
            chapter.sequence_number
        )));
    }
    if !(MIN_COMPLEXITY..=MAX_COMPLEXITY).contains(&chapter.complexity) {
        return Err(CoreError::Validation(format!(
            "Chapter {} complexity {} outside {MIN_COMPLEXITY}..={MAX_COMPLEXITY}",
            chapter.sequence_number, chapter.complexity
        )));
    }
    Ok(())
}

/// Validate a full course structure.
///
/// Beyond per-chapter rules, sequence numbers must be unique and
/// complexity must be non-decreasing in sequence order.
pub fn validate_structure(chapters: &[ChapterSpec]) -> Result<(), CoreError> {
    if chapters.is_empty() {
        return Err(CoreError::Validation(
            "Course structure must contain at least one chapter".to_string(),
        ));
    }
    if chapters.len() > MAX_CHAPTERS_PER_COURSE {
        return Err(CoreError::Validation(format!(
            "Course structure exceeds {MAX_CHAPTERS_PER_COURSE} chapters"
        )));
    }

    let mut seen = std::collections::HashSet::with_capacity(chapters.len());
    for chapter in chapters {
        validate_chapter(chapter)?;
        if !seen.insert(chapter.sequence_number) {
            return Err(CoreError::Validation(format!(
                "Duplicate chapter sequence_number {}",
                chapter.sequence_number
            )));
        }
    }

    let mut ordered: Vec<&ChapterSpec> = chapters.iter().collect();
    ordered.sort_by_key(|c| c.sequence_number);
    for pair in ordered.windows(2) {
        if pair[1].complexity < pair[0].complexity {
            return Err(CoreError::Validation(format!(
                "Chapter {} complexity {} decreases from chapter {} ({})",
                pair[1].sequence_number,
                pair[1].complexity,
                pair[0].sequence_number,
                pair[0].complexity
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(seq: u32, complexity: f64) -> ChapterSpec {
        ChapterSpec {
            id: uuid::Uuid::new_v4(),
            sequence_number: seq,
            title: format!("Chapter {seq}"),
            objectives: vec!["Understand the basics".to_string()],
            duration_minutes: 45,
            complexity,
            prerequisites: vec![],
        }
    }

    // -- validate_chapter -----------------------------------------------------

    #[test]
    fn valid_chapter_accepted() {
        assert!(validate_chapter(&chapter(1, 2.0)).is_ok());
    }

    #[test]
    fn zero_sequence_rejected() {
        assert!(validate_chapter(&chapter(0, 2.0)).is_err());
    }

    #[test]
    fn empty_title_rejected() {
        let mut c = chapter(1, 2.0);
        c.title.clear();
        assert!(validate_chapter(&c).is_err());
    }

    #[test]
    fn no_objectives_rejected() {
        let mut c = chapter(1, 2.0);
        c.objectives.clear();
        assert!(validate_chapter(&c).is_err());
    }

    #[test]
    fn zero_duration_rejected() {
        let mut c = chapter(1, 2.0);
        c.duration_minutes = 0;
        assert!(validate_chapter(&c).is_err());
    }

    #[test]
    fn complexity_bounds_enforced() {
        assert!(validate_chapter(&chapter(1, MIN_COMPLEXITY)).is_ok());
        assert!(validate_chapter(&chapter(1, MAX_COMPLEXITY)).is_ok());
        assert!(validate_chapter(&chapter(1, 0.9)).is_err());
        assert!(validate_chapter(&chapter(1, 5.1)).is_err());
    }

    // -- validate_structure ---------------------------------------------------

    #[test]
    fn valid_structure_accepted() {
        let chapters = vec![chapter(1, 1.5), chapter(2, 2.0), chapter(3, 2.0)];
        assert!(validate_structure(&chapters).is_ok());
    }

    #[test]
    fn empty_structure_rejected() {
        assert!(validate_structure(&[]).is_err());
    }

    #[test]
    fn duplicate_sequence_rejected() {
        let chapters = vec![chapter(1, 1.5), chapter(1, 2.0)];
        assert!(validate_structure(&chapters).is_err());
    }

    #[test]
    fn decreasing_complexity_rejected() {
        let chapters = vec![chapter(1, 3.0), chapter(2, 2.0)];
        assert!(validate_structure(&chapters).is_err());
    }

    #[test]
    fn out_of_order_input_still_checked_by_sequence() {
        // Supplied out of order, but complexity is non-decreasing in
        // sequence order, so the structure is valid.
        let chapters = vec![chapter(2, 2.5), chapter(1, 1.5)];
        assert!(validate_structure(&chapters).is_ok());
    }

    // -- CourseSpec -----------------------------------------------------------

    #[test]
    fn course_spec_requires_objectives() {
        let spec = CourseSpec {
            title: "Intro to Rust".to_string(),
            domain: "programming".to_string(),
            level: ProficiencyLevel::Beginner,
            duration_hours: 8.0,
            objectives: vec![],
            prerequisites: vec![],
        };
        assert!(spec.validate_spec().is_err());
    }

    #[test]
    fn course_spec_valid() {
        let spec = CourseSpec {
            title: "Intro to Rust".to_string(),
            domain: "programming".to_string(),
            level: ProficiencyLevel::Beginner,
            duration_hours: 8.0,
            objectives: vec!["Write a CLI tool".to_string()],
            prerequisites: vec![],
        };
        assert!(spec.validate_spec().is_ok());
    }
}
