//! Learning-objective coverage scoring.
//!
//! Each objective is reduced to its significant terms; an objective
//! counts as covered when at least half of those terms appear in the
//! chapter text. The score is the covered fraction. Release requires
//! exactly 1.0 (FR-012); the threshold lives in
//! [`super::QualityThresholds`], this module only measures.

use regex::Regex;

use crate::content::GeneratedContent;

use super::{Scorer, ScoringContext, DIM_COVERAGE};

// ---------------------------------------------------------------------------
// Term extraction
// ---------------------------------------------------------------------------

/// Words ignored when extracting significant terms from an objective.
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "to", "in", "on", "for", "with", "how", "what", "when",
    "where", "why", "will", "able", "their", "them", "that", "this", "these", "those", "from",
    "into", "about", "understand", "learn", "know", "students",
];

/// Minimum word length for a significant term.
const MIN_TERM_LEN: usize = 4;

/// Extract the significant terms of an objective: lowercased words of
/// at least [`MIN_TERM_LEN`] characters that are not stopwords.
pub fn significant_terms(objective: &str) -> Vec<String> {
    objective
        .split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= MIN_TERM_LEN && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Whether a term appears in the text on a word boundary.
fn term_present(term: &str, lower_text: &str) -> bool {
    match Regex::new(&format!(r"\b{}\b", regex::escape(term))) {
        Ok(re) => re.is_match(lower_text),
        Err(_) => lower_text.contains(term),
    }
}

/// Whether one objective is detectably present in the text: at least
/// half of its significant terms occur. Objectives with no significant
/// terms cannot be measured and count as covered.
pub fn objective_covered(objective: &str, lower_text: &str) -> bool {
    let terms = significant_terms(objective);
    if terms.is_empty() {
        return true;
    }
    let present = terms.iter().filter(|t| term_present(t, lower_text)).count();
    present * 2 >= terms.len()
}

/// Fraction of objectives covered by the text. No objectives means
/// vacuous full coverage.
pub fn coverage_score(objectives: &[String], text: &str) -> f64 {
    if objectives.is_empty() {
        return 1.0;
    }
    let lower = text.to_lowercase();
    let covered = objectives
        .iter()
        .filter(|o| objective_covered(o, &lower))
        .count();
    covered as f64 / objectives.len() as f64
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Default objective-coverage scorer.
pub struct CoverageScorer;

impl Scorer for CoverageScorer {
    fn dimension(&self) -> &'static str {
        DIM_COVERAGE
    }

    fn score(&self, content: &GeneratedContent, ctx: &ScoringContext<'_>) -> f64 {
        let mut text = content.combined_text();
        for s in content
            .key_concepts
            .iter()
            .chain(content.examples.iter())
            .chain(content.exercises.iter())
        {
            text.push('\n');
            text.push_str(s);
        }
        coverage_score(ctx.objectives, &text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- significant_terms ----------------------------------------------------

    #[test]
    fn stopwords_and_short_words_dropped() {
        let terms = significant_terms("Understand how to use the borrow checker");
        assert_eq!(terms, vec!["borrow", "checker"]);
    }

    #[test]
    fn punctuation_split() {
        let terms = significant_terms("error-handling with Result");
        assert_eq!(terms, vec!["error", "handling", "result"]);
    }

    // -- objective_covered ----------------------------------------------------

    #[test]
    fn covered_when_all_terms_present() {
        let text = "the borrow checker enforces aliasing rules";
        assert!(objective_covered("Understand the borrow checker", text));
    }

    #[test]
    fn covered_when_half_present() {
        // 1 of 2 terms present.
        let text = "the borrow rules are strict";
        assert!(objective_covered("Understand the borrow checker", text));
    }

    #[test]
    fn not_covered_when_terms_absent() {
        let text = "completely unrelated prose";
        assert!(!objective_covered("Understand the borrow checker", text));
    }

    #[test]
    fn word_boundaries_respected() {
        let text = "we checker nothing";
        assert!(objective_covered("apply the checker", text));
        // "checker" must not match inside "checkers".
        let text2 = "checkers are games";
        assert!(!objective_covered("apply the checker", text2));
    }

    #[test]
    fn unmeasurable_objective_counts_as_covered() {
        assert!(objective_covered("do it", "anything"));
    }

    // -- coverage_score -------------------------------------------------------

    #[test]
    fn full_coverage() {
        let objectives = vec![
            "Understand ownership".to_string(),
            "Apply borrowing rules".to_string(),
        ];
        let text = "Ownership and borrowing rules govern references.";
        assert!((coverage_score(&objectives, text) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_coverage_is_fractional() {
        let objectives = vec![
            "Understand ownership".to_string(),
            "Configure kubernetes clusters".to_string(),
        ];
        let text = "Ownership governs moves.";
        assert!((coverage_score(&objectives, text) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_objectives_vacuously_covered() {
        assert!((coverage_score(&[], "anything") - 1.0).abs() < f64::EPSILON);
    }
}
