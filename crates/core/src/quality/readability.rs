//! Statistical readability scoring (Flesch reading ease).
//!
//! The score is a pure function of sentence length and estimated
//! syllable counts, clamped to 0–100. Higher means easier to read.

use crate::content::GeneratedContent;

use super::{Scorer, ScoringContext, DIM_READABILITY};

// ---------------------------------------------------------------------------
// Flesch constants
// ---------------------------------------------------------------------------

const FLESCH_BASE: f64 = 206.835;
const FLESCH_SENTENCE_WEIGHT: f64 = 1.015;
const FLESCH_SYLLABLE_WEIGHT: f64 = 84.6;

// ---------------------------------------------------------------------------
// Text statistics
// ---------------------------------------------------------------------------

/// Count sentences by terminal punctuation. A trailing fragment
/// without punctuation counts as one sentence.
pub fn count_sentences(text: &str) -> usize {
    let terminals = text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
    let trailing_fragment = text
        .trim_end()
        .chars()
        .last()
        .is_some_and(|c| !matches!(c, '.' | '!' | '?'));
    let count = terminals + usize::from(trailing_fragment && !text.trim().is_empty());
    count.max(usize::from(!text.trim().is_empty()))
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimate syllables in a word by counting vowel groups.
///
/// A trailing silent 'e' is discounted; every word has at least one
/// syllable.
pub fn estimate_syllables(word: &str) -> usize {
    let lower: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    if lower.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0usize;
    let mut prev_vowel = false;
    for c in lower.chars() {
        let v = is_vowel(c);
        if v && !prev_vowel {
            groups += 1;
        }
        prev_vowel = v;
    }
    if lower.ends_with('e') && !lower.ends_with("le") && groups > 1 {
        groups -= 1;
    }
    groups.max(1)
}

/// Flesch reading ease of a text, clamped to 0–100.
///
/// Empty text scores 0, not 100.
pub fn flesch_reading_ease(text: &str) -> f64 {
    let words = count_words(text);
    if words == 0 {
        return 0.0;
    }
    let sentences = count_sentences(text);
    let syllables: usize = text.split_whitespace().map(estimate_syllables).sum();

    let words_per_sentence = words as f64 / sentences as f64;
    let syllables_per_word = syllables as f64 / words as f64;

    (FLESCH_BASE
        - FLESCH_SENTENCE_WEIGHT * words_per_sentence
        - FLESCH_SYLLABLE_WEIGHT * syllables_per_word)
        .clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Default readability scorer: Flesch reading ease over the combined
/// chapter text.
pub struct ReadabilityScorer;

impl Scorer for ReadabilityScorer {
    fn dimension(&self) -> &'static str {
        DIM_READABILITY
    }

    fn score(&self, content: &GeneratedContent, _ctx: &ScoringContext<'_>) -> f64 {
        flesch_reading_ease(&content.combined_text())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- counting -------------------------------------------------------------

    #[test]
    fn sentences_counted_by_terminal_punctuation() {
        assert_eq!(count_sentences("One. Two! Three?"), 3);
    }

    #[test]
    fn trailing_fragment_counts_as_sentence() {
        assert_eq!(count_sentences("One. And a fragment"), 2);
    }

    #[test]
    fn empty_text_has_zero_sentences() {
        assert_eq!(count_sentences(""), 0);
        assert_eq!(count_sentences("   "), 0);
    }

    #[test]
    fn words_counted_by_whitespace() {
        assert_eq!(count_words("the quick brown fox"), 4);
        assert_eq!(count_words(""), 0);
    }

    // -- syllables ------------------------------------------------------------

    #[test]
    fn monosyllables() {
        assert_eq!(estimate_syllables("cat"), 1);
        assert_eq!(estimate_syllables("strength"), 1);
    }

    #[test]
    fn multisyllables() {
        assert_eq!(estimate_syllables("reading"), 2);
        assert_eq!(estimate_syllables("education"), 4);
    }

    #[test]
    fn silent_e_discounted() {
        assert_eq!(estimate_syllables("make"), 1);
        assert_eq!(estimate_syllables("notice"), 2);
    }

    #[test]
    fn le_ending_kept() {
        assert_eq!(estimate_syllables("table"), 2);
    }

    #[test]
    fn punctuation_ignored() {
        assert_eq!(estimate_syllables("cat,"), 1);
        assert_eq!(estimate_syllables("(reading)"), 2);
    }

    // -- flesch ---------------------------------------------------------------

    #[test]
    fn simple_prose_scores_high() {
        let text = "The cat sat on the mat. The dog ran to the park. We like it.";
        assert!(flesch_reading_ease(text) > 90.0);
    }

    #[test]
    fn dense_prose_scores_lower() {
        let simple = "The cat sat. The dog ran. It was fun.";
        let dense = "Epistemological considerations regarding computational \
                     complexity necessitate methodological reconsideration of \
                     foundational architectural determinations throughout \
                     heterogeneous organizational infrastructures.";
        assert!(flesch_reading_ease(dense) < flesch_reading_ease(simple));
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(flesch_reading_ease(""), 0.0);
    }

    #[test]
    fn score_is_clamped() {
        let text = "Go. Do. Be.";
        let score = flesch_reading_ease(text);
        assert!((0.0..=100.0).contains(&score));
    }
}
