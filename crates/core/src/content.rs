//! Generated chapter content: ordered blocks plus extracted lists.
//!
//! Content is produced by the pipeline, consumed by the quality gate
//! and the packaging layer. Block order indices must form a contiguous
//! `1..=N` sequence; [`validate_content`] enforces this before content
//! is accepted from any provider.

use serde::{Deserialize, Serialize};

use crate::course::ChapterSpec;
use crate::error::CoreError;
use crate::types::ChapterId;

// ---------------------------------------------------------------------------
// Block kinds
// ---------------------------------------------------------------------------

/// The kind of a single content block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Text,
    Code,
    Image,
    Video,
    Diagram,
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// One ordered unit of chapter content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub kind: BlockKind,
    /// 1-based position within the chapter. Contiguous per chapter.
    pub order: u32,
    pub body: String,
}

/// Full generated content for one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub chapter_id: ChapterId,
    pub blocks: Vec<ContentBlock>,
    /// Concepts introduced here, fed forward for narrative continuity.
    pub key_concepts: Vec<String>,
    pub examples: Vec<String>,
    pub exercises: Vec<String>,
    pub summary: String,
}

impl GeneratedContent {
    /// All prose of the chapter as a single string, used by the
    /// statistical scorers.
    pub fn combined_text(&self) -> String {
        let mut text = String::new();
        for block in &self.blocks {
            text.push_str(&block.body);
            text.push('\n');
        }
        text.push_str(&self.summary);
        text
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate generated content.
///
/// Block order indices must form a contiguous `1..=N` sequence (in any
/// supplied order) and the summary must be non-empty.
pub fn validate_content(content: &GeneratedContent) -> Result<(), CoreError> {
    if content.blocks.is_empty() {
        return Err(CoreError::Validation(
            "Generated content must contain at least one block".to_string(),
        ));
    }
    let mut orders: Vec<u32> = content.blocks.iter().map(|b| b.order).collect();
    orders.sort_unstable();
    for (i, order) in orders.iter().enumerate() {
        let expected = (i + 1) as u32;
        if *order != expected {
            return Err(CoreError::Validation(format!(
                "Block order indices must be contiguous 1..=N; expected {expected}, found {order}"
            )));
        }
    }
    if content.summary.is_empty() {
        return Err(CoreError::Validation(
            "Generated content must include a summary".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Fallback content
// ---------------------------------------------------------------------------

/// Build the minimal placeholder content substituted when every
/// provider fails for a chapter.
///
/// Title and objectives are preserved; the single text block marks the
/// chapter as requiring manual authoring. No key concepts are emitted
/// so continuity context is not polluted.
pub fn fallback_content(spec: &ChapterSpec) -> GeneratedContent {
    let objectives = spec
        .objectives
        .iter()
        .map(|o| format!("- {o}"))
        .collect::<Vec<_>>()
        .join("\n");
    GeneratedContent {
        chapter_id: spec.id,
        blocks: vec![ContentBlock {
            kind: BlockKind::Text,
            order: 1,
            body: format!(
                "{}\n\nThis chapter could not be generated automatically and \
                 requires manual authoring.\n\nLearning objectives:\n{objectives}",
                spec.title
            ),
        }],
        key_concepts: vec![],
        examples: vec![],
        exercises: vec![],
        summary: format!("Placeholder content for \"{}\".", spec.title),
    }
}

// ---------------------------------------------------------------------------
// Targeted regeneration splicing
// ---------------------------------------------------------------------------

/// Replace only the blocks named by `indices` in `prior` with the
/// same-order blocks from `fresh`, preserving everything else
/// byte-for-byte.
///
/// Blocks in `fresh` whose order is not in `indices` are ignored; an
/// index with no counterpart in `fresh` leaves the prior block
/// untouched. Key concepts, examples, exercises, and the summary are
/// always kept from `prior` under a targeted scope.
pub fn splice_blocks(
    prior: &GeneratedContent,
    fresh: &GeneratedContent,
    indices: &[u32],
) -> GeneratedContent {
    let mut result = prior.clone();
    for block in &mut result.blocks {
        if !indices.contains(&block.order) {
            continue;
        }
        if let Some(replacement) = fresh.blocks.iter().find(|b| b.order == block.order) {
            *block = replacement.clone();
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
