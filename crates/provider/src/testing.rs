//! Deterministic scripted provider for tests.
//!
//! Produces stable structures and content without any network, records
//! every content call (sequence number plus the prior-concept context
//! it was given) so tests can assert ordering and continuity, and can
//! be scripted to fail, stall, or report quota exhaustion.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use coursegen_core::content::{BlockKind, ContentBlock, GeneratedContent};
use coursegen_core::course::{ChapterSpec, CourseSpec, ProficiencyLevel};
use coursegen_core::quality::ValidationSignal;

use crate::adapter::ProviderAdapter;
use crate::error::ProviderError;

/// How the provider behaves for calls not otherwise scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Succeed,
    Fail,
    Quota,
    Stall,
}

/// One recorded `generate_chapter_content` call.
#[derive(Debug, Clone)]
pub struct ContentCall {
    pub sequence: u32,
    pub prior_concepts: Vec<String>,
}

pub struct ScriptedProvider {
    name: String,
    behavior: Behavior,
    structure: Option<Vec<ChapterSpec>>,
    /// Sequence numbers whose content calls always fail.
    failing_sequences: HashSet<u32>,
    validation: ValidationSignal,
    calls: Mutex<Vec<ContentCall>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Succeed,
            structure: None,
            failing_sequences: HashSet::new(),
            validation: passing_signal(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Provider that fails every call with [`ProviderError::Unavailable`].
    pub fn always_failing(name: &str) -> Self {
        Self {
            behavior: Behavior::Fail,
            ..Self::new(name)
        }
    }

    /// Provider that fails every call with [`ProviderError::QuotaExceeded`].
    pub fn quota_exhausted(name: &str) -> Self {
        Self {
            behavior: Behavior::Quota,
            ..Self::new(name)
        }
    }

    /// Provider whose calls never resolve, for timeout tests.
    pub fn stalled(name: &str) -> Self {
        Self {
            behavior: Behavior::Stall,
            ..Self::new(name)
        }
    }

    /// Serve this fixed structure instead of deriving one.
    pub fn with_structure(mut self, chapters: Vec<ChapterSpec>) -> Self {
        self.structure = Some(chapters);
        self
    }

    /// Make content calls for this chapter sequence number fail.
    pub fn failing_for(mut self, sequence: u32) -> Self {
        self.failing_sequences.insert(sequence);
        self
    }

    /// Serve this validation signal instead of the passing default.
    pub fn with_validation(mut self, signal: ValidationSignal) -> Self {
        self.validation = signal;
        self
    }

    /// Recorded content calls in arrival order.
    pub async fn calls(&self) -> Vec<ContentCall> {
        self.calls.lock().await.clone()
    }

    fn gate(&self) -> Result<(), ProviderError> {
        match self.behavior {
            Behavior::Succeed | Behavior::Stall => Ok(()),
            Behavior::Fail => Err(ProviderError::Unavailable("scripted failure".to_string())),
            Behavior::Quota => Err(ProviderError::QuotaExceeded),
        }
    }

    async fn stall_if_scripted(&self) {
        if self.behavior == Behavior::Stall {
            std::future::pending::<()>().await;
        }
    }
}

/// Validation signal that clears the default gate.
fn passing_signal() -> ValidationSignal {
    ValidationSignal {
        overall: 0.95,
        readability: 0.9,
        pedagogy: 0.9,
        coverage: 1.0,
        accuracy: 0.95,
        issues: vec![],
    }
}

/// Derive a deterministic structure from the course spec: one chapter
/// per objective, complexity non-decreasing.
fn derived_structure(spec: &CourseSpec) -> Vec<ChapterSpec> {
    spec.objectives
        .iter()
        .enumerate()
        .map(|(i, objective)| ChapterSpec {
            id: uuid::Uuid::new_v4(),
            sequence_number: (i + 1) as u32,
            title: format!("Chapter {}: {}", i + 1, objective),
            objectives: vec![objective.clone()],
            duration_minutes: 45,
            complexity: (1.0 + i as f64 * 0.5).min(5.0),
            prerequisites: vec![],
        })
        .collect()
}

/// Deterministic content for a chapter. The prose echoes the chapter
/// objectives so objective coverage measures as complete.
fn scripted_content(chapter: &ChapterSpec, prior_concepts: &[String]) -> GeneratedContent {
    let seq = chapter.sequence_number;
    let objectives = chapter.objectives.join(". ");
    let continuity = if prior_concepts.is_empty() {
        String::new()
    } else {
        format!(" Recall that we covered {}.", prior_concepts.join(", "))
    };
    GeneratedContent {
        chapter_id: chapter.id,
        blocks: vec![
            ContentBlock {
                kind: BlockKind::Text,
                order: 1,
                body: format!(
                    "{title}. This chapter covers: {objectives}.{continuity}",
                    title = chapter.title
                ),
            },
            ContentBlock {
                kind: BlockKind::Code,
                order: 2,
                body: format!("// worked example for chapter {seq}"),
            },
        ],
        key_concepts: vec![format!("concept-{seq}")],
        examples: vec![format!("example-{seq}")],
        exercises: vec![format!("Explain the ideas from chapter {seq} in your own words.")],
        summary: format!("Summary of chapter {seq}: {objectives}."),
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_structure(
        &self,
        spec: &CourseSpec,
    ) -> Result<Vec<ChapterSpec>, ProviderError> {
        self.stall_if_scripted().await;
        self.gate()?;
        Ok(self
            .structure
            .clone()
            .unwrap_or_else(|| derived_structure(spec)))
    }

    async fn generate_chapter_content(
        &self,
        chapter: &ChapterSpec,
        _level: ProficiencyLevel,
        prior_concepts: &[String],
    ) -> Result<GeneratedContent, ProviderError> {
        self.stall_if_scripted().await;
        self.calls.lock().await.push(ContentCall {
            sequence: chapter.sequence_number,
            prior_concepts: prior_concepts.to_vec(),
        });
        self.gate()?;
        if self.failing_sequences.contains(&chapter.sequence_number) {
            return Err(ProviderError::Timeout(Duration::from_secs(0)));
        }
        Ok(scripted_content(chapter, prior_concepts))
    }

    async fn validate_content(
        &self,
        _content: &GeneratedContent,
        _level: ProficiencyLevel,
        _objectives: &[String],
        _domain: &str,
    ) -> Result<ValidationSignal, ProviderError> {
        self.stall_if_scripted().await;
        self.gate()?;
        Ok(self.validation.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use coursegen_core::{content, course};

    fn spec() -> CourseSpec {
        CourseSpec {
            title: "Intro to Rust".to_string(),
            domain: "programming".to_string(),
            level: ProficiencyLevel::Beginner,
            duration_hours: 8.0,
            objectives: vec![
                "Understand ownership".to_string(),
                "Use pattern matching".to_string(),
            ],
            prerequisites: vec![],
        }
    }

    #[tokio::test]
    async fn derived_structure_is_valid() {
        let provider = ScriptedProvider::new("scripted");
        let chapters = provider.generate_structure(&spec()).await.unwrap();
        assert_eq!(chapters.len(), 2);
        assert!(course::validate_structure(&chapters).is_ok());
    }

    #[tokio::test]
    async fn scripted_content_is_valid_and_covers_objectives() {
        let provider = ScriptedProvider::new("scripted");
        let chapters = provider.generate_structure(&spec()).await.unwrap();
        let generated = provider
            .generate_chapter_content(&chapters[0], ProficiencyLevel::Beginner, &[])
            .await
            .unwrap();
        assert!(content::validate_content(&generated).is_ok());
        assert!(generated.combined_text().contains("ownership"));
        assert_eq!(generated.key_concepts, vec!["concept-1".to_string()]);
    }

    #[tokio::test]
    async fn calls_record_sequence_and_context() {
        let provider = ScriptedProvider::new("scripted");
        let chapters = provider.generate_structure(&spec()).await.unwrap();
        let prior = vec!["concept-1".to_string()];
        provider
            .generate_chapter_content(&chapters[1], ProficiencyLevel::Beginner, &prior)
            .await
            .unwrap();

        let calls = provider.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sequence, 2);
        assert_eq!(calls[0].prior_concepts, prior);
    }

    #[tokio::test]
    async fn failing_for_targets_one_chapter() {
        let provider = ScriptedProvider::new("scripted").failing_for(2);
        let chapters = provider.generate_structure(&spec()).await.unwrap();
        assert!(provider
            .generate_chapter_content(&chapters[0], ProficiencyLevel::Beginner, &[])
            .await
            .is_ok());
        assert!(provider
            .generate_chapter_content(&chapters[1], ProficiencyLevel::Beginner, &[])
            .await
            .is_err());
    }
}
