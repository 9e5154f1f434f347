//! Batch-oriented chapter content generation.
//!
//! The pipeline takes a validated structure, schedules chapters
//! according to the configured [`Strategy`], carries key concepts
//! forward between batches for narrative continuity, and substitutes
//! placeholder content when every provider fails for a chapter so a
//! single bad chapter never sinks the course.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use coursegen_core::content::{fallback_content, GeneratedContent};
use coursegen_core::course::{self, ChapterSpec, ProficiencyLevel};
use coursegen_core::types::ChapterId;
use coursegen_core::CoreError;
use coursegen_provider::router::ProviderRouter;

use crate::strategy::{batches, Strategy};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub strategy: Strategy,
    /// Upper bound on concurrent provider calls within a batch.
    pub chapter_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            chapter_concurrency: 4,
        }
    }
}

/// How one chapter's content came to be.
#[derive(Debug, Clone)]
pub enum ChapterOutcome {
    /// A provider produced the content.
    Generated {
        content: GeneratedContent,
        provider: String,
    },
    /// Every provider failed; placeholder content was substituted.
    Fallback {
        content: GeneratedContent,
        error: String,
    },
}

impl ChapterOutcome {
    pub fn content(&self) -> &GeneratedContent {
        match self {
            Self::Generated { content, .. } | Self::Fallback { content, .. } => content,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// One generated chapter paired with its spec, in sequence order.
#[derive(Debug, Clone)]
pub struct GeneratedChapter {
    pub spec: ChapterSpec,
    pub outcome: ChapterOutcome,
}

/// Progress notification emitted after each chapter completes.
#[derive(Debug, Clone)]
pub struct ChapterProgress {
    pub chapter_id: ChapterId,
    pub sequence: u32,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Generation cancelled")]
    Cancelled,

    #[error(transparent)]
    InvalidStructure(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct ChapterPipeline {
    router: Arc<ProviderRouter>,
    config: PipelineConfig,
    limit: Arc<Semaphore>,
}

impl ChapterPipeline {
    pub fn new(router: Arc<ProviderRouter>, config: PipelineConfig) -> Self {
        let permits = config.chapter_concurrency.max(1);
        Self {
            router,
            config,
            limit: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Generate content for every chapter of a course.
    ///
    /// Chapters are processed in sequence-ordered batches sized by the
    /// strategy. Cancellation is observed between batches and before
    /// each provider call; calls already in flight are drained, not
    /// aborted, so no provider response is dropped mid-write.
    pub async fn generate_course(
        &self,
        chapters: &[ChapterSpec],
        level: ProficiencyLevel,
        cancel: &CancellationToken,
        progress: &mpsc::UnboundedSender<ChapterProgress>,
    ) -> Result<Vec<GeneratedChapter>, PipelineError> {
        course::validate_structure(chapters)?;

        let mut ordered: Vec<ChapterSpec> = chapters.to_vec();
        ordered.sort_by_key(|c| c.sequence_number);
        let total = ordered.len();

        let batch_size = self.config.strategy.effective_batch_size(total);
        let mut results: Vec<GeneratedChapter> = Vec::with_capacity(total);
        let mut prior_concepts: Vec<String> = Vec::new();
        let mut completed = 0usize;

        for range in batches(total, batch_size) {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            let batch = &ordered[range];
            let futures = batch.iter().map(|spec| {
                let router = Arc::clone(&self.router);
                let limit = Arc::clone(&self.limit);
                let cancel = cancel.clone();
                let concepts = prior_concepts.clone();
                let spec = spec.clone();
                async move {
                    let _permit = limit.acquire_owned().await;
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let outcome = match router.generate_content(&spec, level, &concepts).await {
                        Ok(routed) => {
                            debug!(
                                chapter = spec.sequence_number,
                                provider = %routed.provider,
                                "Chapter content generated"
                            );
                            ChapterOutcome::Generated {
                                content: routed.value,
                                provider: routed.provider,
                            }
                        }
                        Err(e) => {
                            warn!(
                                chapter = spec.sequence_number,
                                error = %e,
                                "All providers failed, substituting fallback content"
                            );
                            ChapterOutcome::Fallback {
                                content: fallback_content(&spec),
                                error: e.to_string(),
                            }
                        }
                    };
                    Some(GeneratedChapter { spec, outcome })
                }
            });

            let batch_results = join_all(futures).await;
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }

            for generated in batch_results.into_iter().flatten() {
                completed += 1;
                let _ = progress.send(ChapterProgress {
                    chapter_id: generated.spec.id,
                    sequence: generated.spec.sequence_number,
                    completed,
                    total,
                });
                merge_concepts(&mut prior_concepts, generated.outcome.content());
                results.push(generated);
            }
        }

        Ok(results)
    }
}

/// Append a chapter's key concepts, deduplicated, preserving first
/// appearance order.
fn merge_concepts(prior: &mut Vec<String>, content: &GeneratedContent) {
    for concept in &content.key_concepts {
        if !prior.contains(concept) {
            prior.push(concept.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
