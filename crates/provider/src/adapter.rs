//! The provider adapter seam.
//!
//! Everything above this layer (pipeline, engine) talks to providers
//! exclusively through [`ProviderAdapter`], so backends can be added
//! or swapped without touching orchestration code.

use async_trait::async_trait;

use coursegen_core::content::GeneratedContent;
use coursegen_core::course::{ChapterSpec, CourseSpec, ProficiencyLevel};
use coursegen_core::quality::ValidationSignal;

use crate::error::ProviderError;

/// One LLM backend capable of the three generation operations.
///
/// Implementations must be safe to call concurrently; rate limiting
/// is applied outside the adapter by the router.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider name for logs, records, and routing decisions.
    fn name(&self) -> &str;

    /// Produce a course structure (ordered chapter list) for a spec.
    ///
    /// The returned structure must already satisfy
    /// [`coursegen_core::course::validate_structure`]; adapters
    /// validate before returning so malformed model output surfaces
    /// as [`ProviderError::MalformedResponse`].
    async fn generate_structure(
        &self,
        spec: &CourseSpec,
    ) -> Result<Vec<ChapterSpec>, ProviderError>;

    /// Generate the content of one chapter.
    ///
    /// `prior_concepts` carries key concepts from already-generated
    /// chapters so the provider can build on them.
    async fn generate_chapter_content(
        &self,
        chapter: &ChapterSpec,
        level: ProficiencyLevel,
        prior_concepts: &[String],
    ) -> Result<GeneratedContent, ProviderError>;

    /// Ask the provider to validate generated content against the
    /// chapter objectives. The returned signal supplements the local
    /// heuristic scorers; it never replaces the gate.
    async fn validate_content(
        &self,
        content: &GeneratedContent,
        level: ProficiencyLevel,
        objectives: &[String],
        domain: &str,
    ) -> Result<ValidationSignal, ProviderError>;
}
