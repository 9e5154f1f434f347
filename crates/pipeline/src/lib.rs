//! Chapter generation pipeline.
//!
//! Turns a validated course structure into generated chapters using a
//! pluggable scheduling strategy, gates every chapter through the
//! quality checks, and drives regeneration when content falls short.

pub mod chapters;
pub mod gate;
pub mod regen;
pub mod strategy;

pub use chapters::{
    ChapterOutcome, ChapterPipeline, ChapterProgress, GeneratedChapter, PipelineConfig,
    PipelineError,
};
pub use gate::{Outcome, QualityGate};
pub use regen::{RegenOutcome, RegenerationController, RegenerationResult};
pub use strategy::Strategy;
