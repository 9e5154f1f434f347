//! Domain types and pure orchestration logic for the course generation
//! platform.
//!
//! This crate has zero internal dependencies so it can be used by the
//! provider, pipeline, and engine crates alike. It contains:
//!
//! - course/chapter/content domain types with validation,
//! - the job and regeneration state machines,
//! - retry/backoff and ETA math,
//! - the quality scoring model (readability, pedagogy, coverage,
//!   accuracy, bias) behind a pluggable [`quality::Scorer`] seam.
//!
//! Everything here is synchronous and deterministic; all async
//! coordination lives in the downstream crates.

pub mod backoff;
pub mod content;
pub mod course;
pub mod error;
pub mod eta;
pub mod job;
pub mod quality;
pub mod regeneration;
pub mod types;

pub use error::CoreError;
