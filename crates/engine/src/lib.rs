//! Course generation engine.
//!
//! Owns job lifecycle end to end: submission, dispatch under a
//! concurrency cap, phase tracking with monotonic progress, retries
//! with backoff, cancellation, persistence, and the event stream.

pub mod config;
pub mod error;
pub mod events;
pub mod persistence;
pub mod store;
pub mod tracker;

pub use config::EngineConfig;
pub use error::EngineError;
pub use events::{EventBus, JobEvent};
pub use store::{FailureKind, JobRecord, JobStore};
pub use tracker::{ChapterReport, CourseResult, Engine, JobRequest};
