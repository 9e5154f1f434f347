//! Core error type shared by all validation helpers in this crate.

/// Errors produced by pure domain logic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A domain invariant was violated.
    #[error("Validation error: {0}")]
    Validation(String),
}
