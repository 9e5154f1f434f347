//! Engine error types.

use coursegen_core::types::JobId;
use coursegen_core::CoreError;

use crate::persistence::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    /// The job exists but has not completed, so there is no result yet.
    #[error("Job {0} has no result (state: {1})")]
    ResultNotReady(JobId, &'static str),

    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Persistence(#[from] StoreError),

    /// The engine is shutting down and no longer accepts work.
    #[error("Engine is shut down")]
    ShuttingDown,
}
