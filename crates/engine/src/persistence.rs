//! Content persistence seam.
//!
//! The engine saves chapters as they are finalized and the assembled
//! course when a job completes. The trait keeps storage pluggable; the
//! in-memory implementation backs tests and single-process use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use coursegen_core::types::JobId;

use crate::tracker::{ChapterReport, CourseResult};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("No stored result for job {0}")]
    NotFound(JobId),
}

/// Durable storage for generated course material.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist one finalized chapter of a running job.
    async fn save_chapter(&self, job_id: JobId, chapter: &ChapterReport) -> Result<(), StoreError>;

    /// Persist the assembled course for a completed job.
    async fn save_result(&self, result: &CourseResult) -> Result<(), StoreError>;

    /// Load the assembled course of a completed job.
    async fn load_result(&self, job_id: JobId) -> Result<CourseResult, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryStore {
    chapters: RwLock<HashMap<JobId, Vec<ChapterReport>>>,
    results: RwLock<HashMap<JobId, CourseResult>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chapters saved so far for a job, in save order.
    pub async fn saved_chapters(&self, job_id: JobId) -> Vec<ChapterReport> {
        self.chapters
            .read()
            .await
            .get(&job_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    async fn save_chapter(&self, job_id: JobId, chapter: &ChapterReport) -> Result<(), StoreError> {
        self.chapters
            .write()
            .await
            .entry(job_id)
            .or_default()
            .push(chapter.clone());
        Ok(())
    }

    async fn save_result(&self, result: &CourseResult) -> Result<(), StoreError> {
        self.results
            .write()
            .await
            .insert(result.job_id, result.clone());
        Ok(())
    }

    async fn load_result(&self, job_id: JobId) -> Result<CourseResult, StoreError> {
        self.results
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or(StoreError::NotFound(job_id))
    }
}
