//! In-memory job bookkeeping.
//!
//! The store is the single authority on job state: every transition
//! goes through the core state machine, terminal states absorb all
//! later updates, and progress can only move forward. Exactly 100 is
//! written by the Completed transition and nothing else.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;

use coursegen_core::course::CourseSpec;
use coursegen_core::eta::{estimate_remaining, incremental_mean};
use coursegen_core::job::{monotonic_progress, state_machine, JobPhase, JobState};
use coursegen_core::quality::{QualityThresholds, QualityWeights};
use coursegen_core::types::{JobId, Timestamp};
use coursegen_core::CoreError;
use coursegen_pipeline::Strategy;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Machine-readable classification of why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The job hit its hard time limit.
    Timeout,
    /// Every attempt failed and the retry budget ran out.
    RetriesExhausted,
    /// Generated content could not be persisted.
    Persistence,
    /// Engine-side bookkeeping error.
    Internal,
}

/// Everything the engine tracks about one job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub spec: CourseSpec,
    pub strategy: Strategy,
    pub thresholds: QualityThresholds,
    pub weights: QualityWeights,
    pub state: JobState,
    pub phase: Option<JobPhase>,
    /// 0..=100, monotonic while Running.
    pub progress: u8,
    /// Whole-job retries consumed so far.
    pub retries: u32,
    pub error: Option<String>,
    pub error_kind: Option<FailureKind>,
    pub submitted_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub chapters_total: u32,
    pub chapters_completed: u32,
    /// Online mean of per-chapter wall-clock seconds.
    pub avg_chapter_secs: f64,
    pub eta_seconds: Option<u64>,
}

impl JobRecord {
    pub fn new(
        id: JobId,
        spec: CourseSpec,
        strategy: Strategy,
        thresholds: QualityThresholds,
        weights: QualityWeights,
    ) -> Self {
        Self {
            id,
            spec,
            strategy,
            thresholds,
            weights,
            state: JobState::Pending,
            phase: None,
            progress: 0,
            retries: 0,
            error: None,
            error_kind: None,
            submitted_at: Utc::now(),
            started_at: None,
            completed_at: None,
            chapters_total: 0,
            chapters_completed: 0,
            avg_chapter_secs: 0.0,
            eta_seconds: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: JobRecord) {
        self.jobs.write().await.insert(record.id, record);
    }

    pub async fn get(&self, id: JobId) -> Result<JobRecord, EngineError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EngineError::JobNotFound(id))
    }

    /// Apply a state transition through the core state machine.
    ///
    /// Running sets `started_at`; terminal states set `completed_at`;
    /// Completed also forces progress to exactly 100.
    pub async fn transition(&self, id: JobId, to: JobState) -> Result<(), EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        state_machine::validate_transition(record.state, to)
            .map_err(|msg| EngineError::Validation(CoreError::Validation(msg)))?;

        record.state = to;
        match to {
            JobState::Running => record.started_at = Some(Utc::now()),
            JobState::Completed => {
                record.completed_at = Some(Utc::now());
                record.progress = 100;
                record.eta_seconds = Some(0);
            }
            JobState::Failed | JobState::Cancelled => {
                record.completed_at = Some(Utc::now());
            }
            JobState::Pending => {}
        }
        Ok(())
    }

    /// Cancel if the job is still live. Returns whether a transition
    /// happened; cancelling a terminal job is a no-op.
    pub async fn cancel(&self, id: JobId) -> Result<bool, EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        if record.state.is_terminal() {
            return Ok(false);
        }
        state_machine::validate_transition(record.state, JobState::Cancelled)
            .map_err(|msg| EngineError::Validation(CoreError::Validation(msg)))?;
        record.state = JobState::Cancelled;
        record.completed_at = Some(Utc::now());
        Ok(true)
    }

    /// Enter a phase, advancing progress to at least the band start.
    pub async fn set_phase(&self, id: JobId, phase: JobPhase) -> Result<u8, EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        record.phase = Some(phase);
        let (start, _) = phase.progress_band();
        record.progress = monotonic_progress(record.progress, start);
        Ok(record.progress)
    }

    /// Propose a progress value. Regressions are held, terminal jobs
    /// are left untouched, and 100 is never reached this way.
    pub async fn update_progress(&self, id: JobId, proposed: u8) -> Result<u8, EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        if record.state.is_terminal() {
            return Ok(record.progress);
        }
        record.progress = monotonic_progress(record.progress, proposed.min(99));
        Ok(record.progress)
    }

    pub async fn set_chapters_total(&self, id: JobId, total: u32) -> Result<(), EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        record.chapters_total = total;
        record.chapters_completed = 0;
        Ok(())
    }

    /// Record one finished chapter's duration and refresh the ETA.
    pub async fn record_chapter(
        &self,
        id: JobId,
        secs: f64,
        concurrency: u32,
    ) -> Result<Option<u64>, EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        record.chapters_completed += 1;
        record.avg_chapter_secs =
            incremental_mean(record.avg_chapter_secs, secs, record.chapters_completed);
        record.eta_seconds = estimate_remaining(
            record.chapters_completed,
            record.chapters_total,
            record.avg_chapter_secs,
            concurrency,
        )
        .map(|d| d.as_secs());
        Ok(record.eta_seconds)
    }

    /// Count one consumed whole-job retry. Returns the new total.
    pub async fn record_retry(&self, id: JobId) -> Result<u32, EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        record.retries += 1;
        Ok(record.retries)
    }

    pub async fn set_error(
        &self,
        id: JobId,
        kind: FailureKind,
        error: String,
    ) -> Result<(), EngineError> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(&id).ok_or(EngineError::JobNotFound(id))?;
        record.error = Some(error);
        record.error_kind = Some(kind);
        Ok(())
    }

    /// Archive a job record, removing it from the store.
    pub async fn remove(&self, id: JobId) -> Option<JobRecord> {
        self.jobs.write().await.remove(&id)
    }

    /// Drop terminal records whose completion is older than `ttl`.
    /// Returns how many were removed.
    pub async fn prune_expired(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(ttl.as_secs() as i64);
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, record| match record.completed_at {
            Some(completed_at) if record.state.is_terminal() => completed_at > cutoff,
            _ => true,
        });
        before - jobs.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use coursegen_core::course::ProficiencyLevel;

    fn record() -> JobRecord {
        let spec = CourseSpec {
            title: "Intro to Rust".to_string(),
            domain: "programming".to_string(),
            level: ProficiencyLevel::Beginner,
            duration_hours: 8.0,
            objectives: vec!["Write a CLI tool".to_string()],
            prerequisites: vec![],
        };
        JobRecord::new(
            uuid::Uuid::new_v4(),
            spec,
            Strategy::default(),
            QualityThresholds::for_level(ProficiencyLevel::Beginner),
            QualityWeights::default(),
        )
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let store = JobStore::new();
        assert!(matches!(
            store.get(uuid::Uuid::new_v4()).await,
            Err(EngineError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn lifecycle_transitions_update_timestamps() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;

        store.transition(id, JobState::Running).await.unwrap();
        let got = store.get(id).await.unwrap();
        assert_eq!(got.state, JobState::Running);
        assert!(got.started_at.is_some());
        assert!(got.completed_at.is_none());

        store.transition(id, JobState::Completed).await.unwrap();
        let got = store.get(id).await.unwrap();
        assert_eq!(got.progress, 100);
        assert!(got.completed_at.is_some());
    }

    #[tokio::test]
    async fn invalid_transition_rejected() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;
        assert!(store.transition(id, JobState::Completed).await.is_err());
    }

    #[tokio::test]
    async fn terminal_states_absorb_updates() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;
        store.transition(id, JobState::Running).await.unwrap();
        store.transition(id, JobState::Failed).await.unwrap();

        assert!(store.transition(id, JobState::Running).await.is_err());
        let progress = store.update_progress(id, 90).await.unwrap();
        assert_eq!(progress, store.get(id).await.unwrap().progress);
        assert!(!store.cancel(id).await.unwrap());
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_stops_at_99() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;
        store.transition(id, JobState::Running).await.unwrap();

        assert_eq!(store.update_progress(id, 40).await.unwrap(), 40);
        assert_eq!(store.update_progress(id, 30).await.unwrap(), 40);
        // 100 is reserved for the Completed transition.
        assert_eq!(store.update_progress(id, 100).await.unwrap(), 99);
    }

    #[tokio::test]
    async fn phase_entry_bumps_progress_to_band_start() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;
        store.transition(id, JobState::Running).await.unwrap();

        assert_eq!(store.set_phase(id, JobPhase::Content).await.unwrap(), 10);
        assert_eq!(store.set_phase(id, JobPhase::Validation).await.unwrap(), 85);
    }

    #[tokio::test]
    async fn chapter_samples_drive_eta() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;
        store.set_chapters_total(id, 4).await.unwrap();

        let eta = store.record_chapter(id, 30.0, 1).await.unwrap();
        assert_eq!(eta, Some(90));
        let eta = store.record_chapter(id, 10.0, 2).await.unwrap();
        // avg 20s, 2 remaining, concurrency 2.
        assert_eq!(eta, Some(20));
    }

    #[tokio::test]
    async fn retries_accumulate() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;

        assert_eq!(store.record_retry(id).await.unwrap(), 1);
        assert_eq!(store.record_retry(id).await.unwrap(), 2);
        assert_eq!(store.get(id).await.unwrap().retries, 2);
    }

    #[tokio::test]
    async fn error_carries_a_kind() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;
        store
            .set_error(id, FailureKind::Timeout, "too slow".to_string())
            .await
            .unwrap();

        let got = store.get(id).await.unwrap();
        assert_eq!(got.error_kind, Some(FailureKind::Timeout));
        assert_eq!(got.error.as_deref(), Some("too slow"));
    }

    #[tokio::test]
    async fn remove_archives_the_record() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;

        assert!(store.remove(id).await.is_some());
        assert!(matches!(
            store.get(id).await,
            Err(EngineError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn prune_drops_only_expired_terminal_records() {
        let store = JobStore::new();
        let live = record();
        let live_id = live.id;
        store.insert(live).await;

        let mut done = record();
        let done_id = done.id;
        done.state = JobState::Completed;
        done.completed_at = Some(Utc::now() - chrono::Duration::seconds(120));
        store.insert(done).await;

        let mut fresh = record();
        let fresh_id = fresh.id;
        fresh.state = JobState::Failed;
        fresh.completed_at = Some(Utc::now());
        store.insert(fresh).await;

        assert_eq!(store.prune_expired(Duration::from_secs(60)).await, 1);
        assert!(store.get(live_id).await.is_ok());
        assert!(store.get(done_id).await.is_err());
        assert!(store.get(fresh_id).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let store = JobStore::new();
        let r = record();
        let id = r.id;
        store.insert(r).await;
        assert!(store.cancel(id).await.unwrap());
        assert!(!store.cancel(id).await.unwrap());
        assert_eq!(store.get(id).await.unwrap().state, JobState::Cancelled);
    }
}
