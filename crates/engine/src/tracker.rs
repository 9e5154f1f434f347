//! Job orchestration.
//!
//! The [`Engine`] owns the whole job lifecycle: submissions enter a
//! queue, a dispatcher loop runs them under a worker-concurrency cap,
//! each job executes the four phases (structure, content, assessment,
//! validation) with retries and backoff, and results are persisted
//! before the job is marked complete. Cancellation propagates through
//! per-job child tokens of one master shutdown token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use coursegen_core::backoff::{self, RetryConfig, QUOTA_BACKOFF};
use coursegen_core::content::GeneratedContent;
use coursegen_core::course::{ChapterSpec, CourseSpec};
use coursegen_core::job::{phase_progress, JobPhase, JobState};
use coursegen_core::quality::{
    validate_thresholds, validate_weights, QualityReport, QualityThresholds, QualityWeights,
};
use coursegen_core::regeneration::{RegenerationRecord, RegenerationScope};
use coursegen_core::types::{JobId, Timestamp};
use coursegen_pipeline::chapters::{ChapterPipeline, ChapterProgress, PipelineConfig};
use coursegen_pipeline::gate::{Outcome, QualityGate};
use coursegen_pipeline::regen::{RegenOutcome, RegenerationConfig, RegenerationController};
use coursegen_pipeline::{ChapterOutcome, PipelineError, Strategy};
use coursegen_provider::router::ProviderRouter;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EventBus, JobEvent};
use crate::persistence::{ContentStore, StoreError};
use crate::store::{FailureKind, JobRecord, JobStore};

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// A course generation request. Strategy, thresholds, and weights are
/// optional overrides of the level-appropriate defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRequest {
    pub spec: CourseSpec,
    #[serde(default)]
    pub strategy: Option<Strategy>,
    #[serde(default)]
    pub thresholds: Option<QualityThresholds>,
    #[serde(default)]
    pub weights: Option<QualityWeights>,
}

impl JobRequest {
    pub fn new(spec: CourseSpec) -> Self {
        Self {
            spec,
            strategy: None,
            thresholds: None,
            weights: None,
        }
    }
}

/// Assessment material assembled for one chapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentSet {
    pub exercises: Vec<String>,
    pub review_questions: Vec<String>,
}

/// Final record of one chapter in a completed course.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterReport {
    pub spec: ChapterSpec,
    pub content: GeneratedContent,
    /// Provider that produced the final content, `None` for fallback.
    pub provider: Option<String>,
    pub fallback: bool,
    /// Quality report of the final content. Fallback chapters carry
    /// none because they bypass the gate.
    pub quality: Option<QualityReport>,
    pub needs_manual_review: bool,
    pub regenerations: Vec<RegenerationRecord>,
    pub assessment: AssessmentSet,
}

/// The assembled course for a completed job.
#[derive(Debug, Clone, Serialize)]
pub struct CourseResult {
    pub job_id: JobId,
    pub spec: CourseSpec,
    pub chapters: Vec<ChapterReport>,
    pub generated_at: Timestamp,
}

impl CourseResult {
    /// Chapters flagged for human attention.
    pub fn flagged_chapters(&self) -> Vec<u32> {
        self.chapters
            .iter()
            .filter(|c| c.needs_manual_review)
            .map(|c| c.spec.sequence_number)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Internal failure plumbing
// ---------------------------------------------------------------------------

enum AttemptError {
    Cancelled,
    Retryable { quota: bool, message: String },
    Fatal(String),
}

enum JobFailure {
    Cancelled,
    TimedOut,
    Fatal(FailureKind, String),
}

fn fatal(e: EngineError) -> AttemptError {
    AttemptError::Fatal(e.to_string())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    config: EngineConfig,
    router: Arc<ProviderRouter>,
    content_store: Arc<dyn ContentStore>,
    store: Arc<JobStore>,
    events: EventBus,
    queue: mpsc::UnboundedSender<JobId>,
    tokens: RwLock<HashMap<JobId, CancellationToken>>,
    master: CancellationToken,
}

impl Engine {
    /// Create the engine and start its dispatcher loop.
    pub fn start(
        router: Arc<ProviderRouter>,
        content_store: Arc<dyn ContentStore>,
        config: EngineConfig,
    ) -> Arc<Self> {
        let (queue, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Self {
            events: EventBus::new(config.event_capacity),
            config,
            router,
            content_store,
            store: Arc::new(JobStore::new()),
            queue,
            tokens: RwLock::new(HashMap::new()),
            master: CancellationToken::new(),
        });
        tokio::spawn(Arc::clone(&engine).dispatch_loop(rx));
        engine
    }

    // ---- public API ----

    /// Validate and enqueue a job. Returns its id immediately.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId, EngineError> {
        if self.master.is_cancelled() {
            return Err(EngineError::ShuttingDown);
        }
        request.spec.validate_spec()?;
        let thresholds = request
            .thresholds
            .unwrap_or_else(|| QualityThresholds::for_level(request.spec.level));
        validate_thresholds(&thresholds)?;
        let weights = request.weights.unwrap_or_default();
        validate_weights(&weights)?;
        let strategy = request.strategy.unwrap_or_default();

        let id = uuid::Uuid::new_v4();
        self.store
            .insert(JobRecord::new(id, request.spec, strategy, thresholds, weights))
            .await;
        self.tokens.write().await.insert(id, self.master.child_token());
        self.queue
            .send(id)
            .map_err(|_| EngineError::ShuttingDown)?;
        self.events.publish(JobEvent::JobSubmitted { job_id: id });
        info!(job_id = %id, strategy = strategy.name(), "Job submitted");
        Ok(id)
    }

    /// Current bookkeeping snapshot for a job.
    pub async fn status(&self, id: JobId) -> Result<JobRecord, EngineError> {
        self.store.get(id).await
    }

    /// Cancel a pending or running job. Returns whether anything
    /// changed; cancelling a terminal job is a no-op.
    pub async fn cancel(&self, id: JobId) -> Result<bool, EngineError> {
        let changed = self.store.cancel(id).await?;
        if changed {
            if let Some(token) = self.tokens.read().await.get(&id) {
                token.cancel();
            }
            self.events.publish(JobEvent::JobCancelled { job_id: id });
            info!(job_id = %id, "Job cancelled");
        }
        Ok(changed)
    }

    /// The assembled course of a completed job. Retrieval archives the
    /// job record; later `status`/`result` calls report the job as
    /// unknown.
    pub async fn result(&self, id: JobId) -> Result<CourseResult, EngineError> {
        let record = self.store.get(id).await?;
        match record.state {
            JobState::Completed => {
                let result = self.content_store.load_result(id).await?;
                self.store.remove(id).await;
                Ok(result)
            }
            other => Err(EngineError::ResultNotReady(id, other.name())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Stop accepting work and cancel all live jobs.
    pub fn shutdown(&self) {
        info!("Engine shutting down");
        self.master.cancel();
    }

    // ---- dispatcher ----

    async fn dispatch_loop(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<JobId>) {
        let permits = Arc::new(Semaphore::new(self.config.worker_concurrency.max(1)));
        let mut sweep = tokio::time::interval(Duration::from_secs(60));
        info!(
            concurrency = self.config.worker_concurrency,
            "Job dispatcher started"
        );

        loop {
            let job_id = tokio::select! {
                _ = self.master.cancelled() => break,
                _ = sweep.tick() => {
                    let pruned = self.store.prune_expired(self.config.result_ttl()).await;
                    if pruned > 0 {
                        debug!(pruned, "Expired job records pruned");
                    }
                    continue;
                }
                received = rx.recv() => match received {
                    Some(id) => id,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = self.master.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let engine = Arc::clone(&self);
            tokio::spawn(async move {
                engine.run_job(job_id).await;
                drop(permit);
            });
        }
        info!("Job dispatcher stopped");
    }

    // ---- job execution ----

    async fn run_job(&self, id: JobId) {
        let record = match self.store.get(id).await {
            Ok(r) => r,
            Err(e) => {
                error!(job_id = %id, error = %e, "Dispatched job missing from store");
                return;
            }
        };
        // Cancelled while still queued.
        if record.state != JobState::Pending {
            self.tokens.write().await.remove(&id);
            return;
        }
        let token = match self.tokens.read().await.get(&id) {
            Some(t) => t.clone(),
            None => self.master.child_token(),
        };

        if let Err(e) = self.store.transition(id, JobState::Running).await {
            warn!(job_id = %id, error = %e, "Job not runnable");
            return;
        }
        self.events.publish(JobEvent::JobStarted { job_id: id });
        info!(job_id = %id, title = %record.spec.title, "Job started");

        // Cancellation flows through the attempt itself so in-flight
        // chapter work drains instead of being dropped mid-call. Only
        // the hard job deadline aborts the attempt future.
        let outcome = tokio::select! {
            _ = tokio::time::sleep(self.config.job_timeout()) => Err(JobFailure::TimedOut),
            result = self.run_with_retries(id, &record, &token) => result,
        };

        match outcome {
            Ok(_) if token.is_cancelled() => {
                if let Ok(true) = self.store.cancel(id).await {
                    self.events.publish(JobEvent::JobCancelled { job_id: id });
                }
                info!(job_id = %id, "Job cancelled at completion, result discarded");
            }
            Ok(result) => {
                if let Err(e) = self.persist(&result).await {
                    self.fail(id, FailureKind::Persistence, format!("Persistence failed: {e}"))
                        .await;
                } else if self.store.transition(id, JobState::Completed).await.is_ok() {
                    self.events.publish(JobEvent::JobCompleted { job_id: id });
                    info!(
                        job_id = %id,
                        chapters = result.chapters.len(),
                        flagged = result.flagged_chapters().len(),
                        "Job completed"
                    );
                }
            }
            Err(JobFailure::Cancelled) => {
                // cancel() may have already moved the store.
                if let Ok(true) = self.store.cancel(id).await {
                    self.events.publish(JobEvent::JobCancelled { job_id: id });
                }
                info!(job_id = %id, "Job cancelled during execution");
            }
            Err(JobFailure::TimedOut) => {
                self.fail(
                    id,
                    FailureKind::Timeout,
                    format!("Job timed out after {}s", self.config.job_timeout_secs),
                )
                .await;
            }
            Err(JobFailure::Fatal(kind, message)) => self.fail(id, kind, message).await,
        }

        self.tokens.write().await.remove(&id);
    }

    async fn fail(&self, id: JobId, kind: FailureKind, message: String) {
        let _ = self.store.set_error(id, kind, message.clone()).await;
        if self.store.transition(id, JobState::Failed).await.is_ok() {
            self.events.publish(JobEvent::JobFailed {
                job_id: id,
                error: message.clone(),
            });
        }
        warn!(job_id = %id, error = %message, "Job failed");
    }

    /// Retry failed attempts with exponential backoff; quota failures
    /// wait out the full quota window instead.
    async fn run_with_retries(
        &self,
        id: JobId,
        record: &JobRecord,
        token: &CancellationToken,
    ) -> Result<CourseResult, JobFailure> {
        let retry = RetryConfig::default();
        let mut attempt: u32 = 0;
        loop {
            match self.run_attempt(id, record, token).await {
                Ok(result) => return Ok(result),
                Err(AttemptError::Cancelled) => return Err(JobFailure::Cancelled),
                Err(AttemptError::Fatal(message)) => {
                    return Err(JobFailure::Fatal(FailureKind::Internal, message))
                }
                Err(AttemptError::Retryable { quota, message }) => {
                    if attempt >= self.config.max_job_retries {
                        return Err(JobFailure::Fatal(
                            FailureKind::RetriesExhausted,
                            format!(
                                "Retries exhausted after {} attempts: {message}",
                                attempt + 1
                            ),
                        ));
                    }
                    let _ = self.store.record_retry(id).await;
                    let delay = if quota {
                        QUOTA_BACKOFF
                    } else {
                        backoff::jittered(backoff::delay_for_attempt(attempt, &retry), retry.jitter)
                    };
                    warn!(
                        job_id = %id,
                        attempt,
                        delay_secs = delay.as_secs(),
                        quota,
                        error = %message,
                        "Attempt failed, backing off"
                    );
                    tokio::select! {
                        _ = token.cancelled() => return Err(JobFailure::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// One full pass through the four phases.
    async fn run_attempt(
        &self,
        id: JobId,
        record: &JobRecord,
        token: &CancellationToken,
    ) -> Result<CourseResult, AttemptError> {
        let spec = &record.spec;

        // ---- Structure ----
        self.enter_phase(id, JobPhase::Structure).await?;
        if token.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }
        let structure = match self.router.generate_structure(spec).await {
            Ok(routed) => {
                info!(
                    job_id = %id,
                    chapters = routed.value.len(),
                    provider = %routed.provider,
                    "Course structure generated"
                );
                routed.value
            }
            Err(e) => {
                return Err(AttemptError::Retryable {
                    quota: e.is_quota(),
                    message: e.to_string(),
                })
            }
        };
        self.store
            .set_chapters_total(id, structure.len() as u32)
            .await
            .map_err(fatal)?;
        self.store
            .update_progress(id, phase_progress(JobPhase::Structure, 1.0))
            .await
            .map_err(fatal)?;
        self.publish_progress(id).await;
        if token.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }

        // ---- Content ----
        self.enter_phase(id, JobPhase::Content).await?;
        let pipeline = ChapterPipeline::new(
            Arc::clone(&self.router),
            PipelineConfig {
                strategy: record.strategy,
                chapter_concurrency: self.config.chapter_concurrency,
            },
        );
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ChapterProgress>();
        let listener = {
            let store = Arc::clone(&self.store);
            let events = self.events.clone();
            tokio::spawn(async move {
                // Inter-completion gaps approximate effective chapter
                // throughput, concurrency included.
                let mut last = Instant::now();
                while let Some(p) = progress_rx.recv().await {
                    let gap = last.elapsed().as_secs_f64();
                    last = Instant::now();
                    let eta = store.record_chapter(id, gap, 1).await.ok().flatten();
                    let fraction = p.completed as f64 / p.total.max(1) as f64;
                    let progress = store
                        .update_progress(id, phase_progress(JobPhase::Content, fraction))
                        .await
                        .unwrap_or(0);
                    events.publish(JobEvent::JobProgress {
                        job_id: id,
                        progress,
                        eta_seconds: eta,
                    });
                }
            })
        };

        let generated = pipeline
            .generate_course(&structure, spec.level, token, &progress_tx)
            .await;
        drop(progress_tx);
        let _ = listener.await;

        let generated = match generated {
            Ok(g) => g,
            Err(PipelineError::Cancelled) => return Err(AttemptError::Cancelled),
            Err(PipelineError::InvalidStructure(e)) => {
                return Err(AttemptError::Retryable {
                    quota: false,
                    message: e.to_string(),
                })
            }
        };
        for g in &generated {
            self.events.publish(JobEvent::ChapterCompleted {
                job_id: id,
                chapter_id: g.spec.id,
                sequence: g.spec.sequence_number,
                fallback: g.outcome.is_fallback(),
            });
        }

        // ---- Assessment ----
        if token.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }
        self.enter_phase(id, JobPhase::Assessment).await?;
        let total = generated.len().max(1);
        let mut assessments = Vec::with_capacity(generated.len());
        for (i, g) in generated.iter().enumerate() {
            assessments.push(assemble_assessment(&g.spec, g.outcome.content()));
            let fraction = (i + 1) as f64 / total as f64;
            self.store
                .update_progress(id, phase_progress(JobPhase::Assessment, fraction))
                .await
                .map_err(fatal)?;
        }
        self.publish_progress(id).await;

        // ---- Validation ----
        self.enter_phase(id, JobPhase::Validation).await?;
        let gate = QualityGate::new(record.thresholds, record.weights);
        let controller = RegenerationController::new(RegenerationConfig::default());
        let mut concepts: Vec<String> = Vec::new();
        for g in &generated {
            for c in &g.outcome.content().key_concepts {
                if !concepts.contains(c) {
                    concepts.push(c.clone());
                }
            }
        }

        let mut chapters = Vec::with_capacity(generated.len());
        for (i, (g, mut assessment)) in generated.into_iter().zip(assessments).enumerate() {
            if token.is_cancelled() {
                return Err(AttemptError::Cancelled);
            }
            let report = match g.outcome {
                ChapterOutcome::Fallback { content, .. } => ChapterReport {
                    spec: g.spec,
                    content,
                    provider: None,
                    fallback: true,
                    quality: None,
                    needs_manual_review: true,
                    regenerations: vec![],
                    assessment,
                },
                ChapterOutcome::Generated { content, provider } => {
                    let outcome = gate
                        .check(&self.router, &content, spec.level, &g.spec.objectives, &spec.domain)
                        .await;
                    match outcome {
                        Outcome::Accepted(quality) => ChapterReport {
                            spec: g.spec,
                            content,
                            provider: Some(provider),
                            fallback: false,
                            quality: Some(quality),
                            needs_manual_review: false,
                            regenerations: vec![],
                            assessment,
                        },
                        Outcome::NeedsRegeneration(quality) => {
                            let reason = quality
                                .issues
                                .first()
                                .map(|issue| issue.message.clone())
                                .unwrap_or_else(|| "Quality below thresholds".to_string());
                            let result = controller
                                .regenerate(
                                    &self.router,
                                    &gate,
                                    &g.spec,
                                    &content,
                                    &quality,
                                    &reason,
                                    &RegenerationScope::Full,
                                    spec.level,
                                    &concepts,
                                    &spec.domain,
                                )
                                .await;
                            let needs_manual_review = result.needs_manual_review();
                            let (final_content, final_report) = match result.outcome {
                                RegenOutcome::Accepted { content, report }
                                | RegenOutcome::ManualReviewRequired { content, report } => {
                                    (content, report)
                                }
                            };
                            // Regeneration may have replaced the exercises.
                            assessment = assemble_assessment(&g.spec, &final_content);
                            ChapterReport {
                                spec: g.spec,
                                content: final_content,
                                provider: Some(provider),
                                fallback: false,
                                quality: Some(final_report),
                                needs_manual_review,
                                regenerations: result.records,
                                assessment,
                            }
                        }
                    }
                }
            };
            chapters.push(report);
            let fraction = (i + 1) as f64 / total as f64;
            self.store
                .update_progress(id, phase_progress(JobPhase::Validation, fraction))
                .await
                .map_err(fatal)?;
        }
        self.publish_progress(id).await;

        Ok(CourseResult {
            job_id: id,
            spec: spec.clone(),
            chapters,
            generated_at: Utc::now(),
        })
    }

    async fn enter_phase(&self, id: JobId, phase: JobPhase) -> Result<(), AttemptError> {
        self.store.set_phase(id, phase).await.map_err(fatal)?;
        self.events.publish(JobEvent::PhaseChanged { job_id: id, phase });
        Ok(())
    }

    async fn publish_progress(&self, id: JobId) {
        if let Ok(record) = self.store.get(id).await {
            self.events.publish(JobEvent::JobProgress {
                job_id: id,
                progress: record.progress,
                eta_seconds: record.eta_seconds,
            });
        }
    }

    /// Persist all chapters and the assembled result. A failed chapter
    /// save is retried once before giving up.
    async fn persist(&self, result: &CourseResult) -> Result<(), StoreError> {
        for chapter in &result.chapters {
            if let Err(e) = self.content_store.save_chapter(result.job_id, chapter).await {
                warn!(
                    job_id = %result.job_id,
                    chapter = chapter.spec.sequence_number,
                    error = %e,
                    "Chapter save failed, retrying once"
                );
                self.content_store.save_chapter(result.job_id, chapter).await?;
            }
        }
        self.content_store.save_result(result).await
    }
}

// ---------------------------------------------------------------------------
// Assessment assembly
// ---------------------------------------------------------------------------

/// Build the assessment set for one chapter from its final content:
/// the generated exercises plus one review question per objective.
fn assemble_assessment(spec: &ChapterSpec, content: &GeneratedContent) -> AssessmentSet {
    AssessmentSet {
        exercises: content.exercises.clone(),
        review_questions: spec
            .objectives
            .iter()
            .map(|objective| format!("Explain how this chapter addresses: {objective}"))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
