//! Job lifecycle events.
//!
//! Events are broadcast to any number of subscribers (status APIs,
//! log sinks, tests). Publishing never blocks and never fails; if no
//! subscriber is listening the event is dropped.

use serde::Serialize;
use tokio::sync::broadcast;

use coursegen_core::job::JobPhase;
use coursegen_core::types::{ChapterId, JobId};

// ---------------------------------------------------------------------------
// Message type constants
// ---------------------------------------------------------------------------

pub const MSG_TYPE_JOB_SUBMITTED: &str = "job_submitted";
pub const MSG_TYPE_JOB_STARTED: &str = "job_started";
pub const MSG_TYPE_PHASE_CHANGED: &str = "phase_changed";
pub const MSG_TYPE_JOB_PROGRESS: &str = "job_progress";
pub const MSG_TYPE_CHAPTER_COMPLETED: &str = "chapter_completed";
pub const MSG_TYPE_JOB_COMPLETED: &str = "job_completed";
pub const MSG_TYPE_JOB_FAILED: &str = "job_failed";
pub const MSG_TYPE_JOB_CANCELLED: &str = "job_cancelled";

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    JobSubmitted {
        job_id: JobId,
    },
    JobStarted {
        job_id: JobId,
    },
    PhaseChanged {
        job_id: JobId,
        phase: JobPhase,
    },
    JobProgress {
        job_id: JobId,
        progress: u8,
        eta_seconds: Option<u64>,
    },
    ChapterCompleted {
        job_id: JobId,
        chapter_id: ChapterId,
        sequence: u32,
        fallback: bool,
    },
    JobCompleted {
        job_id: JobId,
    },
    JobFailed {
        job_id: JobId,
        error: String,
    },
    JobCancelled {
        job_id: JobId,
    },
}

impl JobEvent {
    /// The wire `type` tag for this event.
    pub fn msg_type(&self) -> &'static str {
        match self {
            Self::JobSubmitted { .. } => MSG_TYPE_JOB_SUBMITTED,
            Self::JobStarted { .. } => MSG_TYPE_JOB_STARTED,
            Self::PhaseChanged { .. } => MSG_TYPE_PHASE_CHANGED,
            Self::JobProgress { .. } => MSG_TYPE_JOB_PROGRESS,
            Self::ChapterCompleted { .. } => MSG_TYPE_CHAPTER_COMPLETED,
            Self::JobCompleted { .. } => MSG_TYPE_JOB_COMPLETED,
            Self::JobFailed { .. } => MSG_TYPE_JOB_FAILED,
            Self::JobCancelled { .. } => MSG_TYPE_JOB_CANCELLED,
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            Self::JobSubmitted { job_id }
            | Self::JobStarted { job_id }
            | Self::PhaseChanged { job_id, .. }
            | Self::JobProgress { job_id, .. }
            | Self::ChapterCompleted { job_id, .. }
            | Self::JobCompleted { job_id }
            | Self::JobFailed { job_id, .. }
            | Self::JobCancelled { job_id } => *job_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A send error only means nobody is subscribed.
    pub fn publish(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_msg_type() {
        let event = JobEvent::JobFailed {
            job_id: uuid::Uuid::new_v4(),
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.msg_type());
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let job_id = uuid::Uuid::new_v4();
        bus.publish(JobEvent::JobSubmitted { job_id });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.job_id(), job_id);
        assert_eq!(event.msg_type(), MSG_TYPE_JOB_SUBMITTED);
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let bus = EventBus::new(8);
        bus.publish(JobEvent::JobStarted {
            job_id: uuid::Uuid::new_v4(),
        });
    }
}
