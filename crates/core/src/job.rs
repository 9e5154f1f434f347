//! Generation job state machine and phase progress model.
//!
//! Mirrors the platform convention: a small enum state machine with
//! `valid_transitions` / `can_transition` / `validate_transition`
//! helpers, used by the engine's job store as the single source of
//! truth for allowed transitions.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Job states
// ---------------------------------------------------------------------------

/// Lifecycle state of one generation job.
///
/// `Completed`, `Failed`, and `Cancelled` are terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Human-readable name for error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use super::JobState;

    /// Returns the set of valid target states reachable from `from`.
    ///
    /// Terminal states return an empty slice because no further
    /// transitions are allowed.
    pub fn valid_transitions(from: JobState) -> &'static [JobState] {
        match from {
            JobState::Pending => &[JobState::Running, JobState::Cancelled],
            JobState::Running => &[JobState::Completed, JobState::Failed, JobState::Cancelled],
            JobState::Completed | JobState::Failed | JobState::Cancelled => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: JobState, to: JobState) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for
    /// invalid ones.
    pub fn validate_transition(from: JobState, to: JobState) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid transition: {} -> {}",
                from.name(),
                to.name()
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Execution phase of a running job.
///
/// Phases advance strictly in declaration order; each owns a band of
/// the progress percentage so progress stays monotonic across phase
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Structure,
    Content,
    Assessment,
    Validation,
}

impl JobPhase {
    /// Inclusive progress band `(start, end)` owned by this phase.
    ///
    /// Validation ends at 99; exactly 100 is reserved for the
    /// `Completed` transition.
    pub fn progress_band(self) -> (u8, u8) {
        match self {
            Self::Structure => (0, 10),
            Self::Content => (10, 70),
            Self::Assessment => (70, 85),
            Self::Validation => (85, 99),
        }
    }

    /// The phase following this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Structure => Some(Self::Content),
            Self::Content => Some(Self::Assessment),
            Self::Assessment => Some(Self::Validation),
            Self::Validation => None,
        }
    }

    /// Human-readable name for status payloads.
    pub fn name(self) -> &'static str {
        match self {
            Self::Structure => "Structure",
            Self::Content => "Content",
            Self::Assessment => "Assessment",
            Self::Validation => "Validation",
        }
    }
}

/// Map a completion fraction within a phase to an absolute progress
/// percentage inside that phase's band.
pub fn phase_progress(phase: JobPhase, fraction: f64) -> u8 {
    let (start, end) = phase.progress_band();
    let f = fraction.clamp(0.0, 1.0);
    (start as f64 + f * (end - start) as f64).round() as u8
}

/// Clamp a proposed progress value so it never moves backwards.
///
/// Progress must be monotonic non-decreasing while a job is Running;
/// a late or out-of-order update can only hold, never regress.
pub fn monotonic_progress(current: u8, proposed: u8) -> u8 {
    proposed.max(current).min(100)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
