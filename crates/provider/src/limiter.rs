//! Sliding-window rate limiting for provider calls.
//!
//! Each provider gets its own limiter; acquiring a slot waits until
//! fewer than the configured number of calls happened inside the
//! window. Timestamps are [`tokio::time::Instant`]s so the limiter
//! cooperates with paused test clocks.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window limiter: at most `max_calls` within any `window`.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing `max_per_minute` calls per 60-second window.
    /// A zero limit is clamped to 1 so acquisition can always make
    /// progress.
    pub fn per_minute(max_per_minute: u32) -> Self {
        Self::new(max_per_minute.max(1) as usize, Duration::from_secs(60))
    }

    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a call slot is available, then claim it.
    ///
    /// Slots are claimed in arrival order under contention only as far
    /// as the mutex provides; strict FIFO fairness is not guaranteed.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();
                while stamps
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    stamps.pop_front();
                }
                if stamps.len() < self.max_calls {
                    stamps.push_back(now);
                    return;
                }
                // Window is full. Sleep until the oldest call ages out.
                match stamps.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Calls currently counted inside the window.
    pub async fn in_window(&self) -> usize {
        let mut stamps = self.timestamps.lock().await;
        let now = Instant::now();
        while stamps
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            stamps.pop_front();
        }
        stamps.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
