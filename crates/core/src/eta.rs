//! Remaining-time estimation for running jobs.
//!
//! The engine feeds per-chapter wall-clock durations into an
//! incremental mean and projects the remaining work across the
//! configured chapter concurrency.

use std::time::Duration;

/// Compute the incremental (online) mean after observing a new value.
///
/// Formula: `new_avg = old_avg + (new_value - old_avg) / new_count`
pub fn incremental_mean(old_avg: f64, new_value: f64, new_count: u32) -> f64 {
    old_avg + (new_value - old_avg) / new_count as f64
}

/// Project the remaining wall-clock time for a job.
///
/// Returns `None` until at least one chapter has completed (no samples
/// means no estimate, never a fabricated one). Concurrency of 0 is
/// treated as 1.
pub fn estimate_remaining(
    completed: u32,
    total: u32,
    avg_secs_per_chapter: f64,
    concurrency: u32,
) -> Option<Duration> {
    if completed == 0 || avg_secs_per_chapter <= 0.0 {
        return None;
    }
    let remaining = total.saturating_sub(completed);
    let effective = concurrency.max(1) as f64;
    let secs = remaining as f64 * avg_secs_per_chapter / effective;
    Some(Duration::from_secs_f64(secs))
}
