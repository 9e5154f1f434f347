//! Engine configuration loaded from environment variables.

use std::time::Duration;

/// Engine configuration.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Jobs generated concurrently (default: `2`).
    pub worker_concurrency: usize,
    /// Concurrent chapter generations per job (default: `4`).
    pub chapter_concurrency: usize,
    /// Per-provider-call deadline in seconds (default: `120`).
    pub call_timeout_secs: u64,
    /// Whole-job deadline in seconds (default: `1800`).
    pub job_timeout_secs: u64,
    /// Automatic retries per job after a failed attempt (default: `3`).
    pub max_job_retries: u32,
    /// Rate limit applied to each provider (default: `60`).
    pub provider_calls_per_minute: u32,
    /// Event bus buffer size (default: `256`).
    pub event_capacity: usize,
    /// Seconds a terminal job record is kept before it is pruned
    /// (default: `3600`). Records are also archived when their result
    /// is retrieved.
    pub result_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: 2,
            chapter_concurrency: 4,
            call_timeout_secs: 120,
            job_timeout_secs: 1800,
            max_job_retries: 3,
            provider_calls_per_minute: 60,
            event_capacity: 256,
            result_ttl_secs: 3600,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `WORKER_CONCURRENCY`         | `2`     |
    /// | `CHAPTER_CONCURRENCY`        | `4`     |
    /// | `CALL_TIMEOUT_SECS`          | `120`   |
    /// | `JOB_TIMEOUT_SECS`           | `1800`  |
    /// | `MAX_JOB_RETRIES`            | `3`     |
    /// | `PROVIDER_CALLS_PER_MINUTE`  | `60`    |
    /// | `EVENT_CAPACITY`             | `256`   |
    /// | `RESULT_TTL_SECS`            | `3600`  |
    pub fn from_env() -> Self {
        let worker_concurrency: usize = std::env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "2".into())
            .parse()
            .expect("WORKER_CONCURRENCY must be a valid usize");

        let chapter_concurrency: usize = std::env::var("CHAPTER_CONCURRENCY")
            .unwrap_or_else(|_| "4".into())
            .parse()
            .expect("CHAPTER_CONCURRENCY must be a valid usize");

        let call_timeout_secs: u64 = std::env::var("CALL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("CALL_TIMEOUT_SECS must be a valid u64");

        let job_timeout_secs: u64 = std::env::var("JOB_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".into())
            .parse()
            .expect("JOB_TIMEOUT_SECS must be a valid u64");

        let max_job_retries: u32 = std::env::var("MAX_JOB_RETRIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("MAX_JOB_RETRIES must be a valid u32");

        let provider_calls_per_minute: u32 = std::env::var("PROVIDER_CALLS_PER_MINUTE")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("PROVIDER_CALLS_PER_MINUTE must be a valid u32");

        let event_capacity: usize = std::env::var("EVENT_CAPACITY")
            .unwrap_or_else(|_| "256".into())
            .parse()
            .expect("EVENT_CAPACITY must be a valid usize");

        let result_ttl_secs: u64 = std::env::var("RESULT_TTL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("RESULT_TTL_SECS must be a valid u64");

        Self {
            worker_concurrency,
            chapter_concurrency,
            call_timeout_secs,
            job_timeout_secs,
            max_job_retries,
            provider_calls_per_minute,
            event_capacity,
            result_ttl_secs,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}
