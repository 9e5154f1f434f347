//! Provider failover routing.
//!
//! The router owns the configured providers in priority order. Every
//! operation acquires the provider's rate-limit slot, runs the call
//! under the configured timeout, and falls through to the next
//! provider on any failure. Only when every provider has failed does
//! the error surface to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use coursegen_core::content::GeneratedContent;
use coursegen_core::course::{ChapterSpec, CourseSpec, ProficiencyLevel};
use coursegen_core::quality::ValidationSignal;

use crate::adapter::ProviderAdapter;
use crate::error::ProviderError;
use crate::limiter::RateLimiter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Default per-call deadline.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Deadline applied to each individual provider call.
    pub call_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// One provider together with its rate limiter.
pub struct RoutedProvider {
    pub adapter: Arc<dyn ProviderAdapter>,
    pub limiter: Arc<RateLimiter>,
}

impl RoutedProvider {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, calls_per_minute: u32) -> Self {
        Self {
            adapter,
            limiter: Arc::new(RateLimiter::per_minute(calls_per_minute)),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

/// A successful result annotated with the provider that produced it.
#[derive(Debug)]
pub struct Routed<T> {
    pub value: T,
    pub provider: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("No providers configured")]
    NoProviders,

    /// Every provider in the chain failed; the last error is kept for
    /// diagnosis and backoff classification.
    #[error("All {attempts} provider(s) failed; last error: {last}")]
    AllProvidersFailed {
        attempts: usize,
        last: ProviderError,
    },
}

impl RouterError {
    /// Whether the final failure was quota exhaustion, which warrants
    /// an extended backoff instead of a normal retry.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::AllProvidersFailed { last, .. } if last.is_quota())
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct ProviderRouter {
    providers: Vec<RoutedProvider>,
    config: RouterConfig,
}

impl ProviderRouter {
    pub fn new(providers: Vec<RoutedProvider>, config: RouterConfig) -> Self {
        Self { providers, config }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Run one operation through the provider chain.
    ///
    /// Providers are tried in configured order. Each attempt waits for
    /// its rate-limit slot first so a failing provider cannot burn
    /// through another provider's quota.
    async fn execute<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<Routed<T>, RouterError>
    where
        F: Fn(Arc<dyn ProviderAdapter>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        if self.providers.is_empty() {
            return Err(RouterError::NoProviders);
        }

        let mut last = None;
        for routed in &self.providers {
            routed.limiter.acquire().await;
            let name = routed.adapter.name().to_string();

            let outcome =
                tokio::time::timeout(self.config.call_timeout, call(Arc::clone(&routed.adapter)))
                    .await;
            let error = match outcome {
                Ok(Ok(value)) => {
                    return Ok(Routed {
                        value,
                        provider: name,
                    })
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(self.config.call_timeout),
            };

            warn!(
                provider = %name,
                operation = operation,
                error = %error,
                "Provider call failed, falling through"
            );
            last = Some(error);
        }

        match last {
            Some(last) => Err(RouterError::AllProvidersFailed {
                attempts: self.providers.len(),
                last,
            }),
            None => Err(RouterError::NoProviders),
        }
    }

    // ---- operations ----

    pub async fn generate_structure(
        &self,
        spec: &CourseSpec,
    ) -> Result<Routed<Vec<ChapterSpec>>, RouterError> {
        self.execute("generate_structure", |adapter| {
            let spec = spec.clone();
            async move { adapter.generate_structure(&spec).await }
        })
        .await
    }

    pub async fn generate_content(
        &self,
        chapter: &ChapterSpec,
        level: ProficiencyLevel,
        prior_concepts: &[String],
    ) -> Result<Routed<GeneratedContent>, RouterError> {
        self.execute("generate_content", |adapter| {
            let chapter = chapter.clone();
            let prior = prior_concepts.to_vec();
            async move {
                adapter
                    .generate_chapter_content(&chapter, level, &prior)
                    .await
            }
        })
        .await
    }

    pub async fn validate_content(
        &self,
        content: &GeneratedContent,
        level: ProficiencyLevel,
        objectives: &[String],
        domain: &str,
    ) -> Result<Routed<ValidationSignal>, RouterError> {
        self.execute("validate_content", |adapter| {
            let content = content.clone();
            let objectives = objectives.to_vec();
            let domain = domain.to_string();
            async move {
                adapter
                    .validate_content(&content, level, &objectives, &domain)
                    .await
            }
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use assert_matches::assert_matches;

    fn spec() -> CourseSpec {
        CourseSpec {
            title: "Intro to Rust".to_string(),
            domain: "programming".to_string(),
            level: ProficiencyLevel::Beginner,
            duration_hours: 8.0,
            objectives: vec!["Write a CLI tool".to_string()],
            prerequisites: vec![],
        }
    }

    fn router_of(adapters: Vec<Arc<dyn ProviderAdapter>>) -> ProviderRouter {
        let providers = adapters
            .into_iter()
            .map(|a| RoutedProvider::new(a, 60))
            .collect();
        ProviderRouter::new(providers, RouterConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn first_healthy_provider_wins() {
        let router = router_of(vec![
            Arc::new(ScriptedProvider::new("primary")),
            Arc::new(ScriptedProvider::new("backup")),
        ]);
        let routed = router.generate_structure(&spec()).await.unwrap();
        assert_eq!(routed.provider, "primary");
        assert!(!routed.value.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_falls_through_to_backup() {
        let router = router_of(vec![
            Arc::new(ScriptedProvider::always_failing("primary")),
            Arc::new(ScriptedProvider::new("backup")),
        ]);
        let routed = router.generate_structure(&spec()).await.unwrap();
        assert_eq!(routed.provider, "backup");
    }

    #[tokio::test(start_paused = true)]
    async fn all_failures_surface_with_attempt_count() {
        let router = router_of(vec![
            Arc::new(ScriptedProvider::always_failing("primary")),
            Arc::new(ScriptedProvider::always_failing("backup")),
        ]);
        let err = router.generate_structure(&spec()).await.unwrap_err();
        assert_matches!(err, RouterError::AllProvidersFailed { attempts: 2, .. });
        assert!(!err.is_quota());
    }

    #[tokio::test(start_paused = true)]
    async fn quota_failure_is_classified() {
        let router = router_of(vec![Arc::new(ScriptedProvider::quota_exhausted("primary"))]);
        let err = router.generate_structure(&spec()).await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out_and_falls_through() {
        let providers = vec![
            RoutedProvider::new(Arc::new(ScriptedProvider::stalled("primary")), 60),
            RoutedProvider::new(Arc::new(ScriptedProvider::new("backup")), 60),
        ];
        let router = ProviderRouter::new(
            providers,
            RouterConfig {
                call_timeout: Duration::from_secs(5),
            },
        );
        let routed = router.generate_structure(&spec()).await.unwrap();
        assert_eq!(routed.provider, "backup");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_router_rejects() {
        let router = ProviderRouter::new(vec![], RouterConfig::default());
        assert_matches!(
            router.generate_structure(&spec()).await,
            Err(RouterError::NoProviders)
        );
    }
}
