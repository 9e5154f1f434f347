//! Course generation worker.
//!
//! Loads provider credentials and engine settings from the
//! environment, starts the engine, and logs the job event stream until
//! a termination signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursegen_engine::persistence::InMemoryStore;
use coursegen_engine::{Engine, EngineConfig, JobEvent};
use coursegen_provider::http::{HttpProvider, HttpProviderConfig};
use coursegen_provider::router::{ProviderRouter, RoutedProvider, RouterConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursegen_worker=debug,coursegen_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = EngineConfig::from_env();
    tracing::info!(
        worker_concurrency = config.worker_concurrency,
        chapter_concurrency = config.chapter_concurrency,
        "Loaded engine configuration"
    );

    // --- Providers ---
    let providers = providers_from_env(config.provider_calls_per_minute);
    if providers.is_empty() {
        panic!("PROVIDERS must name at least one configured provider");
    }
    let router = Arc::new(ProviderRouter::new(
        providers,
        RouterConfig {
            call_timeout: config.call_timeout(),
        },
    ));
    tracing::info!(count = router.provider_count(), "Provider chain configured");

    // --- Engine ---
    let engine = Engine::start(router, Arc::new(InMemoryStore::new()), config);
    tracing::info!("Engine started");

    // --- Event log ---
    let mut events = engine.subscribe();
    let event_log = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            log_event(&event);
        }
    });

    // --- Shutdown ---
    shutdown_signal().await;
    engine.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(5), event_log).await;
    tracing::info!("Graceful shutdown complete");
}

/// Build the provider chain from environment variables.
///
/// `PROVIDERS` is a comma-separated list of provider names in failover
/// priority order. Each name `NAME` is configured by `NAME_BASE_URL`,
/// `NAME_API_KEY`, and `NAME_MODEL` (name uppercased, dashes mapped to
/// underscores). One HTTP client is shared across providers for
/// connection pooling.
fn providers_from_env(calls_per_minute: u32) -> Vec<RoutedProvider> {
    let names = std::env::var("PROVIDERS").unwrap_or_default();
    let client = reqwest::Client::new();

    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let prefix = name.to_uppercase().replace('-', "_");
            let config = HttpProviderConfig {
                name: name.to_string(),
                base_url: require_env(&format!("{prefix}_BASE_URL")),
                api_key: require_env(&format!("{prefix}_API_KEY")),
                model: require_env(&format!("{prefix}_MODEL")),
            };
            tracing::info!(provider = name, model = %config.model, "Configured provider");
            RoutedProvider::new(
                Arc::new(HttpProvider::with_client(client.clone(), config)),
                calls_per_minute,
            )
        })
        .collect()
}

fn require_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

fn log_event(event: &JobEvent) {
    match event {
        JobEvent::JobProgress {
            job_id,
            progress,
            eta_seconds,
        } => tracing::debug!(job_id = %job_id, progress, eta_seconds, "progress"),
        JobEvent::JobFailed { job_id, error } => {
            tracing::warn!(job_id = %job_id, error = %error, "job failed")
        }
        other => tracing::info!(job_id = %other.job_id(), event = other.msg_type(), "event"),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the worker
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
