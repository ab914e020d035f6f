//! Resilient Calc - percentage calculation service
//!
//! Binary entry point: loads configuration, wires the pipeline and serves HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resilient_calc::audit::{HistoryLogger, InMemoryHistory};
use resilient_calc::{create_router, spawn_cleanup_task, spawn_history_writer, AppState, Config};

const HISTORY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Main entry point for the calculation service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Wire the percentage pipeline, rate limiter and history
/// 4. Start background TTL cleanup and history writer tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilient_calc=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resilient Calc service");

    let config = Config::from_env();
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid configuration")?;
    info!(
        port = config.server.port,
        failure_rate = config.source.failure_rate,
        delay_ms = config.source.delay.as_millis() as u64,
        retry_attempts = config.retry.max_attempts,
        breaker_threshold = config.breaker.failure_rate_threshold,
        breaker_window = config.breaker.sliding_window_size,
        cache_ttl_secs = config.cache.ttl.as_secs(),
        rate_limit_capacity = config.rate_limit.capacity,
        history_max_records = config.history.max_records,
        "Configuration loaded"
    );

    let history = Arc::new(InMemoryHistory::with_max_records(
        config.history.max_records,
    ));
    let (history_logger, history_rx) = HistoryLogger::channel();
    let state = AppState::from_config(&config, history.clone(), history_logger);

    let cleanup_handle = spawn_cleanup_task(state.cache.clone(), config.server.cleanup_interval);
    let writer_handle = spawn_history_writer(history_rx, history);
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    // The router held the last history sender; give the writer a moment to
    // drain what is left.
    match tokio::time::timeout(HISTORY_DRAIN_TIMEOUT, writer_handle).await {
        Ok(Ok(())) => info!("History writer drained"),
        Ok(Err(err)) => warn!(error = %err, "History writer ended abnormally"),
        Err(_) => warn!("History writer did not drain in time"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the cleanup task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Cleanup task aborted");
}
