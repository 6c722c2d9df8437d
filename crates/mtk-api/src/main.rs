//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use mtk_dispatch::RuntimeContext;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mtk_api::{create_router, delegated, metrics, ApiConfig, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mtk=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> anyhow::Result<i32> {
    // Required for rustls 0.23+
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    info!("Starting mtk-api");

    let config = ApiConfig::from_env();
    let context = RuntimeContext::from_env();
    info!(
        host = %config.host,
        port = config.port,
        delegated = context.is_delegated(),
        remote_job = context.remote_job.as_ref().map(|j| j.name.as_str()),
        max_queue_length = context.max_queue_length,
        "Configuration loaded"
    );

    let delegated_request = context.delegated_request.clone();
    let (state, worker) = AppState::build(config.clone(), context)
        .await
        .context("Failed to create application state")?;

    if let Some(request) = delegated_request {
        // Delegated runs never touch the queue.
        drop(worker);
        return Ok(delegated::run(&state, &request).await);
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("Failed to install Prometheus recorder")?)
    } else {
        None
    };

    let worker = worker.spawn();
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // The router (and with it the dispatcher) is gone; the worker now drains
    // what was already accepted.
    info!("Server stopped, waiting for queued jobs");
    match tokio::time::timeout(config.shutdown_timeout, worker).await {
        Ok(Ok(())) => info!("Worker drained"),
        Ok(Err(e)) => warn!(error = %e, "Worker task failed"),
        Err(_) => warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Shutdown timeout reached with jobs still queued"
        ),
    }

    info!("Server shutdown complete");
    Ok(0)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}
