//! PhishGuard
//!
//! Serves a pretrained phishing URL classifier over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use phishguard_classifiers::{BertSequenceClassifier, PhishingScorer};
use phishguard_server::cli::Cli;
use phishguard_server::config::LogFormat;
use phishguard_server::{create_router, AppState, ServiceConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ServiceConfig::load(&cli.config, &cli)?;

    // Initialize tracing
    init_tracing(cli.verbose, config.logging.format);

    info!("Starting PhishGuard");
    info!("Model: {} ({})", config.model.name, config.model.source);
    info!("Device: {}", config.model.inference.device);

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    // Model loading blocks on downloads and weight mapping; a failure here
    // ends the process before the listener is bound.
    let spec = config.model.clone();
    let classifier = tokio::task::spawn_blocking(move || BertSequenceClassifier::load(&spec))
        .await
        .context("model loading task failed")?
        .context("failed to load classification model")?;
    info!("Model loaded with labels {:?}", classifier.labels());

    let scorer = PhishingScorer::new(config.scoring.clone())?;
    let state = AppState::new(Arc::new(classifier), scorer, metrics_handle);

    let addr = config.listen_addr()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("PhishGuard listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("phishguard=debug,phishguard_server=debug,phishguard_classifiers=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("phishguard=info,phishguard_server=info,phishguard_classifiers=info")
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "phishguard_requests_total",
        "Total number of classification requests by route"
    );
    metrics::describe_counter!("phishguard_errors_total", "Total number of errors by kind");
    metrics::describe_histogram!(
        "phishguard_inference_latency_us",
        metrics::Unit::Microseconds,
        "Classifier latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
