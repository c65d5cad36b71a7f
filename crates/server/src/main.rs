use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ripline_core::{
    load_config, probe_tool, validate_config, HttpPublisher, JobOrchestrator, ProcessRunner,
    Publisher, TokioProcessRunner, ToolStatus,
};
use ripline_server::api::create_router;
use ripline_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("RIPLINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Output directory: {:?}", config.storage.output_dir);

    tokio::fs::create_dir_all(&config.storage.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {:?}",
                config.storage.output_dir
            )
        })?;

    let runner: Arc<dyn ProcessRunner> = Arc::new(TokioProcessRunner::new());

    // Missing tools are not fatal: the API stays up and jobs fail with launch errors
    let (acquirer_probe, ffmpeg_probe) = tokio::join!(
        probe_tool(runner.as_ref(), &config.acquirer.binary_path, &["--version"]),
        probe_tool(runner.as_ref(), &config.converter.ffmpeg_path, &["-version"]),
    );
    for (name, probe) in [("acquirer", &acquirer_probe), ("ffmpeg", &ffmpeg_probe)] {
        if probe.status == ToolStatus::Available {
            info!(tool = name, version = ?probe.version, "Tool available");
        } else {
            warn!(tool = name, status = ?probe.status, "Tool not usable");
        }
    }

    // Create publisher if configured
    let publisher: Option<Arc<dyn Publisher>> = match &config.publisher {
        Some(publisher_config) => {
            info!("Publisher upload URL: {}", publisher_config.upload_url);
            let publisher: Arc<dyn Publisher> = Arc::new(
                HttpPublisher::new(publisher_config.clone())
                    .context("Failed to create publisher")?,
            );
            Some(publisher)
        }
        None => {
            info!("No publisher configured, artifacts stay local");
            None
        }
    };

    let orchestrator = Arc::new(JobOrchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&runner),
        publisher,
        config.acquirer.clone(),
        config.converter.clone(),
        config.storage.output_dir.clone(),
    ));
    info!(
        max_concurrent_jobs = config.orchestrator.max_concurrent_jobs,
        "Orchestrator ready"
    );

    let addr = SocketAddr::new(config.server.host, config.server.port);

    // Create app state
    let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator), runner));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting ripline {} on {}", VERSION, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Stopping orchestrator...");
    orchestrator.shutdown().await;
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
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
