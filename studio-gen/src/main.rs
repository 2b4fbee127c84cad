//! studio-gen - Generation job microservice
//!
//! **Module Identity:**
//! - Name: studio-gen
//! - Port: 5780
//!
//! Drives third-party generation jobs for recorded sessions (summaries,
//! talking-avatar video) and merges results back into session storage.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use studio_common::config::{default_config_path, load_toml_config, resolve_root_folder};
use studio_common::events::EventBus;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_gen::config::{resolve_credential, Credential, GenerationConfig};
use studio_gen::services::{AnimationOrchestrator, GeminiClient, ReplicateClient, SummaryGenerator};
use studio_gen::AppState;

/// Command-line arguments for studio-gen
#[derive(Parser, Debug)]
#[command(name = "studio-gen")]
#[command(about = "Generation job microservice for session recordings")]
#[command(version)]
struct Args {
    /// Port to listen on (ignored when the TOML sets bind_address)
    #[arg(short, long, default_value = "5780", env = "STUDIO_GEN_PORT")]
    port: u16,

    /// Root folder holding studio.db
    #[arg(short, long, env = "STUDIO_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: <config dir>/studio/studio-gen.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path("studio-gen"));
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => Default::default(),
    };

    // Initialize tracing; RUST_LOG wins over the TOML level
    let default_filter = format!(
        "studio_gen={level},studio_common={level},tower_http=info",
        level = toml_config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting studio-gen (Generation Jobs) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    // Root folder: CLI/ENV (clap) → TOML → OS default
    let root_folder = resolve_root_folder(
        args.root_folder.as_deref(),
        "STUDIO_ROOT_FOLDER",
        &toml_config,
    );
    std::fs::create_dir_all(&root_folder)
        .with_context(|| format!("Failed to create root folder {}", root_folder.display()))?;

    let db_path = root_folder.join(studio_gen::db::DB_FILE_NAME);
    info!("Database: {}", db_path.display());
    let db_pool = studio_gen::db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database connection established");

    // Credentials: database → ENV → TOML; absence only disables the feature
    let replicate_token =
        resolve_credential(&db_pool, &toml_config, Credential::ReplicateApiToken).await?;
    let gemini_key = resolve_credential(&db_pool, &toml_config, Credential::GeminiApiKey).await?;

    let generation = GenerationConfig::from(&toml_config.generation);
    info!(
        poll_interval_secs = generation.poll.interval.as_secs(),
        max_poll_attempts = generation.poll.max_attempts,
        request_timeout_secs = generation.request_timeout.as_secs(),
        max_concurrent_items = generation.max_concurrent_items,
        "Generation settings loaded"
    );

    let event_bus = EventBus::new(100);
    let shutdown = CancellationToken::new();

    let job_client = ReplicateClient::new(replicate_token, generation.request_timeout)
        .context("Failed to build animation provider client")?;
    let completion_client = GeminiClient::new(gemini_key, generation.request_timeout)
        .context("Failed to build summary provider client")?;

    let orchestrator = Arc::new(AnimationOrchestrator::new(
        db_pool.clone(),
        Arc::new(job_client),
        &generation,
        event_bus.clone(),
        shutdown.clone(),
    ));
    let summary = Arc::new(SummaryGenerator::new(
        db_pool.clone(),
        Arc::new(completion_client),
        event_bus.clone(),
    ));

    if !orchestrator.is_configured() {
        warn!("Avatar animation disabled until a Replicate API token is configured");
    }
    if !summary.is_configured() {
        warn!("Summary generation disabled until a Gemini API key is configured");
    }

    let state = AppState::new(db_pool, event_bus, orchestrator, summary, shutdown.clone());
    let tasks = state.tasks.clone();
    let app = studio_gen::build_router(state);

    let addr: SocketAddr = match &toml_config.bind_address {
        Some(address) => address
            .parse()
            .with_context(|| format!("Invalid bind_address: {}", address))?,
        None => SocketAddr::from(([127, 0, 0, 1], args.port)),
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    // Batches see the cancelled token and finish with abandoned items; an
    // in-flight provider request can hold one for up to the request timeout.
    tasks.close();
    let drain_timeout = generation.request_timeout + Duration::from_secs(5);
    if !tasks.is_empty() {
        info!(batches = tasks.len(), "Waiting for animation batches to stop");
    }
    if tokio::time::timeout(drain_timeout, tasks.wait()).await.is_err() {
        warn!(
            batches = tasks.len(),
            "Animation batches still running at exit; their items are not recorded"
        );
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM, cancelling `shutdown` first
///
/// Cancelling stops in-flight poll loops (items become abandoned) and closes
/// SSE streams so the server can drain.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }

    shutdown.cancel();
}
