//! reclaim-sync - catalog/back-end reconciliation service
//!
//! `serve` exposes the HTTP API; `run` performs a single reconciliation and
//! prints a summary.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reclaim_common::config::{
    database_path, default_config_path, load_toml_config, resolve_root_folder, TomlConfig,
};
use reclaim_common::events::EventBus;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reclaim_sync::config::{build_sources, reconcile_options, DEFAULT_PORT};
use reclaim_sync::workflow::{ProgressRegistry, ReconcileOrchestrator};
use reclaim_sync::AppState;

/// Command-line arguments for reclaim-sync
#[derive(Parser, Debug)]
#[command(name = "reclaim-sync")]
#[command(about = "Reconciles the media catalog with Sonarr/Radarr and scores items for deletion")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config path)
    #[arg(short, long, env = "RECLAIM_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT, env = "RECLAIM_PORT")]
        port: u16,
    },
    /// Reconcile once and exit
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path(),
    };
    let loaded = config_path
        .as_ref()
        .map_err(|e| e.to_string())
        .and_then(|path| load_toml_config(path).map_err(|e| e.to_string()));

    let mut toml_config = loaded.clone().unwrap_or_default();
    toml_config.apply_env_overrides();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                let level = &toml_config.logging.level;
                format!("reclaim_sync={level},reclaim_common={level},tower_http=info").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reclaim-sync");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));
    match (&config_path, &loaded) {
        (Ok(path), Ok(_)) => info!("Loaded configuration from {}", path.display()),
        (_, Err(e)) => warn!("{}; using defaults", e),
        (Err(_), Ok(_)) => {}
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), Some(&toml_config));
    let db_path = database_path(&root_folder);
    info!("Database: {}", db_path.display());

    let db_pool = reclaim_sync::db::init_database_pool(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    let sources = build_sources(&toml_config).context("Failed to build upstream clients")?;
    if !sources.is_configured() {
        warn!("No enabled catalog and back-end pair configured; runs will be empty");
    }
    let options = reconcile_options(&toml_config);
    let event_bus = EventBus::new(100);

    match args.command.unwrap_or(Command::Serve { port: DEFAULT_PORT }) {
        Command::Serve { port } => {
            let state = AppState::new(db_pool, event_bus, sources, options);
            let app = reclaim_sync::build_router(state);

            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            info!("Listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server shutdown complete");
        }
        Command::Run => {
            let registry = ProgressRegistry::new().with_events(event_bus.clone());
            let handle = registry.register().await;
            let cancel = CancellationToken::new();

            let cancel_on_signal = cancel.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                warn!("Interrupt received; stopping after the current item");
                cancel_on_signal.cancel();
            });

            let orchestrator = ReconcileOrchestrator::new(db_pool, sources, event_bus, options);
            let report = orchestrator
                .run(handle, cancel)
                .await
                .context("Reconciliation run failed")?;

            println!("Run:       {}", report.run_id);
            println!("Processed: {}", report.items.len());
            println!("Matched:   {}", report.matched);
            println!("Unmatched: {}", report.unmatched);
            println!("Stored:    {}", report.stored);
            println!("Failed:    {}", report.failed);
            if report.cancelled {
                println!("Cancelled before completion");
            }
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
