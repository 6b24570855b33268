//! `notia-server`: HTTP API, background mailbox poller and one-shot CLI
//! commands for the Notia email triage assistant.

mod error;
mod handlers;
mod poller;
mod router;
mod state;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use notia::config::{default_config_path, load_config, write_config};
use notia::{Config, NotiaService};

use state::AppState;

#[derive(Parser)]
#[command(name = "notia-server", about = "Notia email triage assistant", version)]
struct Cli {
    /// Config file path (default: $NOTIA_CONFIG or ~/.notia/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and poll the mailbox (default).
    Serve,

    /// Run one ingestion batch and print the summary as JSON.
    Ingest,

    /// Write a default config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path().context("cannot determine config path")?,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(read_config(&config_path)?).await,
        Commands::Ingest => ingest(read_config(&config_path)?).await,
        Commands::InitConfig { force } => init_config(&config_path, force),
    }
}

/// Loads the config file, or the defaults when none exists yet.
fn read_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            "No config file at {}, using defaults (run `notia-server init-config` to create one)",
            path.display()
        );
        return Ok(Config::default());
    }
    let config =
        load_config(path).with_context(|| format!("loading config from {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(NotiaService::from_config(config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = poller::spawn(state.clone(), shutdown_rx);
    if poller.is_none() {
        info!("Mailbox poller idle; use POST /api/process-emails once a mailbox is configured");
    }

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Notia API listening on http://{}", addr);

    axum::serve(listener, router::build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl-c");
            }
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = poller {
        if let Err(e) = handle.await {
            warn!(error = %e, "Poller task ended abnormally");
        }
    }
    Ok(())
}

async fn ingest(config: Config) -> anyhow::Result<()> {
    let service = NotiaService::from_config(config)?;
    let summary = service.trigger_ingestion().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    write_config(path, &Config::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
