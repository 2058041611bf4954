//! DevLog - admin service for the offline and online PostgreSQL databases.

mod api;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use devlog_core::logging::init_logging_default;
use devlog_core::{load_config, DevlogState};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "devlog", version, about = "Browse, query and sync the offline and online databases")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service.
    Serve(ServeArgs),
    /// Print the effective configuration as JSON, connection strings redacted.
    PrintConfig(PrintConfigArgs),
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Optional TOML config file
    #[arg(long, env = "DEVLOG_CONFIG")]
    config: Option<PathBuf>,
    /// Listen address, overriding config and PORT
    #[arg(long)]
    bind: Option<String>,
}

#[derive(clap::Args, Debug)]
struct PrintConfigArgs {
    /// Optional TOML config file
    #[arg(long, env = "DEVLOG_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(args).await,
        Command::PrintConfig(args) => print_config(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let _log_guard = init_logging_default();

    let mut config = load_config(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    let bind = config.server.bind.clone();
    let state = Arc::new(DevlogState::initialize(config));
    let reaper = state.spawn_idle_reaper();

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind listener on {bind}"))?;
    let local_addr = listener.local_addr().context("failed to read listener address")?;

    info!(bind = %local_addr, "devlog listening");
    state.logs().info(format!("DevLog server started, listening on {local_addr}"));

    let served = axum::serve(listener, api::router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await
        .context("server exited unexpectedly");

    state.shutdown();
    if let Err(e) = reaper.await {
        warn!(error = %e, "idle reaper task failed");
    }
    info!("devlog stopped");
    served
}

fn print_config(args: PrintConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref()).context("failed to load configuration")?;
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal(state: Arc<DevlogState>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        state.logs().info("received SIGINT, shutting down gracefully");
                    }
                    _ = sigterm.recv() => {
                        state.logs().info("received SIGTERM, shutting down gracefully");
                    }
                }
            }
            Err(e) => {
                warn!("failed to register SIGTERM handler: {e}, falling back to SIGINT only");
                let _ = ctrl_c.await;
                state.logs().info("received SIGINT, shutting down gracefully");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        state.logs().info("received SIGINT, shutting down gracefully");
    }
}
