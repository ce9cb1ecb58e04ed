//! `daytask` server: day-scoped task tracker over HTTP.
//!
//! Serves the task API and the prebuilt front-end bundle, and keeps a
//! completion progress bar for the current day redrawn on the console.
//! Logs go to a file so they do not interleave with the bar.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080 with ./tasks.db and ./web/build
//! cargo run --bin daytask-server
//!
//! # Custom address and database
//! cargo run --bin daytask-server -- --bind 127.0.0.1:3000 --database ~/tasks.db
//!
//! # Or via environment variables
//! DAYTASK_ADDR=127.0.0.1:3000 DAYTASK_DB=/tmp/tasks.db cargo run --bin daytask-server
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use daytask_server::api::{self, AppState};
use daytask_server::config::{CliArgs, ServerConfig};
use daytask_server::display::{DisplayConfig, ProgressDisplay};
use daytask_store::TaskStore;
use daytask_store::day::{Clock, SystemClock};
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_logging(&config.log_level, cli.log_file.as_deref());

    tracing::info!(addr = %config.bind_addr, "starting daytask server");

    let store = match TaskStore::open(&config.database) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to open task store");
            eprintln!("Error opening {}: {e}", config.database.display());
            std::process::exit(1);
        }
    };

    // Day Context: read once here and handed to the display loop only.
    let display = ProgressDisplay::spawn(
        store.clone(),
        DisplayConfig {
            day: SystemClock.today(),
            interval: config.progress_interval,
        },
        std::io::stdout(),
    );

    let state = Arc::new(AppState::new(store, SystemClock));

    match api::start_server_with_shutdown(
        &config.bind_addr,
        state,
        &config.static_dir,
        shutdown_signal(),
    )
    .await
    {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "http server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "http server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start http server");
            eprintln!("Error binding {}: {e}", config.bind_addr);
            std::process::exit(1);
        }
    }

    display.shutdown().await;
    tracing::info!("daytask server exiting");
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since the progress bar redraws
/// the console). Returns a [`WorkerGuard`] that must be held until shutdown
/// to ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("daytask.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}
