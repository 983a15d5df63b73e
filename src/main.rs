use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod app;
mod assets;
mod cli;
mod config;
mod pagination;
mod sync;
mod tui;
mod utils;

use cli::Cli;

#[tokio::main]
async fn main() {
    // Set up panic hook for graceful error recovery
    std::panic::set_hook(Box::new(|panic_info| {
        tui::restore_terminal_on_panic();
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        std::process::exit(1);
    }));

    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    // Execute CLI command
    if let Err(e) = execute().await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. Output goes to `log_file` when given,
/// otherwise to stderr.
pub(crate) fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let default_filter = if debug { "salona=debug" } else { "salona=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

async fn execute() -> Result<()> {
    let cli = Cli::parse();
    cli.execute().await
}
