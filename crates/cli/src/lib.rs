pub mod cli;
pub mod commands;
pub mod config;
mod notice;
pub mod render;
mod seeding;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub use config::AppConfig;
pub use notice::ConsoleNotifier;
pub use taskdeck_core as core;
pub use taskdeck_core::model;

use crate::cli::{Cli, CliCommand, ListArgs};
use crate::core::{HttpGateway, MemoryGateway, TaskGateway, TaskStore};

/// Logs go to stderr. `--log` wins over `RUST_LOG`; otherwise only warnings.
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    let env_filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter '{}'", directives))?,
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy(),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    Ok(())
}

/// Build the store for this invocation, load it, and run the requested command.
/// Returns `false` when the initial load or the command itself failed.
pub async fn run<W: Write>(cli: Cli, writer: W) -> Result<bool> {
    let gateway = build_gateway(&cli).await?;
    let store = TaskStore::new(gateway, Arc::new(ConsoleNotifier));

    if store.initialize().await.is_err() {
        return Ok(false);
    }

    let command = cli
        .command
        .unwrap_or_else(|| CliCommand::List(ListArgs::default()));
    commands::execute(&store, command, writer, Utc::now()).await
}

async fn build_gateway(cli: &Cli) -> Result<Arc<dyn TaskGateway>> {
    if cli.offline {
        let gateway = MemoryGateway::new();
        let seeded = seeding::seed_sample_tasks(&gateway, Utc::now()).await?;
        tracing::info!(seeded, "using in-process sample server");
        return Ok(Arc::new(gateway));
    }

    let config = config::from_cli(cli)?;
    tracing::info!(base_url = config.base_url(), timeout = ?config.timeout(), "using task API");
    let gateway = HttpGateway::new(&config)?;
    Ok(Arc::new(gateway))
}
