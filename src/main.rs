use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = taskdeck::cli::Cli::parse();
    taskdeck::init_tracing(cli.log_filter.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let stdout = std::io::stdout();
    let handle = stdout.lock();
    let succeeded = runtime.block_on(taskdeck::run(cli, handle))?;

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
