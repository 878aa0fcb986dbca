mod cli;
mod error;
mod fetch;
mod model;
mod orchestrator;
mod render;
mod summary;
mod telemetry;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    telemetry::init_tracing(&args)?;

    // The local offset can only be read soundly while the process is single-threaded,
    // so resolve it before the runtime spawns its workers.
    let time = render::TimeFormat::local();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    runtime.block_on(cli::run(args, time))
}
