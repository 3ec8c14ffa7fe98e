//! cssmod: CSS Modules compiler and stylesheet bundler.

mod cli;
mod config;
mod orchestrator;
mod output;

use clap::Parser;
use cli::Args;
use miette::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let summary = orchestrator::run(args).await?;
    if summary.failed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Logs to stderr, filtered by `CSSMOD_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CSSMOD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
