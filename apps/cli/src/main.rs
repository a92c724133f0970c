//! bundlepush entry point.

mod args;

use bundlepush_engine::Orchestrator;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured diagnostics; user-facing status goes to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = args::Args::parse().into_run_config()?;
    Orchestrator::new(config).run().await?;
    Ok(())
}
