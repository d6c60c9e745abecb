//! thirteenf CLI — 13F institutional-holdings ingestion.
//!
//! Resolves each fund's latest 13F filing, extracts its holdings table,
//! and emits one normalized dataset.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
