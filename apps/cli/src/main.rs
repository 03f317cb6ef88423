//! masterlist CLI: local trigger and read-back surface for roster ingestion.
//!
//! Uploads class masterlist PDFs into a bucket, dispatches the resulting
//! storage events through the ingestion pipeline, and reads the parsed
//! student collections back.

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
