//! webacquire CLI: fetch web pages and PDFs as structured JSON records.
//!
//! Picks a fetch strategy per URL (plain HTTP, headless Chrome, or PDF text
//! extraction), retries with backoff, and prints the resulting records.

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
