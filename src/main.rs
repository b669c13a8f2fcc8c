mod cli;
mod config;
mod engine;
mod error;
mod insights;
mod models;
mod timestamp;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting SprintLens - Sprint Metrics Engine");
    cli.execute().await?;

    Ok(())
}
