/// Avalanche P-Chain Slurper
///
/// Two passes over the P-Chain block index:
/// - `pchain` fetches raw blocks from a node into SQLite
/// - `process-p` decodes stored blocks into one row per transaction
mod cli;
mod codec;
mod db;
mod etl;
mod models;
mod pipeline;
mod rpc;
mod version;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use db::Database;
use etl::extract::format_number;
use pipeline::Processor;
use rpc::IndexClient;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    version::install_panic_hook();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    cli.validate()?;

    let database = Database::new(&cli.db).await?;
    database.test_connection().await?;
    database.migrate().await?;

    match cli.command {
        Command::FetchP { start_idx, num_to_fetch } => {
            let client = IndexClient::new(&cli.node_url, cli.timeout()).context("Failed to create index client")?;
            tracing::info!("Fetching P-Chain blocks from {}", client.endpoint());

            let stats = etl::extract::fetch_blocks(&client, database.pool(), start_idx, num_to_fetch, cli.batch)
                .await
                .context("Fetch failed")?;

            tracing::info!(
                "Fetch complete: {} batches | {} received | {} stored | {} failed writes | {:.2}s ({:.0} blocks/sec)",
                stats.batches,
                format_number(stats.containers_received),
                format_number(stats.blocks_stored),
                stats.failed_writes,
                stats.elapsed_time.as_secs_f64(),
                stats.blocks_per_second()
            );
            tracing::info!("Database holds {} raw blocks", format_number(database.count_raw_blocks().await? as u64));
        }
        Command::ProcessP { start_idx, num_to_process } => {
            let processor = Processor::new(database, cli.network.context());

            let stats = processor.run(start_idx, num_to_process).await.context("Process failed")?;

            tracing::info!(
                "Process complete: {} seen | {} processed | {} skipped | {} txs written | {:.2}s ({:.0} blocks/sec)",
                format_number(stats.indices_seen),
                format_number(stats.indices_processed),
                format_number(stats.indices_skipped),
                format_number(stats.transactions_written),
                stats.elapsed_time.as_secs_f64(),
                stats.blocks_per_second()
            );
            if stats.extract != Default::default() {
                tracing::warn!(
                    "Data quality: {} encode skips | {} recovery failures | {} credentials without signatures",
                    stats.extract.encode_failures,
                    stats.extract.recovery_failures,
                    stats.extract.missing_signatures
                );
            }
            tracing::info!(
                "Database holds {} transactions",
                format_number(processor.database().count_transactions().await? as u64)
            );
        }
    }

    Ok(())
}
