/// CLI Module
///
/// Command-line interface configuration using clap. Every global option can
/// also come from the environment (or a `.env` file).
use crate::codec::canonical::NetworkContext;
use crate::etl::extract::MAX_BATCH_SIZE;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Avalanche P-Chain slurper
///
/// Fetch raw P-Chain blocks from a node's index API into SQLite, then decode
/// them into one row per transaction with the recovered signer.
#[derive(Parser, Debug)]
#[command(name = "slurp")]
#[command(author, version = crate::version::VERSION, about, long_about = None)]
pub struct Cli {
    /// Base URL of the node serving the index API
    #[arg(long, global = true, env = "SLURP_NODE_URL", value_name = "URL", default_value = "http://localhost:9650")]
    pub node_url: String,

    /// SQLite database file
    #[arg(long, global = true, env = "SLURP_DB", value_name = "PATH", default_value = "slurp.db")]
    pub db: PathBuf,

    /// Containers requested per index API call
    #[arg(long, global = true, env = "SLURP_BATCH", value_name = "SIZE", default_value = "1000")]
    pub batch: u64,

    /// Network the blocks belong to
    #[arg(long, global = true, value_enum, default_value = "mainnet")]
    pub network: Network,

    /// HTTP timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS", default_value = "30")]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch raw P-Chain blocks into the database
    #[command(name = "pchain")]
    FetchP {
        /// First index to fetch
        #[arg(long, value_name = "IDX", default_value = "0")]
        start_idx: u64,

        /// Number of blocks to fetch
        #[arg(value_name = "NUM_TO_FETCH")]
        num_to_fetch: u64,
    },

    /// Decode fetched P-Chain blocks into transaction rows
    #[command(name = "process-p")]
    ProcessP {
        /// First index to process
        #[arg(long, value_name = "IDX", default_value = "0")]
        start_idx: u64,

        /// Number of blocks to process
        #[arg(value_name = "NUM_TO_PROCESS")]
        num_to_process: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Fuji,
}

impl Network {
    pub fn context(&self) -> NetworkContext {
        match self {
            Network::Mainnet => NetworkContext::mainnet(),
            Network::Fuji => NetworkContext::fuji(),
        }
    }
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch == 0 || self.batch > MAX_BATCH_SIZE {
            anyhow::bail!("Batch size must be between 1 and {} (got {})", MAX_BATCH_SIZE, self.batch);
        }

        if self.timeout == 0 {
            anyhow::bail!("Timeout must be greater than 0");
        }

        let (start_idx, count) = match &self.command {
            Command::FetchP { start_idx, num_to_fetch } => (*start_idx, *num_to_fetch),
            Command::ProcessP { start_idx, num_to_process } => (*start_idx, *num_to_process),
        };
        if start_idx.checked_add(count).is_none() {
            anyhow::bail!("Index range {} + {} overflows", start_idx, count);
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
