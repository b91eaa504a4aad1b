/// Pipeline Module
///
/// Drives the process pass: raw block → decode → extract → store, one index
/// at a time, skipping indices that are already processed.
use crate::codec::canonical::NetworkContext;
use crate::db::Database;
use crate::etl::decode::decode_block;
use crate::etl::extract::format_number;
use crate::etl::load;
use crate::etl::signer::SignerRecovery;
use crate::etl::transform::{extract_transactions, ExtractStats};
use anyhow::{Context, Result};
use std::time::{Duration, Instant};

/// Log a progress line every this many indices
const PROGRESS_INTERVAL: u64 = 1000;

/// Process pass statistics
#[derive(Debug, Clone, Default)]
pub struct ProcessStats {
    pub indices_seen: u64,
    pub indices_skipped: u64,
    pub indices_processed: u64,
    pub transactions_written: u64,
    pub extract: ExtractStats,
    pub elapsed_time: Duration,
}

impl ProcessStats {
    pub fn blocks_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.indices_processed as f64 / secs
        }
    }
}

/// Turns stored raw blocks into transaction rows
pub struct Processor {
    database: Database,
    network: NetworkContext,
    recovery: SignerRecovery,
}

impl Processor {
    pub fn new(database: Database, network: NetworkContext) -> Self {
        let recovery = SignerRecovery::new(network.hrp.clone());
        Self { database, network, recovery }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Process `[start, start + count)` in increasing order
    ///
    /// Any fatal error (missing raw block, undecodable block, failed write)
    /// stops the run; indices committed before it stay committed.
    pub async fn run(&self, start: u64, count: u64) -> Result<ProcessStats> {
        let start_time = Instant::now();
        let mut stats = ProcessStats::default();

        tracing::info!(
            "Processing {} indices from {} on {}",
            format_number(count),
            format_number(start),
            self.network.name
        );

        for idx in start..start.saturating_add(count) {
            stats.indices_seen += 1;
            if stats.indices_seen % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: index {} | {} processed | {} skipped | {} txs",
                    format_number(idx),
                    format_number(stats.indices_processed),
                    format_number(stats.indices_skipped),
                    format_number(stats.transactions_written)
                );
            }

            if self.database.is_processed(idx).await? {
                tracing::trace!("Index {} already processed, skipping", idx);
                stats.indices_skipped += 1;
                continue;
            }

            stats.transactions_written += self.process_index(idx, &mut stats.extract).await? as u64;
            stats.indices_processed += 1;
        }

        stats.elapsed_time = start_time.elapsed();
        Ok(stats)
    }

    async fn process_index(&self, idx: u64, extract_stats: &mut ExtractStats) -> Result<usize> {
        let raw = self
            .database
            .get_raw_block(idx)
            .await?
            .with_context(|| format!("Raw block {} has not been fetched", idx))?;

        let decoded =
            decode_block(&self.network, &raw.bytes).with_context(|| format!("Failed to decode block at index {}", idx))?;

        tracing::trace!("Index {}: {}", raw.idx, decoded.canonical);

        let records = extract_transactions(idx, &decoded, &self.recovery, extract_stats);
        let inserted = load::insert_block_transactions(self.database.pool(), idx, &records).await?;

        tracing::debug!(
            "Index {} {} {} height {} ({:?}): {} txs",
            idx,
            decoded.block.kind.name(),
            decoded.block.id,
            decoded.block.height,
            decoded.envelope,
            inserted
        );
        Ok(inserted)
    }
}
