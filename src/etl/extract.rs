/// Extract Module
///
/// Fetches raw P-Chain containers from the node's index API in bounded
/// batches and stores each one at its sequence index.
use crate::etl::load;
use crate::models::Container;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::time::{Duration, Instant};

/// Largest range the index API serves in one call
pub const MAX_BATCH_SIZE: u64 = 1024;

/// Source of indexed containers
#[async_trait]
pub trait ContainerSource: Send + Sync {
    /// Containers `[start, start + count)`; may return fewer at the end of the index
    async fn get_container_range(&self, start: u64, count: u64) -> Result<Vec<Container>>;
}

/// One remote call worth of indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub start: u64,
    pub len: u64,
}

/// Statistics for a fetch run
#[derive(Debug, Clone, Default)]
pub struct FetchStats {
    pub batches: u64,
    pub containers_received: u64,
    pub blocks_stored: u64,
    pub failed_writes: u64,
    pub elapsed_time: Duration,
}

impl FetchStats {
    pub fn blocks_per_second(&self) -> f64 {
        let secs = self.elapsed_time.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.blocks_stored as f64 / secs
        }
    }
}

/// Split `[start, start + count)` into consecutive batches of at most `batch_size`
pub fn plan_batches(start: u64, count: u64, batch_size: u64) -> Vec<Batch> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(count.div_ceil(batch_size) as usize);

    let mut offset = 0;
    while offset < count {
        let len = batch_size.min(count - offset);
        batches.push(Batch { start: start + offset, len });
        offset += len;
    }

    batches
}

/// Fetch `count` containers starting at `start` and store their bytes
///
/// A failed remote call aborts the run. A failed store write is logged and
/// the container skipped.
pub async fn fetch_blocks<S: ContainerSource + ?Sized>(
    source: &S,
    pool: &SqlitePool,
    start: u64,
    count: u64,
    batch_size: u64,
) -> Result<FetchStats> {
    let start_time = Instant::now();
    let mut stats = FetchStats::default();

    let batches = plan_batches(start, count, batch_size);
    tracing::info!(
        "Fetching {} blocks from index {} in {} batches of up to {}",
        format_number(count),
        format_number(start),
        batches.len(),
        batch_size
    );

    for batch in batches {
        let containers = source
            .get_container_range(batch.start, batch.len)
            .await
            .with_context(|| format!("Failed to fetch containers {}..{}", batch.start, batch.start + batch.len))?;

        stats.batches += 1;
        stats.containers_received += containers.len() as u64;

        if (containers.len() as u64) < batch.len {
            tracing::info!("Index returned {} of {} containers from {}", containers.len(), batch.len, batch.start);
        }

        for (offset, container) in containers.iter().take(batch.len as usize).enumerate() {
            let idx = batch.start + offset as u64;
            if container.index != idx {
                tracing::debug!("Container {} reported index {}, storing at {}", container.id, container.index, idx);
            }

            match load::insert_raw_block(pool, idx, &container.bytes).await {
                Ok(()) => stats.blocks_stored += 1,
                Err(e) => {
                    tracing::error!("Failed to store block {}: {:#}", idx, e);
                    stats.failed_writes += 1;
                }
            }
        }

        let last_time = containers.iter().take(batch.len as usize).last().and_then(|c| c.timestamp);
        tracing::info!(
            "Stored batch {}..{} ({} total, last accepted {})",
            batch.start,
            batch.start + batch.len,
            format_number(stats.blocks_stored),
            last_time.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
        );
    }

    stats.elapsed_time = start_time.elapsed();
    Ok(stats)
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
