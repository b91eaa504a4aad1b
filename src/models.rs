/// Data Models Module
///
/// Rows persisted by the fetch and process passes, and the container shape
/// returned by the node's index API.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw block bytes stored at a sequence index
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RawBlockRecord {
    pub idx: i64,
    pub bytes: Vec<u8>,
}

/// One flattened P-Chain transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub idx: u64,
    pub tx_id: String,
    pub height: u64,
    pub block_id: String,
    pub type_id: u16,
    pub timestamp: i64,
    /// Canonical JSON of the unsigned transaction
    pub unsigned_tx: String,
    pub unsigned_bytes: String,
    pub sig_bytes: String,
    pub signer_addr_p: String,
    pub signer_addr_c: String,
}

/// Processed marker row
#[cfg(test)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessedMarker {
    pub idx: i64,
    pub tx_count: i64,
    pub processed_at: DateTime<Utc>,
}

/// A container returned by `index.getContainerRange`, bytes already decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub bytes: Vec<u8>,
    pub timestamp: Option<DateTime<Utc>>,
    pub index: u64,
}
