/// Transform Module
///
/// Flattens a decoded block into transaction rows. Per-transaction problems
/// (hex encoding, signer recovery) are logged and tolerated; they never abort
/// the block.
use super::decode::{DecodedBlock, DecodedTx};
use super::signer::SignerRecovery;
use crate::codec::formatting::encode_hex_checksum;
use crate::codec::txs::parse_type_id;
use crate::models::TransactionRecord;

/// Counters for data-quality problems seen while extracting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub encode_failures: usize,
    pub recovery_failures: usize,
    pub missing_signatures: usize,
}

/// Extract one record per transaction of a decoded block
pub fn extract_transactions(
    idx: u64,
    decoded: &DecodedBlock,
    recovery: &SignerRecovery,
    stats: &mut ExtractStats,
) -> Vec<TransactionRecord> {
    let mut records = Vec::with_capacity(decoded.tx_count());

    for pair in decoded.transactions() {
        if let Some(record) = extract_transaction(idx, decoded, &pair, recovery, stats) {
            records.push(record);
        }
    }

    records
}

fn extract_transaction(
    idx: u64,
    decoded: &DecodedBlock,
    pair: &DecodedTx<'_>,
    recovery: &SignerRecovery,
    stats: &mut ExtractStats,
) -> Option<TransactionRecord> {
    let tx = pair.tx;
    let tx_id = tx.id.to_string();
    tracing::trace!("idx: {} txid: {} {} (type {})", idx, tx_id, tx.unsigned.name(), tx.unsigned.type_id());

    let unsigned_doc = &pair.document["unsignedTx"];
    let unsigned_tx = unsigned_doc.to_string();
    let timestamp = unsigned_doc.get("time").and_then(|t| t.as_i64()).unwrap_or(0);

    let unsigned_bytes = match encode_hex_checksum(tx.unsigned_bytes()) {
        Ok(hex) => hex,
        Err(e) => {
            tracing::warn!("Unable to encode unsigned bytes idx: {} txid: {} err: {}", idx, tx_id, e);
            stats.encode_failures += 1;
            return None;
        }
    };

    let mut sig_bytes = String::new();
    let mut signer_addr_p = String::new();
    let mut signer_addr_c = String::new();

    if !tx.credentials.is_empty() {
        match tx.first_signature() {
            Some(sig) => {
                sig_bytes = encode_hex_checksum(sig.as_bytes()).unwrap_or_default();
                match recovery.recover_addresses(tx.unsigned_bytes(), sig) {
                    Ok(addresses) => {
                        signer_addr_p = addresses.p_chain;
                        signer_addr_c = addresses.c_chain;
                    }
                    Err(e) => {
                        tracing::warn!("Unable to recover signer idx: {} txid: {} err: {}", idx, tx_id, e);
                        stats.recovery_failures += 1;
                    }
                }
            }
            None => {
                tracing::warn!("First credential has no signatures idx: {} txid: {}", idx, tx_id);
                stats.missing_signatures += 1;
            }
        }
    }

    Some(TransactionRecord {
        idx,
        tx_id,
        height: decoded.block.height,
        block_id: decoded.block.id.to_string(),
        type_id: parse_type_id(tx.bytes()).unwrap_or_default(),
        timestamp,
        unsigned_tx,
        unsigned_bytes,
        sig_bytes,
        signer_addr_p,
        signer_addr_c,
    })
}
