/// Decode Module
///
/// Turns raw stored bytes into a typed P-Chain block plus its canonical JSON.
/// Every transaction is paired with its own canonical document at decode time,
/// so the extractor never has to line up two separate lists.
use crate::codec::block::Block;
use crate::codec::canonical::{block_to_json, tx_to_json, NetworkContext};
use crate::codec::formatting::FormattingError;
use crate::codec::proposer::{Envelope, EnvelopeKind};
use crate::codec::txs::Tx;
use crate::codec::CodecError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("block parse error: {0}")]
    Block(#[from] CodecError),
    #[error("canonical rendering error: {0}")]
    Canonical(#[from] FormattingError),
    #[error("canonical serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A transaction and its canonical document
#[derive(Debug, Clone)]
pub struct DecodedTx<'a> {
    pub tx: &'a Tx,
    pub document: &'a Value,
}

#[derive(Debug, Clone)]
pub struct DecodedBlock {
    pub block: Block,
    pub envelope: EnvelopeKind,
    /// Canonical JSON text of the whole block
    pub canonical: String,
    /// Canonical documents of `block.txs()`, same order
    tx_documents: Vec<Value>,
}

impl DecodedBlock {
    /// Transactions in block order, each paired with its canonical document
    pub fn transactions(&self) -> impl Iterator<Item = DecodedTx<'_>> {
        self.block.txs().zip(self.tx_documents.iter()).map(|(tx, document)| DecodedTx { tx, document })
    }

    pub fn tx_count(&self) -> usize {
        self.tx_documents.len()
    }
}

/// Decode raw block bytes as stored by the fetcher
pub fn decode_block(ctx: &NetworkContext, raw: &[u8]) -> Result<DecodedBlock, DecodeError> {
    // Post-Banff blocks are wrapped by the proposer VM, earlier ones are bare
    let envelope = Envelope::parse(raw);
    let block = Block::parse(envelope.inner())?;

    let tx_documents = block.txs().map(|tx| tx_to_json(ctx, tx)).collect::<Result<Vec<_>, _>>()?;
    let canonical = serde_json::to_string(&block_to_json(&block, &tx_documents))?;

    tracing::debug!(
        "Decoded {} at height {} ({:?} envelope, {} txs)",
        block.kind.name(),
        block.height,
        envelope.kind(),
        tx_documents.len()
    );

    Ok(DecodedBlock { envelope: envelope.kind(), block, canonical, tx_documents })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ids::Id;
    use crate::codec::testutil;

    fn sample_block() -> Vec<u8> {
        let txs = vec![testutil::advance_time_tx(1_600_000_000), testutil::import_tx_body(1, &[[3u8; 65]])];
        testutil::apricot_standard_block(&Id::of(b"parent"), 12, &txs)
    }

    #[test]
    fn test_decode_bare_block() {
        let raw = sample_block();
        let decoded = decode_block(&NetworkContext::mainnet(), &raw).unwrap();

        assert_eq!(decoded.envelope, EnvelopeKind::Bare);
        assert_eq!(decoded.block.height, 12);
        assert_eq!(decoded.tx_count(), 2);

        let canonical: Value = serde_json::from_str(&decoded.canonical).unwrap();
        assert_eq!(canonical["height"], 12);
        assert_eq!(canonical["txs"].as_array().unwrap().len(), 2);
        assert_eq!(canonical["txs"][0]["unsignedTx"]["time"], 1_600_000_000u64);
    }

    #[test]
    fn test_decode_wrapped_block_matches_bare() {
        let inner = sample_block();
        let wrapped = testutil::proposer_wrap(&inner);

        let bare = decode_block(&NetworkContext::mainnet(), &inner).unwrap();
        let decoded = decode_block(&NetworkContext::mainnet(), &wrapped).unwrap();

        assert_eq!(decoded.envelope, EnvelopeKind::Signed);
        assert_eq!(decoded.block.id, bare.block.id);
        assert_eq!(decoded.canonical, bare.canonical);
    }

    #[test]
    fn test_transactions_are_paired_with_their_documents() {
        let decoded = decode_block(&NetworkContext::mainnet(), &sample_block()).unwrap();

        for pair in decoded.transactions() {
            assert_eq!(pair.document["id"], Value::String(pair.tx.id.to_string()));
        }
        let names: Vec<&str> = decoded.transactions().map(|p| p.tx.unsigned.name()).collect();
        assert_eq!(names, vec!["AdvanceTimeTx", "ImportTx"]);
    }

    #[test]
    fn test_commit_block_has_no_transactions() {
        let raw = testutil::apricot_commit_block(&Id::default(), 4);
        let decoded = decode_block(&NetworkContext::mainnet(), &raw).unwrap();

        assert_eq!(decoded.transactions().count(), 0);
        let canonical: Value = serde_json::from_str(&decoded.canonical).unwrap();
        assert!(canonical.get("txs").is_none());
        assert!(canonical.get("tx").is_none());
    }

    #[test]
    fn test_garbage_is_a_fatal_parse_error() {
        let err = decode_block(&NetworkContext::mainnet(), &[0, 0, 0, 0, 0, 99]).unwrap_err();
        assert!(matches!(err, DecodeError::Block(CodecError::UnknownType { type_id: 99, .. })));
    }

    #[test]
    fn test_rendering_failure_is_fatal() {
        let ctx = NetworkContext { hrp: String::new(), ..NetworkContext::mainnet() };
        let err = decode_block(&ctx, &sample_block()).unwrap_err();
        assert!(matches!(err, DecodeError::Canonical(_)));
    }
}
