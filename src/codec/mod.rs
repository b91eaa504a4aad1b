/// Codec Module
///
/// Read-only decoder for the P-Chain wire format:
/// - `proposer`: the optional proposer-VM wrapper around post-Banff blocks
/// - `block`: P-Chain blocks (Apricot and Banff)
/// - `txs`: signed transactions, unsigned transaction bodies and credentials
/// - `canonical`: JSON rendering of decoded blocks under a network context
///
/// Every encoded value is big-endian; slices have u32 length prefixes and
/// interface values a u32 type ID.
pub mod block;
pub mod canonical;
pub mod formatting;
pub mod ids;
pub mod proposer;
pub mod reader;
pub mod txs;

#[cfg(test)]
pub mod testutil;

use thiserror::Error;

/// The only codec version ever written to the P-Chain
pub const CODEC_VERSION: u16 = 0;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("length prefix {len} exceeds the {remaining} remaining bytes")]
    LengthOverflow { len: usize, remaining: usize },
    #[error("string is not valid UTF-8")]
    InvalidString,
    #[error("unsupported codec version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown {context} type ID {type_id}")]
    UnknownType { type_id: u32, context: &'static str },
    #[error("{0} trailing bytes after decoding")]
    TrailingBytes(usize),
}

impl From<std::io::Error> for CodecError {
    // Readers only ever run over in-memory slices, so every io error is a short read
    fn from(_: std::io::Error) -> Self {
        CodecError::UnexpectedEof
    }
}
