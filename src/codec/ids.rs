/// Identifiers
///
/// 32-byte IDs (blocks, transactions, chains, assets) and 20-byte short IDs
/// (addresses, node IDs), rendered as CB58: base58 over the payload followed by
/// the last four bytes of its SHA-256.
use bitcoin::base58;
use bitcoin::hashes::{sha256, Hash};
use std::fmt;

const CHECKSUM_LEN: usize = 4;

/// Node IDs are short IDs printed with this prefix
pub const NODE_ID_PREFIX: &str = "NodeID-";

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id([u8; 32]);

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortId([u8; 20]);

impl Id {
    /// ID of arbitrary bytes: their SHA-256
    pub fn of(bytes: &[u8]) -> Self {
        Self(sha256::Hash::hash(bytes).to_byte_array())
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl ShortId {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `NodeID-<cb58>` form used for validator node IDs
    pub fn to_node_id_string(&self) -> String {
        format!("{}{}", NODE_ID_PREFIX, cb58_encode(&self.0))
    }
}

impl From<[u8; 32]> for Id {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<[u8; 20]> for ShortId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cb58_encode(&self.0))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&cb58_encode(&self.0))
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortId({})", self)
    }
}

/// Encode bytes as CB58
pub fn cb58_encode(bytes: &[u8]) -> String {
    let checksum = sha256::Hash::hash(bytes).to_byte_array();
    let mut checked = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    checked.extend_from_slice(bytes);
    checked.extend_from_slice(&checksum[32 - CHECKSUM_LEN..]);
    base58::encode(&checked)
}
