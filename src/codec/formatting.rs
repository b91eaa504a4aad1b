/// Formatting Module
///
/// Text encodings used by the node API and by the flattened rows:
/// - checksummed hex (`0x` + hex of bytes followed by the last 4 bytes of their SHA-256)
/// - plain hex (`0x` + hex, no checksum)
/// - bech32 addresses, optionally prefixed with a chain alias (`P-avax1...`)
use bitcoin::bech32::{self, Bech32, Hrp};
use bitcoin::hashes::{sha256, Hash};
use thiserror::Error;

const CHECKSUM_LEN: usize = 4;
const HEX_PREFIX: &str = "0x";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormattingError {
    #[error("payload of {0} bytes is too large to encode")]
    Overflow(usize),
    #[error("missing 0x prefix")]
    MissingPrefix,
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("checksum mismatch")]
    Checksum,
    #[error("unexpected length {0}")]
    Length(usize),
    #[error("bech32: {0}")]
    Bech32(String),
}

/// Encode bytes as `0x`-hex with a trailing 4-byte checksum
pub fn encode_hex_checksum(bytes: &[u8]) -> Result<String, FormattingError> {
    if bytes.len() > i32::MAX as usize - CHECKSUM_LEN {
        return Err(FormattingError::Overflow(bytes.len()));
    }
    let checksum = sha256::Hash::hash(bytes).to_byte_array();
    let mut checked = Vec::with_capacity(bytes.len() + CHECKSUM_LEN);
    checked.extend_from_slice(bytes);
    checked.extend_from_slice(&checksum[32 - CHECKSUM_LEN..]);
    Ok(format!("{}{}", HEX_PREFIX, hex::encode(checked)))
}

/// Decode `0x`-hex carrying a trailing 4-byte checksum
pub fn decode_hex_checksum(s: &str) -> Result<Vec<u8>, FormattingError> {
    let stripped = s.strip_prefix(HEX_PREFIX).ok_or(FormattingError::MissingPrefix)?;
    let decoded = hex::decode(stripped).map_err(|e| FormattingError::Hex(e.to_string()))?;
    if decoded.len() < CHECKSUM_LEN {
        return Err(FormattingError::Length(decoded.len()));
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
    let expected = sha256::Hash::hash(payload).to_byte_array();
    if checksum != &expected[32 - CHECKSUM_LEN..] {
        return Err(FormattingError::Checksum);
    }
    Ok(payload.to_vec())
}

/// `0x`-hex without checksum, used for memos, genesis data and signatures in JSON
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("{}{}", HEX_PREFIX, hex::encode(bytes))
}

/// Bech32 encoding of raw address bytes under `hrp`
pub fn format_bech32(hrp: &str, payload: &[u8]) -> Result<String, FormattingError> {
    let hrp = Hrp::parse(hrp).map_err(|e| FormattingError::Bech32(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, payload).map_err(|e| FormattingError::Bech32(e.to_string()))
}

/// Bech32 address prefixed with a chain alias, e.g. `P-avax1...`
pub fn format_chain_address(chain_alias: &str, hrp: &str, payload: &[u8]) -> Result<String, FormattingError> {
    Ok(format!("{}-{}", chain_alias, format_bech32(hrp, payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_checksum_of_empty_input() {
        // sha256("") ends in 7852b855
        assert_eq!(encode_hex_checksum(&[]).unwrap(), "0x7852b855");
    }

    #[test]
    fn test_hex_checksum_decode_verifies() {
        let encoded = encode_hex_checksum(b"block bytes").unwrap();
        assert_eq!(decode_hex_checksum(&encoded).unwrap(), b"block bytes".to_vec());

        let tampered = format!("0x00{}", &encoded[4..]);
        assert_eq!(decode_hex_checksum(&tampered), Err(FormattingError::Checksum));
        assert_eq!(decode_hex_checksum("deadbeef"), Err(FormattingError::MissingPrefix));
    }

    #[test]
    fn test_plain_hex() {
        assert_eq!(encode_hex(&[0xde, 0xad]), "0xdead");
        assert_eq!(encode_hex(&[]), "0x");
    }

    #[test]
    fn test_bech32_round_trip() {
        let payload = [0x3cu8; 20];
        let addr = format_bech32("avax", &payload).unwrap();
        assert!(addr.starts_with("avax1"));

        let (hrp, data) = bech32::decode(&addr).unwrap();
        assert_eq!(hrp.to_string(), "avax");
        assert_eq!(data, payload.to_vec());

        let chain = format_chain_address("P", "avax", &payload).unwrap();
        assert_eq!(chain, format!("P-{}", addr));
    }

    #[test]
    fn test_bech32_rejects_invalid_hrp() {
        assert!(matches!(format_bech32("", &[1, 2, 3]), Err(FormattingError::Bech32(_))));
    }
}
