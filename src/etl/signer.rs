/// Signer Recovery Module
///
/// Recovers the secp256k1 public key that signed a transaction and derives the
/// two addresses the same key controls:
/// - P-Chain: bech32 over ripemd160(sha256(compressed key))
/// - C-Chain: EIP-55 checksummed keccak256(uncompressed key)[12..]
use crate::codec::formatting::{format_bech32, FormattingError};
use crate::codec::txs::RecoverableSignature;
use alloy_primitives::{keccak256, Address};
use bitcoin::hashes::{hash160, sha256, Hash};
use secp256k1::ecdsa::{self, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, VerifyOnly};
use thiserror::Error;

/// Largest recovery byte accepted in the last signature byte
const MAX_RECOVERY_BYTE: u8 = 7;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("invalid recovery id {0}")]
    RecoveryId(u8),
    #[error("malformed signature: {0}")]
    Signature(secp256k1::Error),
    #[error("signature s value is not in the lower half of the curve order")]
    MutatedSignature,
    #[error("public key recovery failed: {0}")]
    Recover(secp256k1::Error),
    #[error("address encoding failed: {0}")]
    Address(#[from] FormattingError),
}

/// Addresses controlled by a recovered key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerAddresses {
    /// Bech32 P-Chain address without chain prefix, e.g. `avax1...`
    pub p_chain: String,
    /// EIP-55 checksummed C-Chain address
    pub c_chain: String,
}

/// Stateless recovery service; owns its own verification context
pub struct SignerRecovery {
    secp: Secp256k1<VerifyOnly>,
    hrp: String,
}

impl SignerRecovery {
    pub fn new(hrp: impl Into<String>) -> Self {
        Self { secp: Secp256k1::verification_only(), hrp: hrp.into() }
    }

    /// Recover the key that produced `signature` over sha256(`unsigned_bytes`)
    pub fn recover_public_key(
        &self,
        unsigned_bytes: &[u8],
        signature: &RecoverableSignature,
    ) -> Result<PublicKey, RecoveryError> {
        // Bytes 4..=7 flag a compressed key and select the same recovery id as their low two bits
        let recovery_byte = signature.recovery_byte();
        if recovery_byte > MAX_RECOVERY_BYTE {
            return Err(RecoveryError::RecoveryId(recovery_byte));
        }
        let recovery_id =
            RecoveryId::from_i32((recovery_byte & 3) as i32).map_err(|_| RecoveryError::RecoveryId(recovery_byte))?;
        let recoverable = ecdsa::RecoverableSignature::from_compact(signature.compact(), recovery_id)
            .map_err(RecoveryError::Signature)?;

        // Only low-s signatures are accepted by the network
        let standard = recoverable.to_standard();
        let mut normalized = standard;
        normalized.normalize_s();
        if normalized != standard {
            return Err(RecoveryError::MutatedSignature);
        }

        let digest = sha256::Hash::hash(unsigned_bytes).to_byte_array();
        self.secp.recover_ecdsa(&Message::from_digest(digest), &recoverable).map_err(RecoveryError::Recover)
    }

    /// Recover the signer and derive both of its addresses
    pub fn recover_addresses(
        &self,
        unsigned_bytes: &[u8],
        signature: &RecoverableSignature,
    ) -> Result<SignerAddresses, RecoveryError> {
        let public_key = self.recover_public_key(unsigned_bytes, signature)?;
        self.addresses(&public_key)
    }

    /// Both address encodings of a public key
    pub fn addresses(&self, public_key: &PublicKey) -> Result<SignerAddresses, RecoveryError> {
        Ok(SignerAddresses { p_chain: self.p_chain_address(public_key)?, c_chain: c_chain_address(public_key) })
    }

    fn p_chain_address(&self, public_key: &PublicKey) -> Result<String, FormattingError> {
        let short_id = hash160::Hash::hash(&public_key.serialize()).to_byte_array();
        format_bech32(&self.hrp, &short_id)
    }
}

fn c_chain_address(public_key: &PublicKey) -> String {
    let uncompressed = public_key.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..]).to_checksum(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::testutil;
    use crate::codec::txs::SIGNATURE_LEN;
    use bitcoin::bech32;
    use secp256k1::SecretKey;

    // Well-known local-network funding key
    const EWOQ_KEY: &str = "56289e99c94b6912bfc12adc093c9b51124f0dc54ac7a766b2bc5ccf558d8027";

    fn ewoq() -> SecretKey {
        SecretKey::from_slice(&hex::decode(EWOQ_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_recover_round_trip_matches_known_key() {
        let secret = ewoq();
        let unsigned = testutil::unsigned_import_tx(1);
        let sig = RecoverableSignature::from(testutil::sign(&unsigned, &secret));

        let mut versioned = vec![0u8, 0];
        versioned.extend_from_slice(&unsigned);

        let recovery = SignerRecovery::new("avax");
        let recovered = recovery.recover_public_key(&versioned, &sig).unwrap();
        assert_eq!(recovered, PublicKey::from_secret_key(&Secp256k1::new(), &secret));

        let addresses = recovery.recover_addresses(&versioned, &sig).unwrap();
        assert_eq!(addresses.c_chain, "0x8db97C7cEcE249c2b98bDC0226Cc4C2A57BF52FC");

        let (hrp, payload) = bech32::decode(&addresses.p_chain).unwrap();
        assert_eq!(hrp.to_string(), "avax");
        assert_eq!(payload, hash160::Hash::hash(&recovered.serialize()).to_byte_array().to_vec());
    }

    #[test]
    fn test_recovery_over_different_bytes_yields_different_signer() {
        let secret = ewoq();
        let sig = RecoverableSignature::from(testutil::sign(b"payload", &secret));
        let recovery = SignerRecovery::new("avax");

        let honest = recovery.recover_addresses(&[0, 0, b'p', b'a', b'y', b'l', b'o', b'a', b'd'], &sig).unwrap();
        let other = recovery.recover_addresses(b"something else", &sig);

        assert_eq!(honest.c_chain, "0x8db97C7cEcE249c2b98bDC0226Cc4C2A57BF52FC");
        if let Ok(other) = other {
            assert_ne!(other, honest);
        }
    }

    #[test]
    fn test_compressed_flag_in_recovery_byte_is_accepted() {
        let secret = ewoq();
        let mut sig = testutil::sign(b"payload", &secret);
        let recovery = SignerRecovery::new("avax");
        let versioned = [0, 0, b'p', b'a', b'y', b'l', b'o', b'a', b'd'];
        let expected = recovery.recover_addresses(&versioned, &RecoverableSignature::from(sig)).unwrap();

        sig[64] += 4;
        let flagged = recovery.recover_addresses(&versioned, &RecoverableSignature::from(sig)).unwrap();
        assert_eq!(flagged, expected);

        sig[64] = 8;
        assert!(matches!(
            recovery.recover_addresses(b"payload", &RecoverableSignature::from(sig)),
            Err(RecoveryError::RecoveryId(8))
        ));
    }

    #[test]
    fn test_malformed_signature_fails() {
        let recovery = SignerRecovery::new("avax");

        let overflowing = RecoverableSignature::from([0xffu8; SIGNATURE_LEN]);
        assert!(matches!(recovery.recover_addresses(b"tx", &overflowing), Err(RecoveryError::RecoveryId(0xff))));

        let mut bad_scalars = [0xffu8; SIGNATURE_LEN];
        bad_scalars[64] = 0;
        let bad_scalars = RecoverableSignature::from(bad_scalars);
        assert!(matches!(recovery.recover_addresses(b"tx", &bad_scalars), Err(RecoveryError::Signature(_))));
    }

    #[test]
    fn test_high_s_signature_is_rejected() {
        let secret = ewoq();
        let mut sig = testutil::sign(b"payload", &secret);

        // Flip s to n - s and the recovery id with it
        let recovery_id = RecoveryId::from_i32(sig[64] as i32).unwrap();
        let standard = ecdsa::RecoverableSignature::from_compact(&sig[..64], recovery_id).unwrap().to_standard();
        let mut high = standard.serialize_compact();
        let n = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap();
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = n[i] as i16 - high[32 + i] as i16 - borrow;
            borrow = if diff < 0 { 1 } else { 0 };
            high[32 + i] = (diff + 256 * borrow) as u8;
        }
        sig[..64].copy_from_slice(&high);
        sig[64] ^= 1;

        let recovery = SignerRecovery::new("avax");
        let err = recovery.recover_addresses(b"payload", &RecoverableSignature::from(sig)).unwrap_err();
        assert!(matches!(err, RecoveryError::MutatedSignature));
    }

    #[test]
    fn test_invalid_hrp_is_an_address_error() {
        let secret = ewoq();
        let sig = RecoverableSignature::from(testutil::sign(b"payload", &secret));

        let recovery = SignerRecovery::new("");
        assert!(matches!(recovery.recover_addresses(&[0, 0, b'p'], &sig), Err(RecoveryError::Address(_))));
    }
}
