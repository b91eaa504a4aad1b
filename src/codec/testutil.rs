/// Encoders for building synthetic blocks in tests
use super::block::type_ids as block_type_ids;
use super::ids::{Id, ShortId};
use super::txs::type_ids::*;
use super::txs::SIGNATURE_LEN;
use super::CODEC_VERSION;
use bitcoin::hashes::{sha256, Hash};
use secp256k1::{Message, Secp256k1, SecretKey};

#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn id(&mut self, id: &Id) -> &mut Self {
        self.buf.extend_from_slice(id.as_bytes());
        self
    }

    pub fn short_id(&mut self, id: &ShortId) -> &mut Self {
        self.buf.extend_from_slice(id.as_bytes());
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// u32 length-prefixed bytes
    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.u32(bytes.len() as u32);
        self.raw(bytes)
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// One AVAX-like output of `amount` owned by a single address
pub fn write_transferable_output(w: &mut Writer, amount: u64) {
    w.id(&Id::of(b"asset")).u32(TRANSFER_OUTPUT).u64(amount).u64(0).u32(1);
    w.u32(1).short_id(&ShortId::from([0x3c; 20]));
}

/// Base transaction fields with a single output and no inputs
pub fn write_base_tx(w: &mut Writer, network_id: u32, memo: &[u8]) {
    w.u32(network_id).id(&Id::default());
    w.u32(1);
    write_transferable_output(w, 1_000_000);
    w.u32(0);
    w.bytes(memo);
}

/// Unsigned ImportTx body (type ID and fields, no codec version)
pub fn unsigned_import_tx(network_id: u32) -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(IMPORT);
    write_base_tx(&mut w, network_id, b"memo");
    w.id(&Id::of(b"X-Chain"));
    w.u32(1);
    w.id(&Id::of(b"utxo")).u32(0).id(&Id::of(b"asset"));
    w.u32(TRANSFER_INPUT).u64(1_000_001).u32(1).u32(0);
    w.finish()
}

/// Append a credential section; no signatures means no credentials at all
pub fn with_credentials(mut unsigned: Vec<u8>, signatures: &[[u8; SIGNATURE_LEN]]) -> Vec<u8> {
    let mut w = Writer::new();
    if signatures.is_empty() {
        w.u32(0);
    } else {
        w.u32(1).u32(CREDENTIAL).u32(signatures.len() as u32);
        for sig in signatures {
            w.raw(sig);
        }
    }
    unsigned.extend_from_slice(&w.finish());
    unsigned
}

pub fn import_tx_body(network_id: u32, signatures: &[[u8; SIGNATURE_LEN]]) -> Vec<u8> {
    with_credentials(unsigned_import_tx(network_id), signatures)
}

/// Sign an unsigned body the way wallets do: SHA-256 over the versioned bytes
pub fn sign(unsigned: &[u8], secret: &SecretKey) -> [u8; SIGNATURE_LEN] {
    let mut versioned = CODEC_VERSION.to_be_bytes().to_vec();
    versioned.extend_from_slice(unsigned);
    let digest = sha256::Hash::hash(&versioned).to_byte_array();

    let secp = Secp256k1::new();
    let (recovery_id, compact) = secp.sign_ecdsa_recoverable(&Message::from_digest(digest), secret).serialize_compact();

    let mut sig = [0u8; SIGNATURE_LEN];
    sig[..64].copy_from_slice(&compact);
    sig[64] = recovery_id.to_i32() as u8;
    sig
}

/// Import transaction signed by `secret`
pub fn signed_import_tx(network_id: u32, secret: &SecretKey) -> Vec<u8> {
    let unsigned = unsigned_import_tx(network_id);
    let sig = sign(&unsigned, secret);
    with_credentials(unsigned, &[sig])
}

/// Versioned ApricotStandardBlock holding the given embedded transactions
pub fn apricot_standard_block(parent: &Id, height: u64, txs: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(CODEC_VERSION).u32(block_type_ids::APRICOT_STANDARD).id(parent).u64(height);
    w.u32(txs.len() as u32);
    for tx in txs {
        w.raw(tx);
    }
    w.finish()
}

/// Versioned BanffStandardBlock holding the given embedded transactions
pub fn banff_standard_block(time: u64, parent: &Id, height: u64, txs: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(CODEC_VERSION).u32(block_type_ids::BANFF_STANDARD).u64(time).id(parent).u64(height);
    w.u32(txs.len() as u32);
    for tx in txs {
        w.raw(tx);
    }
    w.finish()
}

/// Versioned ApricotCommitBlock, which carries no transactions
pub fn apricot_commit_block(parent: &Id, height: u64) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(CODEC_VERSION).u32(block_type_ids::APRICOT_COMMIT).id(parent).u64(height);
    w.finish()
}

/// Wrap inner block bytes in a signed proposer block
pub fn proposer_wrap(inner: &[u8]) -> Vec<u8> {
    let mut w = Writer::new();
    w.u16(CODEC_VERSION).u32(0).id(&Id::of(b"proposer parent")).i64(1_700_000_000).u64(7);
    w.bytes(&[]).bytes(inner).bytes(&[]);
    w.finish()
}

/// AdvanceTimeTx without credentials
pub fn advance_time_tx(time: u64) -> Vec<u8> {
    let mut w = Writer::new();
    w.u32(ADVANCE_TIME).u64(time).u32(0);
    w.finish()
}
