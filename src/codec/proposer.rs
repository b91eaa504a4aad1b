/// Proposer Wrapper
///
/// Since Banff, blocks accepted on the P-Chain are wrapped by the proposer VM,
/// which adds the proposer's certificate, the P-Chain height used for
/// validator lookups and a signature around the real block. Earlier blocks
/// are stored bare. Certificates and signatures are carried, not verified.
use super::ids::Id;
use super::reader::CodecRead;
use super::{CodecError, CODEC_VERSION};
use std::io::Cursor;

const SIGNED_BLOCK_TYPE_ID: u32 = 0;
const OPTION_BLOCK_TYPE_ID: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposerBlock {
    /// Block built by a proposer (certificate may be empty for unsigned proposals)
    Signed {
        parent_id: Id,
        timestamp: i64,
        p_chain_height: u64,
        certificate: Vec<u8>,
        inner: Vec<u8>,
        signature: Vec<u8>,
    },
    /// Commit/abort option of a proposal block
    Option { parent_id: Id, inner: Vec<u8> },
}

impl ProposerBlock {
    /// Parse proposer-VM bytes; the whole input must be consumed
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);

        let version = cursor.read_u16_be()?;
        if version != CODEC_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let block = match cursor.read_u32_be()? {
            SIGNED_BLOCK_TYPE_ID => {
                let parent_id = cursor.read_id()?;
                let timestamp = cursor.read_i64_be()?;
                let p_chain_height = cursor.read_u64_be()?;
                let certificate = cursor.read_bytes()?;
                let inner = cursor.read_bytes()?;
                let signature = cursor.read_bytes()?;
                ProposerBlock::Signed { parent_id, timestamp, p_chain_height, certificate, inner, signature }
            }
            OPTION_BLOCK_TYPE_ID => {
                let parent_id = cursor.read_id()?;
                let inner = cursor.read_bytes()?;
                ProposerBlock::Option { parent_id, inner }
            }
            type_id => return Err(CodecError::UnknownType { type_id, context: "proposer block" }),
        };

        if cursor.remaining() != 0 {
            return Err(CodecError::TrailingBytes(cursor.remaining()));
        }

        Ok(block)
    }

    /// Bytes of the wrapped P-Chain block
    pub fn inner(&self) -> &[u8] {
        match self {
            ProposerBlock::Signed { inner, .. } | ProposerBlock::Option { inner, .. } => inner,
        }
    }
}

/// Raw block bytes, either wrapped by the proposer VM or bare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<'a> {
    Wrapped(ProposerBlock),
    Bare(&'a [u8]),
}

/// Which envelope a block arrived in, kept on the decoded block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Signed,
    Option,
    Bare,
}

impl<'a> Envelope<'a> {
    /// Try the wrapper first; anything that does not parse as one is a bare block
    pub fn parse(raw: &'a [u8]) -> Self {
        match ProposerBlock::parse(raw) {
            Ok(block) => {
                match &block {
                    ProposerBlock::Signed { parent_id, timestamp, p_chain_height, certificate, signature, .. } => {
                        tracing::trace!(
                            "Signed proposer block parent {} time {} P-Chain height {} ({} byte cert, {} byte sig)",
                            parent_id,
                            timestamp,
                            p_chain_height,
                            certificate.len(),
                            signature.len()
                        );
                    }
                    ProposerBlock::Option { parent_id, .. } => {
                        tracing::trace!("Option proposer block parent {}", parent_id);
                    }
                }
                Envelope::Wrapped(block)
            }
            Err(e) => {
                tracing::trace!("No proposer wrapper ({}), treating bytes as a bare block", e);
                Envelope::Bare(raw)
            }
        }
    }

    pub fn inner(&self) -> &[u8] {
        match self {
            Envelope::Wrapped(block) => block.inner(),
            Envelope::Bare(raw) => raw,
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::Wrapped(ProposerBlock::Signed { .. }) => EnvelopeKind::Signed,
            Envelope::Wrapped(ProposerBlock::Option { .. }) => EnvelopeKind::Option,
            Envelope::Bare(_) => EnvelopeKind::Bare,
        }
    }
}
