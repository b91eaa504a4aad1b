/// Block Module
///
/// P-Chain blocks. Apricot blocks carry parent and height; Banff blocks add a
/// timestamp. Proposal and atomic blocks hold a single transaction, standard
/// blocks a list, and Banff proposal blocks both.
use super::ids::Id;
use super::reader::CodecRead;
use super::txs::Tx;
use super::{CodecError, CODEC_VERSION};
use std::io::Cursor;

pub mod type_ids {
    pub const APRICOT_PROPOSAL: u32 = 0;
    pub const APRICOT_ABORT: u32 = 1;
    pub const APRICOT_COMMIT: u32 = 2;
    pub const APRICOT_STANDARD: u32 = 3;
    pub const APRICOT_ATOMIC: u32 = 4;
    pub const BANFF_PROPOSAL: u32 = 29;
    pub const BANFF_ABORT: u32 = 30;
    pub const BANFF_COMMIT: u32 = 31;
    pub const BANFF_STANDARD: u32 = 32;
}

use type_ids::*;

/// Smallest embedded transaction: type ID plus an empty credential list
const MIN_TX_LEN: usize = 4 + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    ApricotProposal,
    ApricotAbort,
    ApricotCommit,
    ApricotStandard,
    ApricotAtomic,
    BanffProposal,
    BanffAbort,
    BanffCommit,
    BanffStandard,
}

impl BlockKind {
    fn from_type_id(type_id: u32) -> Result<Self, CodecError> {
        let kind = match type_id {
            APRICOT_PROPOSAL => BlockKind::ApricotProposal,
            APRICOT_ABORT => BlockKind::ApricotAbort,
            APRICOT_COMMIT => BlockKind::ApricotCommit,
            APRICOT_STANDARD => BlockKind::ApricotStandard,
            APRICOT_ATOMIC => BlockKind::ApricotAtomic,
            BANFF_PROPOSAL => BlockKind::BanffProposal,
            BANFF_ABORT => BlockKind::BanffAbort,
            BANFF_COMMIT => BlockKind::BanffCommit,
            BANFF_STANDARD => BlockKind::BanffStandard,
            type_id => return Err(CodecError::UnknownType { type_id, context: "block" }),
        };
        Ok(kind)
    }

    pub fn is_banff(&self) -> bool {
        matches!(self, BlockKind::BanffProposal | BlockKind::BanffAbort | BlockKind::BanffCommit | BlockKind::BanffStandard)
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::ApricotProposal => "ApricotProposalBlock",
            BlockKind::ApricotAbort => "ApricotAbortBlock",
            BlockKind::ApricotCommit => "ApricotCommitBlock",
            BlockKind::ApricotStandard => "ApricotStandardBlock",
            BlockKind::ApricotAtomic => "ApricotAtomicBlock",
            BlockKind::BanffProposal => "BanffProposalBlock",
            BlockKind::BanffAbort => "BanffAbortBlock",
            BlockKind::BanffCommit => "BanffCommitBlock",
            BlockKind::BanffStandard => "BanffStandardBlock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: Id,
    pub kind: BlockKind,
    /// Banff blocks only
    pub time: Option<u64>,
    pub parent_id: Id,
    pub height: u64,
    /// Decision transactions (standard blocks, and Banff proposal blocks)
    pub decision_txs: Vec<Tx>,
    /// The single transaction of proposal and atomic blocks
    pub proposal_tx: Option<Tx>,
}

impl Block {
    /// Parse a versioned P-Chain block; the whole input must be consumed
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);

        let version = cursor.read_u16_be()?;
        if version != CODEC_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }

        let kind = BlockKind::from_type_id(cursor.read_u32_be()?)?;
        let time = if kind.is_banff() { Some(cursor.read_u64_be()?) } else { None };

        // Banff proposal blocks list their decision txs ahead of the embedded Apricot fields
        let mut decision_txs = if kind == BlockKind::BanffProposal { read_txs(&mut cursor)? } else { Vec::new() };

        let parent_id = cursor.read_id()?;
        let height = cursor.read_u64_be()?;

        let mut proposal_tx = None;
        match kind {
            BlockKind::ApricotProposal | BlockKind::ApricotAtomic | BlockKind::BanffProposal => {
                proposal_tx = Some(Tx::read(&mut cursor)?);
            }
            BlockKind::ApricotStandard | BlockKind::BanffStandard => {
                decision_txs = read_txs(&mut cursor)?;
            }
            BlockKind::ApricotAbort | BlockKind::ApricotCommit | BlockKind::BanffAbort | BlockKind::BanffCommit => {}
        }

        if cursor.remaining() != 0 {
            return Err(CodecError::TrailingBytes(cursor.remaining()));
        }

        Ok(Self { id: Id::of(bytes), kind, time, parent_id, height, decision_txs, proposal_tx })
    }

    /// All transactions in block order: decision transactions first, then the proposal transaction
    pub fn txs(&self) -> impl Iterator<Item = &Tx> {
        self.decision_txs.iter().chain(self.proposal_tx.iter())
    }
}

fn read_txs(cursor: &mut Cursor<&[u8]>) -> Result<Vec<Tx>, CodecError> {
    cursor.read_vec(MIN_TX_LEN, Tx::read)
}
