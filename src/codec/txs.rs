/// Transactions Module
///
/// Signed P-Chain transactions: an unsigned body (tagged by codec type ID)
/// followed by the credentials authorising it. Only decoding is supported.
use super::ids::{Id, ShortId};
use super::reader::CodecRead;
use super::{CodecError, CODEC_VERSION};
use std::fmt;
use std::io::Cursor;

/// Codec type IDs registered by the platform VM
pub mod type_ids {
    pub const TRANSFER_INPUT: u32 = 5;
    pub const TRANSFER_OUTPUT: u32 = 7;
    pub const CREDENTIAL: u32 = 9;
    pub const INPUT: u32 = 10;
    pub const OUTPUT_OWNERS: u32 = 11;
    pub const ADD_VALIDATOR: u32 = 12;
    pub const ADD_SUBNET_VALIDATOR: u32 = 13;
    pub const ADD_DELEGATOR: u32 = 14;
    pub const CREATE_CHAIN: u32 = 15;
    pub const CREATE_SUBNET: u32 = 16;
    pub const IMPORT: u32 = 17;
    pub const EXPORT: u32 = 18;
    pub const ADVANCE_TIME: u32 = 19;
    pub const REWARD_VALIDATOR: u32 = 20;
    pub const STAKEABLE_LOCK_IN: u32 = 21;
    pub const STAKEABLE_LOCK_OUT: u32 = 22;
    pub const REMOVE_SUBNET_VALIDATOR: u32 = 23;
    pub const TRANSFORM_SUBNET: u32 = 24;
    pub const ADD_PERMISSIONLESS_VALIDATOR: u32 = 25;
    pub const ADD_PERMISSIONLESS_DELEGATOR: u32 = 26;
    pub const EMPTY_SIGNER: u32 = 27;
    pub const PROOF_OF_POSSESSION: u32 = 28;
    pub const TRANSFER_SUBNET_OWNERSHIP: u32 = 33;
    pub const BASE: u32 = 34;
}

use type_ids::*;

/// Length of a recoverable secp256k1 signature: r (32) || s (32) || recovery id (1)
pub const SIGNATURE_LEN: usize = 65;

/// Smallest possible encodings, used to bound length prefixes
const MIN_OUTPUT_LEN: usize = 32 + 4 + 8 + 8 + 4 + 4;
const MIN_INPUT_LEN: usize = 32 + 4 + 32 + 4 + 8 + 4;
const MIN_CREDENTIAL_LEN: usize = 4 + 4;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The 64 compact signature bytes (r || s)
    pub fn compact(&self) -> &[u8] {
        &self.0[..64]
    }

    pub fn recovery_byte(&self) -> u8 {
        self.0[64]
    }
}

impl From<[u8; SIGNATURE_LEN]> for RecoverableSignature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", hex::encode(self.0))
    }
}

/// secp256k1fx credential: one signature per input signature index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub signatures: Vec<RecoverableSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOwners {
    pub locktime: u64,
    pub threshold: u32,
    pub addresses: Vec<ShortId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Transfer { amount: u64, owners: OutputOwners },
    StakeableLock { locktime: u64, amount: u64, owners: OutputOwners },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub output: Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Transfer { amount: u64, sig_indices: Vec<u32> },
    StakeableLock { locktime: u64, amount: u64, sig_indices: Vec<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferableInput {
    pub tx_id: Id,
    pub output_index: u32,
    pub asset_id: Id,
    pub input: Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub outputs: Vec<TransferableOutput>,
    pub inputs: Vec<TransferableInput>,
    pub memo: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub node_id: ShortId,
    pub start: u64,
    pub end: u64,
    pub weight: u64,
}

/// BLS key registration of a permissionless validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signer {
    Empty,
    ProofOfPossession { public_key: [u8; 48], proof: [u8; 96] },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
    pub shares: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSubnetValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
    pub subnet_auth: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChainTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub chain_name: String,
    pub vm_id: Id,
    pub fx_ids: Vec<Id>,
    pub genesis_data: Vec<u8>,
    pub subnet_auth: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSubnetTx {
    pub base: BaseTx,
    pub owner: OutputOwners,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTx {
    pub base: BaseTx,
    pub source_chain: Id,
    pub imported_inputs: Vec<TransferableInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTx {
    pub base: BaseTx,
    pub destination_chain: Id,
    pub exported_outputs: Vec<TransferableOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveSubnetValidatorTx {
    pub base: BaseTx,
    pub node_id: ShortId,
    pub subnet_id: Id,
    pub subnet_auth: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSubnetTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub asset_id: Id,
    pub initial_supply: u64,
    pub maximum_supply: u64,
    pub min_consumption_rate: u64,
    pub max_consumption_rate: u64,
    pub min_validator_stake: u64,
    pub max_validator_stake: u64,
    pub min_stake_duration: u32,
    pub max_stake_duration: u32,
    pub min_delegation_fee: u32,
    pub min_delegator_stake: u64,
    pub max_validator_weight_factor: u8,
    pub uptime_requirement: u32,
    pub subnet_auth: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPermissionlessValidatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
    pub signer: Signer,
    pub stake: Vec<TransferableOutput>,
    pub validation_rewards_owner: OutputOwners,
    pub delegation_rewards_owner: OutputOwners,
    pub shares: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPermissionlessDelegatorTx {
    pub base: BaseTx,
    pub validator: Validator,
    pub subnet_id: Id,
    pub stake: Vec<TransferableOutput>,
    pub rewards_owner: OutputOwners,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSubnetOwnershipTx {
    pub base: BaseTx,
    pub subnet_id: Id,
    pub subnet_auth: Vec<u32>,
    pub owner: OutputOwners,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsignedTx {
    AddValidator(AddValidatorTx),
    AddSubnetValidator(AddSubnetValidatorTx),
    AddDelegator(AddDelegatorTx),
    CreateChain(CreateChainTx),
    CreateSubnet(CreateSubnetTx),
    Import(ImportTx),
    Export(ExportTx),
    AdvanceTime { time: u64 },
    RewardValidator { tx_id: Id },
    RemoveSubnetValidator(RemoveSubnetValidatorTx),
    TransformSubnet(Box<TransformSubnetTx>),
    AddPermissionlessValidator(Box<AddPermissionlessValidatorTx>),
    AddPermissionlessDelegator(AddPermissionlessDelegatorTx),
    TransferSubnetOwnership(TransferSubnetOwnershipTx),
    Base(BaseTx),
}

impl UnsignedTx {
    pub fn read<R: CodecRead>(r: &mut R) -> Result<Self, CodecError> {
        let tx = match r.read_u32_be()? {
            ADD_VALIDATOR => UnsignedTx::AddValidator(AddValidatorTx {
                base: read_base_tx(r)?,
                validator: read_validator(r)?,
                stake: read_outputs(r)?,
                rewards_owner: read_owner(r)?,
                shares: r.read_u32_be()?,
            }),
            ADD_SUBNET_VALIDATOR => UnsignedTx::AddSubnetValidator(AddSubnetValidatorTx {
                base: read_base_tx(r)?,
                validator: read_validator(r)?,
                subnet_id: r.read_id()?,
                subnet_auth: read_subnet_auth(r)?,
            }),
            ADD_DELEGATOR => UnsignedTx::AddDelegator(AddDelegatorTx {
                base: read_base_tx(r)?,
                validator: read_validator(r)?,
                stake: read_outputs(r)?,
                rewards_owner: read_owner(r)?,
            }),
            CREATE_CHAIN => UnsignedTx::CreateChain(CreateChainTx {
                base: read_base_tx(r)?,
                subnet_id: r.read_id()?,
                chain_name: r.read_string()?,
                vm_id: r.read_id()?,
                fx_ids: r.read_vec(32, |r| r.read_id())?,
                genesis_data: r.read_bytes()?,
                subnet_auth: read_subnet_auth(r)?,
            }),
            CREATE_SUBNET => UnsignedTx::CreateSubnet(CreateSubnetTx { base: read_base_tx(r)?, owner: read_owner(r)? }),
            IMPORT => UnsignedTx::Import(ImportTx {
                base: read_base_tx(r)?,
                source_chain: r.read_id()?,
                imported_inputs: read_inputs(r)?,
            }),
            EXPORT => UnsignedTx::Export(ExportTx {
                base: read_base_tx(r)?,
                destination_chain: r.read_id()?,
                exported_outputs: read_outputs(r)?,
            }),
            ADVANCE_TIME => UnsignedTx::AdvanceTime { time: r.read_u64_be()? },
            REWARD_VALIDATOR => UnsignedTx::RewardValidator { tx_id: r.read_id()? },
            REMOVE_SUBNET_VALIDATOR => UnsignedTx::RemoveSubnetValidator(RemoveSubnetValidatorTx {
                base: read_base_tx(r)?,
                node_id: r.read_short_id()?,
                subnet_id: r.read_id()?,
                subnet_auth: read_subnet_auth(r)?,
            }),
            TRANSFORM_SUBNET => UnsignedTx::TransformSubnet(Box::new(TransformSubnetTx {
                base: read_base_tx(r)?,
                subnet_id: r.read_id()?,
                asset_id: r.read_id()?,
                initial_supply: r.read_u64_be()?,
                maximum_supply: r.read_u64_be()?,
                min_consumption_rate: r.read_u64_be()?,
                max_consumption_rate: r.read_u64_be()?,
                min_validator_stake: r.read_u64_be()?,
                max_validator_stake: r.read_u64_be()?,
                min_stake_duration: r.read_u32_be()?,
                max_stake_duration: r.read_u32_be()?,
                min_delegation_fee: r.read_u32_be()?,
                min_delegator_stake: r.read_u64_be()?,
                max_validator_weight_factor: r.read_byte()?,
                uptime_requirement: r.read_u32_be()?,
                subnet_auth: read_subnet_auth(r)?,
            })),
            ADD_PERMISSIONLESS_VALIDATOR => {
                UnsignedTx::AddPermissionlessValidator(Box::new(AddPermissionlessValidatorTx {
                    base: read_base_tx(r)?,
                    validator: read_validator(r)?,
                    subnet_id: r.read_id()?,
                    signer: read_signer(r)?,
                    stake: read_outputs(r)?,
                    validation_rewards_owner: read_owner(r)?,
                    delegation_rewards_owner: read_owner(r)?,
                    shares: r.read_u32_be()?,
                }))
            }
            ADD_PERMISSIONLESS_DELEGATOR => UnsignedTx::AddPermissionlessDelegator(AddPermissionlessDelegatorTx {
                base: read_base_tx(r)?,
                validator: read_validator(r)?,
                subnet_id: r.read_id()?,
                stake: read_outputs(r)?,
                rewards_owner: read_owner(r)?,
            }),
            TRANSFER_SUBNET_OWNERSHIP => UnsignedTx::TransferSubnetOwnership(TransferSubnetOwnershipTx {
                base: read_base_tx(r)?,
                subnet_id: r.read_id()?,
                subnet_auth: read_subnet_auth(r)?,
                owner: read_owner(r)?,
            }),
            BASE => UnsignedTx::Base(read_base_tx(r)?),
            type_id => return Err(CodecError::UnknownType { type_id, context: "unsigned transaction" }),
        };
        Ok(tx)
    }

    pub fn type_id(&self) -> u32 {
        match self {
            UnsignedTx::AddValidator(_) => ADD_VALIDATOR,
            UnsignedTx::AddSubnetValidator(_) => ADD_SUBNET_VALIDATOR,
            UnsignedTx::AddDelegator(_) => ADD_DELEGATOR,
            UnsignedTx::CreateChain(_) => CREATE_CHAIN,
            UnsignedTx::CreateSubnet(_) => CREATE_SUBNET,
            UnsignedTx::Import(_) => IMPORT,
            UnsignedTx::Export(_) => EXPORT,
            UnsignedTx::AdvanceTime { .. } => ADVANCE_TIME,
            UnsignedTx::RewardValidator { .. } => REWARD_VALIDATOR,
            UnsignedTx::RemoveSubnetValidator(_) => REMOVE_SUBNET_VALIDATOR,
            UnsignedTx::TransformSubnet(_) => TRANSFORM_SUBNET,
            UnsignedTx::AddPermissionlessValidator(_) => ADD_PERMISSIONLESS_VALIDATOR,
            UnsignedTx::AddPermissionlessDelegator(_) => ADD_PERMISSIONLESS_DELEGATOR,
            UnsignedTx::TransferSubnetOwnership(_) => TRANSFER_SUBNET_OWNERSHIP,
            UnsignedTx::Base(_) => BASE,
        }
    }

    /// Human-readable name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            UnsignedTx::AddValidator(_) => "AddValidatorTx",
            UnsignedTx::AddSubnetValidator(_) => "AddSubnetValidatorTx",
            UnsignedTx::AddDelegator(_) => "AddDelegatorTx",
            UnsignedTx::CreateChain(_) => "CreateChainTx",
            UnsignedTx::CreateSubnet(_) => "CreateSubnetTx",
            UnsignedTx::Import(_) => "ImportTx",
            UnsignedTx::Export(_) => "ExportTx",
            UnsignedTx::AdvanceTime { .. } => "AdvanceTimeTx",
            UnsignedTx::RewardValidator { .. } => "RewardValidatorTx",
            UnsignedTx::RemoveSubnetValidator(_) => "RemoveSubnetValidatorTx",
            UnsignedTx::TransformSubnet(_) => "TransformSubnetTx",
            UnsignedTx::AddPermissionlessValidator(_) => "AddPermissionlessValidatorTx",
            UnsignedTx::AddPermissionlessDelegator(_) => "AddPermissionlessDelegatorTx",
            UnsignedTx::TransferSubnetOwnership(_) => "TransferSubnetOwnershipTx",
            UnsignedTx::Base(_) => "BaseTx",
        }
    }
}

/// A signed transaction together with the exact bytes it was decoded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    pub id: Id,
    pub unsigned: UnsignedTx,
    pub credentials: Vec<Credential>,
    unsigned_bytes: Vec<u8>,
    signed_bytes: Vec<u8>,
}

impl Tx {
    /// Read a transaction embedded in a block. Embedded transactions carry no
    /// codec version of their own; the standalone byte forms get it prepended.
    pub fn read(cursor: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let buf: &[u8] = *cursor.get_ref();
        let start = cursor.offset();

        let unsigned = UnsignedTx::read(cursor)?;
        let unsigned_end = cursor.offset();
        let credentials = cursor.read_vec(MIN_CREDENTIAL_LEN, read_credential)?;
        let end = cursor.offset();

        let unsigned_bytes = with_codec_version(&buf[start..unsigned_end]);
        let signed_bytes = with_codec_version(&buf[start..end]);

        Ok(Self { id: Id::of(&signed_bytes), unsigned, credentials, unsigned_bytes, signed_bytes })
    }

    /// Versioned bytes of the unsigned body; this is what signers hash
    pub fn unsigned_bytes(&self) -> &[u8] {
        &self.unsigned_bytes
    }

    /// Versioned bytes of the whole signed transaction
    pub fn bytes(&self) -> &[u8] {
        &self.signed_bytes
    }

    /// First signature of the first credential, if any
    pub fn first_signature(&self) -> Option<&RecoverableSignature> {
        self.credentials.first().and_then(|c| c.signatures.first())
    }
}

fn with_codec_version(body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(body.len() + 2);
    bytes.extend_from_slice(&CODEC_VERSION.to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

/// Type ID of a signed transaction from its versioned bytes: the codec version
/// occupies bytes 0-1, the unsigned body's type ID bytes 2-5, and the low 16
/// bits of that ID are bytes 4-5.
pub fn parse_type_id(tx_bytes: &[u8]) -> Option<u16> {
    let hi = *tx_bytes.get(4)?;
    let lo = *tx_bytes.get(5)?;
    Some(u16::from_be_bytes([hi, lo]))
}

fn read_credential<R: CodecRead>(r: &mut R) -> Result<Credential, CodecError> {
    match r.read_u32_be()? {
        CREDENTIAL => {
            let signatures = r.read_vec(SIGNATURE_LEN, |r| Ok(RecoverableSignature(r.read_fixed()?)))?;
            Ok(Credential { signatures })
        }
        type_id => Err(CodecError::UnknownType { type_id, context: "credential" }),
    }
}

fn read_base_tx<R: CodecRead>(r: &mut R) -> Result<BaseTx, CodecError> {
    Ok(BaseTx {
        network_id: r.read_u32_be()?,
        blockchain_id: r.read_id()?,
        outputs: read_outputs(r)?,
        inputs: read_inputs(r)?,
        memo: r.read_bytes()?,
    })
}

fn read_owners_body<R: CodecRead>(r: &mut R) -> Result<OutputOwners, CodecError> {
    Ok(OutputOwners {
        locktime: r.read_u64_be()?,
        threshold: r.read_u32_be()?,
        addresses: r.read_vec(20, |r| r.read_short_id())?,
    })
}

/// `fx.Owner` interface value; the platform VM only registers OutputOwners
fn read_owner<R: CodecRead>(r: &mut R) -> Result<OutputOwners, CodecError> {
    match r.read_u32_be()? {
        OUTPUT_OWNERS => read_owners_body(r),
        type_id => Err(CodecError::UnknownType { type_id, context: "owner" }),
    }
}

/// Subnet authorization: an Input listing signature indices
fn read_subnet_auth<R: CodecRead>(r: &mut R) -> Result<Vec<u32>, CodecError> {
    match r.read_u32_be()? {
        INPUT => r.read_vec(4, |r| r.read_u32_be()),
        type_id => Err(CodecError::UnknownType { type_id, context: "subnet authorization" }),
    }
}

fn read_transfer_output<R: CodecRead>(r: &mut R) -> Result<(u64, OutputOwners), CodecError> {
    match r.read_u32_be()? {
        TRANSFER_OUTPUT => Ok((r.read_u64_be()?, read_owners_body(r)?)),
        type_id => Err(CodecError::UnknownType { type_id, context: "transfer output" }),
    }
}

fn read_output<R: CodecRead>(r: &mut R) -> Result<Output, CodecError> {
    match r.read_u32_be()? {
        TRANSFER_OUTPUT => Ok(Output::Transfer { amount: r.read_u64_be()?, owners: read_owners_body(r)? }),
        STAKEABLE_LOCK_OUT => {
            let locktime = r.read_u64_be()?;
            let (amount, owners) = read_transfer_output(r)?;
            Ok(Output::StakeableLock { locktime, amount, owners })
        }
        type_id => Err(CodecError::UnknownType { type_id, context: "output" }),
    }
}

fn read_outputs<R: CodecRead>(r: &mut R) -> Result<Vec<TransferableOutput>, CodecError> {
    r.read_vec(MIN_OUTPUT_LEN, |r| Ok(TransferableOutput { asset_id: r.read_id()?, output: read_output(r)? }))
}

fn read_transfer_input<R: CodecRead>(r: &mut R) -> Result<(u64, Vec<u32>), CodecError> {
    match r.read_u32_be()? {
        TRANSFER_INPUT => Ok((r.read_u64_be()?, r.read_vec(4, |r| r.read_u32_be())?)),
        type_id => Err(CodecError::UnknownType { type_id, context: "transfer input" }),
    }
}

fn read_input<R: CodecRead>(r: &mut R) -> Result<Input, CodecError> {
    match r.read_u32_be()? {
        TRANSFER_INPUT => {
            let (amount, sig_indices) = (r.read_u64_be()?, r.read_vec(4, |r| r.read_u32_be())?);
            Ok(Input::Transfer { amount, sig_indices })
        }
        STAKEABLE_LOCK_IN => {
            let locktime = r.read_u64_be()?;
            let (amount, sig_indices) = read_transfer_input(r)?;
            Ok(Input::StakeableLock { locktime, amount, sig_indices })
        }
        type_id => Err(CodecError::UnknownType { type_id, context: "input" }),
    }
}

fn read_inputs<R: CodecRead>(r: &mut R) -> Result<Vec<TransferableInput>, CodecError> {
    r.read_vec(MIN_INPUT_LEN, |r| {
        Ok(TransferableInput {
            tx_id: r.read_id()?,
            output_index: r.read_u32_be()?,
            asset_id: r.read_id()?,
            input: read_input(r)?,
        })
    })
}

fn read_validator<R: CodecRead>(r: &mut R) -> Result<Validator, CodecError> {
    Ok(Validator {
        node_id: r.read_short_id()?,
        start: r.read_u64_be()?,
        end: r.read_u64_be()?,
        weight: r.read_u64_be()?,
    })
}

fn read_signer<R: CodecRead>(r: &mut R) -> Result<Signer, CodecError> {
    match r.read_u32_be()? {
        EMPTY_SIGNER => Ok(Signer::Empty),
        PROOF_OF_POSSESSION => Ok(Signer::ProofOfPossession { public_key: r.read_fixed()?, proof: r.read_fixed()? }),
        type_id => Err(CodecError::UnknownType { type_id, context: "signer" }),
    }
}
