/// Canonical Module
///
/// Renders decoded blocks and transactions as JSON documents. IDs are CB58,
/// byte fields `0x`-hex, and owner addresses are bech32 prefixed with the chain
/// alias, which is why rendering needs a `NetworkContext`. Object keys come
/// out sorted, so the text form is deterministic.
use super::block::Block;
use super::formatting::{encode_hex, format_chain_address, FormattingError};
use super::ids::{Id, ShortId};
use super::txs::{
    BaseTx, Credential, Input, Output, OutputOwners, Signer, TransferableInput, TransferableOutput, Tx, UnsignedTx,
    Validator,
};
use serde_json::{json, Map, Value};

/// ID of the secp256k1 feature extension, reported as `fxID` on inputs and outputs
const SECP256K1_FX_ID: [u8; 32] = [
    b's', b'e', b'c', b'p', b'2', b'5', b'6', b'k', b'1', b'f', b'x', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0,
];

/// Network identity bound to a block before rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    pub name: String,
    pub network_id: u32,
    /// Human-readable part of bech32 addresses
    pub hrp: String,
    /// Alias of the chain the blocks come from
    pub chain_alias: String,
}

impl NetworkContext {
    pub fn mainnet() -> Self {
        Self { name: "mainnet".to_string(), network_id: 1, hrp: "avax".to_string(), chain_alias: "P".to_string() }
    }

    pub fn fuji() -> Self {
        Self { name: "fuji".to_string(), network_id: 5, hrp: "fuji".to_string(), chain_alias: "P".to_string() }
    }

    fn address(&self, addr: &ShortId) -> Result<Value, FormattingError> {
        Ok(Value::String(format_chain_address(&self.chain_alias, &self.hrp, addr.as_bytes())?))
    }
}

/// Render a block, embedding the already-rendered transaction documents in block order
pub fn block_to_json(block: &Block, tx_docs: &[Value]) -> Value {
    let mut map = Map::new();
    map.insert("id".to_string(), id(&block.id));
    map.insert("parentID".to_string(), id(&block.parent_id));
    map.insert("height".to_string(), json!(block.height));
    if let Some(time) = block.time {
        map.insert("time".to_string(), json!(time));
    }

    let decision_count = block.decision_txs.len();
    if has_tx_list(block) {
        map.insert("txs".to_string(), Value::Array(tx_docs.iter().take(decision_count).cloned().collect()));
    }
    if block.proposal_tx.is_some() {
        if let Some(doc) = tx_docs.get(decision_count) {
            map.insert("tx".to_string(), doc.clone());
        }
    }
    Value::Object(map)
}

/// Standard blocks and Banff proposal blocks carry a `txs` list
fn has_tx_list(block: &Block) -> bool {
    use super::block::BlockKind::*;
    matches!(block.kind, ApricotStandard | BanffStandard | BanffProposal)
}

/// Render a signed transaction: `{"unsignedTx", "credentials", "id"}`
pub fn tx_to_json(ctx: &NetworkContext, tx: &Tx) -> Result<Value, FormattingError> {
    Ok(json!({
        "unsignedTx": unsigned_to_json(ctx, &tx.unsigned)?,
        "credentials": tx.credentials.iter().map(credential).collect::<Vec<_>>(),
        "id": id(&tx.id),
    }))
}

pub fn unsigned_to_json(ctx: &NetworkContext, unsigned: &UnsignedTx) -> Result<Value, FormattingError> {
    let doc = match unsigned {
        UnsignedTx::AddValidator(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("validator".into(), validator(&tx.validator));
            m.insert("stake".into(), outputs(ctx, &tx.stake)?);
            m.insert("rewardsOwner".into(), owners(ctx, &tx.rewards_owner)?);
            m.insert("shares".into(), json!(tx.shares));
            Ok(())
        })?,
        UnsignedTx::AddSubnetValidator(tx) => with_base(ctx, &tx.base, |m| {
            let mut v = validator(&tx.validator);
            v["subnetID"] = id(&tx.subnet_id);
            m.insert("validator".into(), v);
            m.insert("subnetAuthorization".into(), sig_indices(&tx.subnet_auth));
            Ok(())
        })?,
        UnsignedTx::AddDelegator(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("validator".into(), validator(&tx.validator));
            m.insert("stake".into(), outputs(ctx, &tx.stake)?);
            m.insert("rewardsOwner".into(), owners(ctx, &tx.rewards_owner)?);
            Ok(())
        })?,
        UnsignedTx::CreateChain(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("subnetID".into(), id(&tx.subnet_id));
            m.insert("chainName".into(), json!(tx.chain_name));
            m.insert("vmID".into(), id(&tx.vm_id));
            m.insert("fxIDs".into(), Value::Array(tx.fx_ids.iter().map(id).collect()));
            m.insert("genesisData".into(), json!(encode_hex(&tx.genesis_data)));
            m.insert("subnetAuthorization".into(), sig_indices(&tx.subnet_auth));
            Ok(())
        })?,
        UnsignedTx::CreateSubnet(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("owner".into(), owners(ctx, &tx.owner)?);
            Ok(())
        })?,
        UnsignedTx::Import(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("sourceChain".into(), id(&tx.source_chain));
            m.insert("importedInputs".into(), inputs(&tx.imported_inputs));
            Ok(())
        })?,
        UnsignedTx::Export(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("destinationChain".into(), id(&tx.destination_chain));
            m.insert("exportedOutputs".into(), outputs(ctx, &tx.exported_outputs)?);
            Ok(())
        })?,
        UnsignedTx::AdvanceTime { time } => json!({ "time": time }),
        UnsignedTx::RewardValidator { tx_id } => json!({ "txID": id(tx_id) }),
        UnsignedTx::RemoveSubnetValidator(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("nodeID".into(), json!(tx.node_id.to_node_id_string()));
            m.insert("subnetID".into(), id(&tx.subnet_id));
            m.insert("subnetAuthorization".into(), sig_indices(&tx.subnet_auth));
            Ok(())
        })?,
        UnsignedTx::TransformSubnet(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("subnetID".into(), id(&tx.subnet_id));
            m.insert("assetID".into(), id(&tx.asset_id));
            m.insert("initialSupply".into(), json!(tx.initial_supply));
            m.insert("maximumSupply".into(), json!(tx.maximum_supply));
            m.insert("minConsumptionRate".into(), json!(tx.min_consumption_rate));
            m.insert("maxConsumptionRate".into(), json!(tx.max_consumption_rate));
            m.insert("minValidatorStake".into(), json!(tx.min_validator_stake));
            m.insert("maxValidatorStake".into(), json!(tx.max_validator_stake));
            m.insert("minStakeDuration".into(), json!(tx.min_stake_duration));
            m.insert("maxStakeDuration".into(), json!(tx.max_stake_duration));
            m.insert("minDelegationFee".into(), json!(tx.min_delegation_fee));
            m.insert("minDelegatorStake".into(), json!(tx.min_delegator_stake));
            m.insert("maxValidatorWeightFactor".into(), json!(tx.max_validator_weight_factor));
            m.insert("uptimeRequirement".into(), json!(tx.uptime_requirement));
            m.insert("subnetAuthorization".into(), sig_indices(&tx.subnet_auth));
            Ok(())
        })?,
        UnsignedTx::AddPermissionlessValidator(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("validator".into(), validator(&tx.validator));
            m.insert("subnetID".into(), id(&tx.subnet_id));
            m.insert("signer".into(), signer(&tx.signer));
            m.insert("stake".into(), outputs(ctx, &tx.stake)?);
            m.insert("validationRewardsOwner".into(), owners(ctx, &tx.validation_rewards_owner)?);
            m.insert("delegationRewardsOwner".into(), owners(ctx, &tx.delegation_rewards_owner)?);
            m.insert("shares".into(), json!(tx.shares));
            Ok(())
        })?,
        UnsignedTx::AddPermissionlessDelegator(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("validator".into(), validator(&tx.validator));
            m.insert("subnetID".into(), id(&tx.subnet_id));
            m.insert("stake".into(), outputs(ctx, &tx.stake)?);
            m.insert("rewardsOwner".into(), owners(ctx, &tx.rewards_owner)?);
            Ok(())
        })?,
        UnsignedTx::TransferSubnetOwnership(tx) => with_base(ctx, &tx.base, |m| {
            m.insert("subnetID".into(), id(&tx.subnet_id));
            m.insert("subnetAuthorization".into(), sig_indices(&tx.subnet_auth));
            m.insert("newOwner".into(), owners(ctx, &tx.owner)?);
            Ok(())
        })?,
        UnsignedTx::Base(base) => with_base(ctx, base, |_| Ok(()))?,
    };
    Ok(doc)
}

/// Base transaction fields plus whatever the specific transaction adds
fn with_base<F>(ctx: &NetworkContext, base: &BaseTx, extend: F) -> Result<Value, FormattingError>
where
    F: FnOnce(&mut Map<String, Value>) -> Result<(), FormattingError>,
{
    let mut map = Map::new();
    map.insert("networkID".into(), json!(base.network_id));
    map.insert("blockchainID".into(), id(&base.blockchain_id));
    map.insert("outputs".into(), outputs(ctx, &base.outputs)?);
    map.insert("inputs".into(), inputs(&base.inputs));
    map.insert("memo".into(), json!(encode_hex(&base.memo)));
    extend(&mut map)?;
    Ok(Value::Object(map))
}

fn id(id: &Id) -> Value {
    Value::String(id.to_string())
}

fn fx_id() -> Value {
    id(&Id::from(SECP256K1_FX_ID))
}

fn owners(ctx: &NetworkContext, owners: &OutputOwners) -> Result<Value, FormattingError> {
    let addresses = owners.addresses.iter().map(|a| ctx.address(a)).collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "addresses": addresses, "locktime": owners.locktime, "threshold": owners.threshold }))
}

fn transfer_output(ctx: &NetworkContext, amount: u64, owner: &OutputOwners) -> Result<Value, FormattingError> {
    let mut doc = owners(ctx, owner)?;
    doc["amount"] = json!(amount);
    Ok(doc)
}

fn output(ctx: &NetworkContext, output: &Output) -> Result<Value, FormattingError> {
    match output {
        Output::Transfer { amount, owners } => transfer_output(ctx, *amount, owners),
        Output::StakeableLock { locktime, amount, owners } => {
            Ok(json!({ "locktime": locktime, "output": transfer_output(ctx, *amount, owners)? }))
        }
    }
}

fn outputs(ctx: &NetworkContext, outs: &[TransferableOutput]) -> Result<Value, FormattingError> {
    let docs = outs
        .iter()
        .map(|out| Ok(json!({ "assetID": id(&out.asset_id), "fxID": fx_id(), "output": output(ctx, &out.output)? })))
        .collect::<Result<Vec<_>, FormattingError>>()?;
    Ok(Value::Array(docs))
}

fn input(input: &Input) -> Value {
    match input {
        Input::Transfer { amount, sig_indices } => json!({ "amount": amount, "signatureIndices": sig_indices }),
        Input::StakeableLock { locktime, amount, sig_indices } => json!({
            "locktime": locktime,
            "input": { "amount": amount, "signatureIndices": sig_indices },
        }),
    }
}

fn inputs(ins: &[TransferableInput]) -> Value {
    Value::Array(
        ins.iter()
            .map(|i| {
                json!({
                    "txID": id(&i.tx_id),
                    "outputIndex": i.output_index,
                    "assetID": id(&i.asset_id),
                    "fxID": fx_id(),
                    "input": input(&i.input),
                })
            })
            .collect(),
    )
}

fn validator(v: &Validator) -> Value {
    json!({ "nodeID": v.node_id.to_node_id_string(), "start": v.start, "end": v.end, "weight": v.weight })
}

fn sig_indices(indices: &[u32]) -> Value {
    json!({ "signatureIndices": indices })
}

fn signer(s: &Signer) -> Value {
    match s {
        Signer::Empty => json!({}),
        Signer::ProofOfPossession { public_key, proof } => {
            json!({ "publicKey": encode_hex(public_key), "proofOfPossession": encode_hex(proof) })
        }
    }
}

fn credential(cred: &Credential) -> Value {
    json!({ "signatures": cred.signatures.iter().map(|s| encode_hex(s.as_bytes())).collect::<Vec<_>>() })
}
