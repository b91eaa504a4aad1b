/// ETL Pipeline Module
///
/// This module holds the stages of both passes:
/// - Extract: fetch raw containers from the node's index API
/// - Decode: unwrap and parse stored blocks into canonical form
/// - Transform: flatten transactions and recover their signers
/// - Load: store raw blocks and transaction rows in SQLite
pub mod decode;
pub mod extract;
pub mod load;
pub mod signer;
pub mod transform;
