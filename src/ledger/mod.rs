//! Ledger client for the `ComplaintRegistry` contract.
//!
//! Writes go through `eth_sendTransaction` from node-managed accounts, one
//! account per role (`SigningContext`). Reads go through `eth_call`.
//! The `Ledger` trait is the seam the pipeline and API depend on.

pub mod types;
pub mod abi;
pub mod rpc;
pub mod registry;
pub mod memory;

pub use types::*;
pub use rpc::*;
pub use registry::*;
pub use memory::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Record {0} not found")]
    NotFound(u64),

    #[error("Cannot connect to ledger node at {0}")]
    Connection(String),

    #[error("Ledger request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Transaction {tx_hash} not confirmed within {waited:?}")]
    ConfirmationTimeout { tx_hash: String, waited: Duration },

    #[error("Receipt for {tx_hash} has no {event} event")]
    MissingEvent {
        tx_hash: String,
        event: &'static str,
    },

    #[error("ABI decode error: {0}")]
    Decode(String),
}

impl LedgerError {
    /// Node rejected an `eth_call`/`eth_estimateGas` because the contract reverted.
    pub fn is_revert(&self) -> bool {
        match self {
            LedgerError::Rpc { code, message } => {
                *code == 3 || message.to_ascii_lowercase().contains("revert")
            }
            LedgerError::Reverted { .. } => true,
            _ => false,
        }
    }
}

/// Contract operations the service uses.
pub trait Ledger: Send + Sync {
    /// Create a record, signed by the claimant role. Never deduplicates.
    fn create_record(&self, content_identifier: &str, score: u8) -> Result<CreateReceipt, LedgerError>;

    /// Set the verification flag, signed by the government role.
    /// `NotFound` if the record does not exist.
    fn set_verified(&self, id: u64, verified: bool) -> Result<VerifyReceipt, LedgerError>;

    fn get_record(&self, id: u64) -> Result<LedgerRecord, LedgerError>;

    fn get_records_by_status(&self, verified: bool, limit: u64, offset: u64) -> Result<Vec<u64>, LedgerError>;

    fn get_records_for_claimant(&self, claimant: &str) -> Result<Vec<u64>, LedgerError>;

    fn get_total_records(&self) -> Result<u64, LedgerError>;

    fn has_role(&self, role: Role, account: &str) -> Result<bool, LedgerError>;

    fn network_id(&self) -> Result<u64, LedgerError>;

    fn contract_address(&self) -> &str;
}
