use serde::{Deserialize, Serialize};

/// One registry entry as stored on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub id: u64,
    pub claimant: String,
    pub content_identifier: String,
    pub score: u8,
    pub verified: bool,
    /// Unix seconds (block timestamp).
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceipt {
    pub record_id: u64,
    pub tx_hash: String,
    /// The contract verified the record in the same transaction.
    pub auto_verified: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReceipt {
    pub record_id: u64,
    pub tx_hash: String,
    pub verified: bool,
}

/// Access-control roles defined by the contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Claimant,
    Government,
}

impl Role {
    /// `bytes32` role identifier: keccak-256 of the role name, zero for admin.
    pub fn id(&self) -> [u8; 32] {
        match self {
            Role::Admin => [0u8; 32],
            Role::Claimant => super::abi::CLAIMANT_ROLE,
            Role::Government => super::abi::GOVERNMENT_ROLE,
        }
    }
}

/// An account the node signs for, acting in one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    pub role: Role,
    /// `0x`-prefixed account address unlocked on the node.
    pub account: String,
}

impl SigningContext {
    pub fn new(role: Role, account: &str) -> Self {
        Self {
            role,
            account: account.to_string(),
        }
    }
}
