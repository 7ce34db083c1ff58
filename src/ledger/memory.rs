use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::{CreateReceipt, LedgerRecord, Role, VerifyReceipt};
use super::{Ledger, LedgerError};

/// One write issued against a `MemoryLedger`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerWrite {
    Create { content_identifier: String, score: u8 },
    SetVerified { id: u64, verified: bool },
}

#[derive(Default)]
struct State {
    records: Vec<LedgerRecord>,
    writes: Vec<LedgerWrite>,
    tx_counter: u64,
}

/// In-process ledger for tests and local development.
///
/// Ids start at 1 and increase monotonically. Every write is logged.
pub struct MemoryLedger {
    claimant: String,
    government: String,
    /// Emulates a contract that verifies at creation when score >= threshold.
    contract_auto_verify: Option<u8>,
    fail_writes: AtomicBool,
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new(claimant: &str, government: &str) -> Self {
        Self {
            claimant: claimant.to_ascii_lowercase(),
            government: government.to_ascii_lowercase(),
            contract_auto_verify: None,
            fail_writes: AtomicBool::new(false),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_contract_auto_verify(mut self, threshold: u8) -> Self {
        self.contract_auto_verify = Some(threshold);
        self
    }

    /// Make every subsequent write fail as a revert.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<LedgerWrite> {
        self.lock().writes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_tx(state: &mut State) -> String {
        state.tx_counter += 1;
        format!("0x{:064x}", state.tx_counter)
    }

    fn check_writable(&self) -> Result<(), LedgerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc {
                code: -32000,
                message: "execution reverted".into(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
            "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc",
        )
    }
}

impl Ledger for MemoryLedger {
    fn create_record(&self, content_identifier: &str, score: u8) -> Result<CreateReceipt, LedgerError> {
        if content_identifier.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("content identifier is empty".into()));
        }
        if score > 100 {
            return Err(LedgerError::InvalidArgument(format!("score {score} outside 0-100")));
        }
        self.check_writable()?;

        let mut state = self.lock();
        let id = state.records.len() as u64 + 1;
        let auto_verified = self.contract_auto_verify.is_some_and(|t| score >= t);
        state.records.push(LedgerRecord {
            id,
            claimant: self.claimant.clone(),
            content_identifier: content_identifier.to_string(),
            score,
            verified: auto_verified,
            created_at: chrono::Utc::now().timestamp().max(0) as u64,
        });
        state.writes.push(LedgerWrite::Create {
            content_identifier: content_identifier.to_string(),
            score,
        });
        Ok(CreateReceipt {
            record_id: id,
            tx_hash: Self::next_tx(&mut state),
            auto_verified,
        })
    }

    fn set_verified(&self, id: u64, verified: bool) -> Result<VerifyReceipt, LedgerError> {
        self.get_record(id)?;
        self.check_writable()?;

        let mut state = self.lock();
        if let Some(record) = state.records.iter_mut().find(|r| r.id == id) {
            record.verified = verified;
        }
        state.writes.push(LedgerWrite::SetVerified { id, verified });
        Ok(VerifyReceipt {
            record_id: id,
            tx_hash: Self::next_tx(&mut state),
            verified,
        })
    }

    fn get_record(&self, id: u64) -> Result<LedgerRecord, LedgerError> {
        self.lock()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    fn get_records_by_status(&self, verified: bool, limit: u64, offset: u64) -> Result<Vec<u64>, LedgerError> {
        Ok(self
            .lock()
            .records
            .iter()
            .filter(|r| r.verified == verified)
            .skip(offset as usize)
            .take(limit as usize)
            .map(|r| r.id)
            .collect())
    }

    fn get_records_for_claimant(&self, claimant: &str) -> Result<Vec<u64>, LedgerError> {
        Ok(self
            .lock()
            .records
            .iter()
            .filter(|r| r.claimant.eq_ignore_ascii_case(claimant))
            .map(|r| r.id)
            .collect())
    }

    fn get_total_records(&self) -> Result<u64, LedgerError> {
        Ok(self.lock().records.len() as u64)
    }

    fn has_role(&self, role: Role, account: &str) -> Result<bool, LedgerError> {
        Ok(match role {
            Role::Claimant => account.eq_ignore_ascii_case(&self.claimant),
            Role::Government | Role::Admin => account.eq_ignore_ascii_case(&self.government),
        })
    }

    fn network_id(&self) -> Result<u64, LedgerError> {
        Ok(31337)
    }

    fn contract_address(&self) -> &str {
        "0x0000000000000000000000000000000000000000"
    }
}
