use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{json, Value};

use super::abi::{self, Token};
use super::rpc::{HttpTransport, RpcTransport};
use super::types::{CreateReceipt, LedgerRecord, Role, SigningContext, VerifyReceipt};
use super::{Ledger, LedgerError};
use crate::config::LedgerConfig;

/// Safety margin added on top of every gas estimate.
pub const GAS_MARGIN_PERCENT: u64 = 20;

/// `ComplaintRegistry` client over JSON-RPC.
pub struct RegistryClient {
    transport: Box<dyn RpcTransport>,
    contract: String,
    claimant: SigningContext,
    government: SigningContext,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    logs: Vec<TxLog>,
}

#[derive(Debug, Deserialize)]
struct TxLog {
    address: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    data: String,
}

pub fn with_gas_margin(estimate: u64) -> u64 {
    estimate.saturating_mul(100 + GAS_MARGIN_PERCENT) / 100
}

impl RegistryClient {
    pub fn new(
        transport: Box<dyn RpcTransport>,
        contract: &str,
        claimant: SigningContext,
        government: SigningContext,
    ) -> Result<Self, LedgerError> {
        abi::parse_address(contract)?;
        abi::parse_address(&claimant.account)?;
        abi::parse_address(&government.account)?;
        if claimant.role != Role::Claimant || government.role != Role::Government {
            return Err(LedgerError::InvalidArgument(
                "signing contexts must be (claimant, government)".into(),
            ));
        }
        Ok(Self {
            transport,
            contract: contract.to_ascii_lowercase(),
            claimant,
            government,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        })
    }

    pub fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let transport = HttpTransport::new(&config.rpc_url, config.rpc_timeout)?;
        Ok(Self::new(
            Box::new(transport),
            &config.contract_address,
            SigningContext::new(Role::Claimant, &config.claimant_account),
            SigningContext::new(Role::Government, &config.government_account),
        )?
        .with_confirmation(config.confirmation_timeout, config.poll_interval))
    }

    fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let params = json!([{ "to": self.contract, "data": abi::to_hex_data(&data) }, "latest"]);
        let result = self.transport.call("eth_call", params)?;
        let hex = result
            .as_str()
            .ok_or_else(|| LedgerError::Decode("eth_call result is not a string".into()))?;
        abi::from_hex_data(hex)
    }

    /// estimateGas → +margin → sendTransaction → wait for receipt → require success.
    fn send_write(&self, ctx: &SigningContext, data: Vec<u8>) -> Result<TxReceipt, LedgerError> {
        let mut tx = json!({
            "from": ctx.account,
            "to": self.contract,
            "data": abi::to_hex_data(&data),
        });

        let estimate = self.transport.call("eth_estimateGas", json!([tx.clone()]))?;
        let estimate = abi::parse_quantity(quantity_str(&estimate)?)?;
        let gas = with_gas_margin(estimate);
        tx["gas"] = Value::String(abi::to_quantity(gas));

        let hash = self.transport.call("eth_sendTransaction", json!([tx]))?;
        let tx_hash = hash
            .as_str()
            .ok_or_else(|| LedgerError::Decode("transaction hash is not a string".into()))?
            .to_string();
        tracing::info!(role = ?ctx.role, tx_hash = %tx_hash, estimate, gas, "Transaction submitted");

        let receipt = self.wait_for_receipt(&tx_hash)?;
        match receipt.status.as_deref().map(abi::parse_quantity).transpose()? {
            Some(1) => Ok(receipt),
            _ => Err(LedgerError::Reverted { tx_hash }),
        }
    }

    fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxReceipt, LedgerError> {
        let started = Instant::now();
        loop {
            let value = self
                .transport
                .call("eth_getTransactionReceipt", json!([tx_hash]))?;
            if !value.is_null() {
                return serde_json::from_value(value)
                    .map_err(|e| LedgerError::Decode(format!("invalid receipt: {e}")));
            }
            if started.elapsed() >= self.confirmation_timeout {
                return Err(LedgerError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited: started.elapsed(),
                });
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Logs emitted by the registry itself with the given signature topic.
    fn events<'a>(&'a self, receipt: &'a TxReceipt, topic: &'a str) -> impl Iterator<Item = &'a TxLog> + 'a {
        receipt.logs.iter().filter(move |log| {
            log.address.eq_ignore_ascii_case(&self.contract)
                && log.topics.first().is_some_and(|t| t.eq_ignore_ascii_case(topic))
        })
    }
}

fn quantity_str(v: &Value) -> Result<&str, LedgerError> {
    v.as_str()
        .ok_or_else(|| LedgerError::Decode(format!("expected hex quantity, got {v}")))
}

fn indexed_id(log: &TxLog) -> Result<u64, LedgerError> {
    let topic = log
        .topics
        .get(1)
        .ok_or_else(|| LedgerError::Decode("event has no indexed id".into()))?;
    abi::topic_to_u64(topic)
}

impl Ledger for RegistryClient {
    fn create_record(&self, content_identifier: &str, score: u8) -> Result<CreateReceipt, LedgerError> {
        if content_identifier.trim().is_empty() {
            return Err(LedgerError::InvalidArgument("content identifier is empty".into()));
        }
        if score > 100 {
            return Err(LedgerError::InvalidArgument(format!("score {score} outside 0-100")));
        }
        let _span = tracing::info_span!("create_record", cid = %content_identifier, score).entered();

        let data = abi::encode_call(
            abi::CREATE_RECORD,
            &[Token::String(content_identifier), Token::Uint(u64::from(score))],
        );
        let receipt = self.send_write(&self.claimant, data)?;

        let created = self
            .events(&receipt, abi::RECORD_CREATED_TOPIC)
            .next()
            .ok_or_else(|| LedgerError::MissingEvent {
                tx_hash: receipt.transaction_hash.clone(),
                event: "RecordCreated",
            })?;
        let record_id = indexed_id(created)?;

        let auto_verified = self
            .events(&receipt, abi::RECORD_VERIFIED_TOPIC)
            .any(|log| indexed_id(log).is_ok_and(|id| id == record_id));

        tracing::info!(record_id, auto_verified, "Record created");
        Ok(CreateReceipt {
            record_id,
            tx_hash: receipt.transaction_hash,
            auto_verified,
        })
    }

    fn set_verified(&self, id: u64, verified: bool) -> Result<VerifyReceipt, LedgerError> {
        let _span = tracing::info_span!("set_verified", record_id = id, verified).entered();
        self.get_record(id)?;

        let data = abi::encode_call(abi::SET_VERIFIED, &[Token::Uint(id), Token::Bool(verified)]);
        let receipt = self.send_write(&self.government, data)?;

        let log = self
            .events(&receipt, abi::RECORD_VERIFIED_TOPIC)
            .next()
            .ok_or_else(|| LedgerError::MissingEvent {
                tx_hash: receipt.transaction_hash.clone(),
                event: "RecordVerified",
            })?;
        let record_id = indexed_id(log)?;
        let logged = abi::decode_bool(&abi::from_hex_data(&log.data)?, 0)?;

        tracing::info!(record_id, verified = logged, "Record verification updated");
        Ok(VerifyReceipt {
            record_id,
            tx_hash: receipt.transaction_hash,
            verified: logged,
        })
    }

    fn get_record(&self, id: u64) -> Result<LedgerRecord, LedgerError> {
        let data = abi::encode_call(abi::GET_RECORD, &[Token::Uint(id)]);
        let output = match self.eth_call(data) {
            Ok(out) => out,
            Err(e) if e.is_revert() => return Err(LedgerError::NotFound(id)),
            Err(e) => return Err(e),
        };
        if output.is_empty() {
            return Err(LedgerError::NotFound(id));
        }
        abi::decode_record(&output)?.ok_or(LedgerError::NotFound(id))
    }

    fn get_records_by_status(&self, verified: bool, limit: u64, offset: u64) -> Result<Vec<u64>, LedgerError> {
        let data = abi::encode_call(
            abi::GET_RECORDS_BY_STATUS,
            &[Token::Bool(verified), Token::Uint(limit), Token::Uint(offset)],
        );
        abi::decode_uint_array(&self.eth_call(data)?, 0)
    }

    fn get_records_for_claimant(&self, claimant: &str) -> Result<Vec<u64>, LedgerError> {
        let address = abi::parse_address(claimant)?;
        let data = abi::encode_call(abi::GET_RECORDS_FOR_CLAIMANT, &[Token::Address(address)]);
        abi::decode_uint_array(&self.eth_call(data)?, 0)
    }

    fn get_total_records(&self) -> Result<u64, LedgerError> {
        let data = abi::encode_call(abi::GET_TOTAL_RECORDS, &[]);
        abi::decode_uint(&self.eth_call(data)?, 0)
    }

    fn has_role(&self, role: Role, account: &str) -> Result<bool, LedgerError> {
        let address = abi::parse_address(account)?;
        let data = abi::encode_call(abi::HAS_ROLE, &[Token::FixedBytes(role.id()), Token::Address(address)]);
        abi::decode_bool(&self.eth_call(data)?, 0)
    }

    fn network_id(&self) -> Result<u64, LedgerError> {
        let id = self.transport.call("eth_chainId", json!([]))?;
        abi::parse_quantity(quantity_str(&id)?)
    }

    fn contract_address(&self) -> &str {
        &self.contract
    }
}
