use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::abi::{decode_revert_reason, from_hex_data};
use super::LedgerError;

/// JSON-RPC transport to an EVM node.
pub trait RpcTransport: Send + Sync {
    fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError>;
}

// ═══════════════════════════════════════════════════════════
// HTTP transport
// ═══════════════════════════════════════════════════════════

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpTransport {
    url: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::HttpClient(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            client,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }
}

impl RpcTransport for HttpTransport {
    fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    LedgerError::Connection(self.url.clone())
                } else if e.is_timeout() {
                    LedgerError::Timeout(self.timeout)
                } else {
                    LedgerError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LedgerError::HttpClient(format!("{status}: {body}")));
        }

        let parsed: RpcResponse = response
            .json()
            .map_err(|e| LedgerError::Decode(format!("invalid JSON-RPC response: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(rpc_error(err));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

/// Fold a revert reason from `error.data` into the message when present.
fn rpc_error(err: RpcErrorObject) -> LedgerError {
    let reason = err
        .data
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|d| from_hex_data(d).ok())
        .and_then(|bytes| decode_revert_reason(&bytes));
    let message = match reason {
        Some(r) => format!("{}: {r}", err.message),
        None => err.message,
    };
    LedgerError::Rpc {
        code: err.code,
        message,
    }
}

// ═══════════════════════════════════════════════════════════
// Scripted transport (testing)
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum ScriptedReply {
    Ok(Value),
    Err { code: i64, message: String },
}

/// Replays canned responses per method and records every call.
///
/// Replies for a method are consumed in order; the last one repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: &str, result: Value) -> &Self {
        self.push(method, ScriptedReply::Ok(result))
    }

    pub fn fail(&self, method: &str, code: i64, message: &str) -> &Self {
        self.push(
            method,
            ScriptedReply::Err {
                code,
                message: message.to_string(),
            },
        )
    }

    fn push(&self, method: &str, reply: ScriptedReply) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Params of every call to `method`.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p)
            .collect()
    }
}

impl RpcTransport for ScriptedTransport {
    fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((method.to_string(), params));

        let mut replies = self.replies.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = replies.get_mut(method).ok_or_else(|| LedgerError::Rpc {
            code: -32601,
            message: format!("method {method} not scripted"),
        })?;
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match reply {
            Some(ScriptedReply::Ok(v)) => Ok(v),
            Some(ScriptedReply::Err { code, message }) => Err(LedgerError::Rpc { code, message }),
            None => Err(LedgerError::Rpc {
                code: -32601,
                message: format!("method {method} not scripted"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::abi::{encode_call, to_hex_data, Token, ERROR_STRING};
    use serde_json::json;

    #[test]
    fn scripted_replies_in_order_then_repeat_last() {
        let t = ScriptedTransport::new();
        t.respond("eth_getTransactionReceipt", Value::Null)
            .respond("eth_getTransactionReceipt", json!({"status": "0x1"}));

        assert!(t.call("eth_getTransactionReceipt", json!([])).unwrap().is_null());
        assert_eq!(t.call("eth_getTransactionReceipt", json!([])).unwrap()["status"], "0x1");
        assert_eq!(t.call("eth_getTransactionReceipt", json!([])).unwrap()["status"], "0x1");
        assert_eq!(t.calls_to("eth_getTransactionReceipt").len(), 3);
    }

    #[test]
    fn unscripted_method_errors() {
        let t = ScriptedTransport::new();
        assert!(matches!(
            t.call("eth_chainId", json!([])),
            Err(LedgerError::Rpc { code: -32601, .. })
        ));
    }

    #[test]
    fn rpc_error_includes_revert_reason() {
        let mut payload = ERROR_STRING.to_vec();
        payload.extend_from_slice(&encode_call([0; 4], &[Token::String("not found")])[4..]);
        let data = to_hex_data(&payload);
        let err = rpc_error(RpcErrorObject {
            code: 3,
            message: "execution reverted".into(),
            data: Some(Value::String(data)),
        });
        assert!(err.is_revert());
        assert_eq!(err.to_string(), "RPC error 3: execution reverted: not found");
    }

    #[test]
    fn unreachable_node() {
        let t = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(matches!(
            t.call("eth_chainId", json!([])),
            Err(LedgerError::Connection(_)) | Err(LedgerError::HttpClient(_))
        ));
    }
}
