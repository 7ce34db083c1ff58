use serde::Serialize;

use super::EvidenceError;

/// Result of pinning one payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublishedEvidence {
    /// Content identifier (CID).
    pub cid: String,
    pub gateway_url: String,
    /// Backend that pinned the payload.
    pub backend: String,
}

/// Content-addressed, pinned storage.
pub trait EvidenceStore: Send + Sync {
    /// Pin `payload` and return its content identifier.
    fn publish(&self, name: &str, payload: &[u8]) -> Result<PublishedEvidence, EvidenceError>;

    /// Retrieve a previously published payload byte-for-byte.
    fn fetch(&self, cid: &str) -> Result<Vec<u8>, EvidenceError>;

    fn name(&self) -> &str;
}

/// Human-followable URL for a CID on an HTTP gateway.
pub fn gateway_url(gateway: &str, cid: &str) -> String {
    format!("{}/ipfs/{}", gateway.trim_end_matches('/'), cid)
}
