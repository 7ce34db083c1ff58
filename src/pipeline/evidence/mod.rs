//! Evidence publication to content-addressed storage.
//!
//! The bundle is serialized with sorted keys and pinned on an IPFS node,
//! with a managed pinning service as per-call fallback. The returned
//! content identifier is the only long-term handle to the evidence.

pub mod bundle;
pub mod store;
pub mod ipfs;
pub mod pinata;
pub mod fallback;
pub mod memory;

pub use bundle::*;
pub use store::*;
pub use ipfs::*;
pub use pinata::*;
pub use fallback::*;
pub use memory::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Cannot connect to storage backend at {0}")]
    Connection(String),

    #[error("Storage request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Storage backend returned {status}: {body}")]
    ServiceError { status: u16, body: String },

    #[error("Failed to parse storage response: {0}")]
    ResponseParsing(String),

    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Bundle serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("All storage backends failed (primary: {primary}; secondary: {})", secondary.as_deref().unwrap_or("not configured"))]
    AllBackendsFailed {
        primary: String,
        secondary: Option<String>,
    },
}

/// Map a reqwest transport error the same way for every storage client.
pub(crate) fn map_transport_error(e: reqwest::Error, base_url: &str, timeout: Duration) -> EvidenceError {
    if e.is_connect() {
        EvidenceError::Connection(base_url.to_string())
    } else if e.is_timeout() {
        EvidenceError::Timeout(timeout)
    } else {
        EvidenceError::HttpClient(e.to_string())
    }
}
