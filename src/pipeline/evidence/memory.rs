use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

use super::store::{gateway_url, EvidenceStore, PublishedEvidence};
use super::EvidenceError;

/// CIDv1 header for a raw-codec sha2-256 multihash.
const CID_V1_RAW_SHA256: [u8; 4] = [0x01, 0x55, 0x12, 0x20];
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// CIDv1 (raw codec, sha2-256) of `payload` in multibase base32, the same
/// identifier an IPFS node assigns with `--cid-version=1 --raw-leaves`
/// to a single-block file.
pub fn compute_cid(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    let mut bytes = CID_V1_RAW_SHA256.to_vec();
    bytes.extend_from_slice(&digest);
    format!("b{}", base32_lower(&bytes))
}

/// RFC 4648 base32, lowercase, no padding.
fn base32_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0u32;
    for &b in bytes {
        buffer = (buffer << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// In-process store for tests and local development.
pub struct MemoryStore {
    name: String,
    gateway: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    publishes: AtomicUsize,
    fail: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            gateway: "http://localhost:8080".into(),
            objects: Mutex::new(HashMap::new()),
            publishes: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Store whose every call fails as if the backend were unreachable.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::named("unreachable")
        }
    }

    /// Successful publish calls so far.
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceStore for MemoryStore {
    fn publish(&self, _name: &str, payload: &[u8]) -> Result<PublishedEvidence, EvidenceError> {
        if self.fail {
            return Err(EvidenceError::Connection(self.name.clone()));
        }
        let cid = compute_cid(payload);
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cid.clone(), payload.to_vec());
        self.publishes.fetch_add(1, Ordering::SeqCst);
        Ok(PublishedEvidence {
            gateway_url: gateway_url(&self.gateway, &cid),
            cid,
            backend: self.name.clone(),
        })
    }

    fn fetch(&self, cid: &str) -> Result<Vec<u8>, EvidenceError> {
        if self.fail {
            return Err(EvidenceError::Connection(self.name.clone()));
        }
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cid)
            .cloned()
            .ok_or_else(|| EvidenceError::NotFound(cid.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_of_empty_payload_matches_ipfs() {
        // `ipfs add --cid-version=1 --raw-leaves` of an empty file.
        assert_eq!(
            compute_cid(b""),
            "bafkreihdwdcefgh4dqkjv67uzcmw7ojee6xedzdetojuzjevtenxquvyku"
        );
    }

    #[test]
    fn cid_is_content_addressed() {
        assert_eq!(compute_cid(b"abc"), compute_cid(b"abc"));
        assert_ne!(compute_cid(b"abc"), compute_cid(b"abd"));
        assert!(compute_cid(b"abc").starts_with("bafkrei"));
    }

    #[test]
    fn fetch_returns_identical_bytes() {
        let store = MemoryStore::new();
        let payload = br#"{"claimant":"0xabc","score":96}"#;
        let published = store.publish("bundle.json", payload).unwrap();
        assert_eq!(store.fetch(&published.cid).unwrap(), payload.to_vec());
        assert_eq!(store.publish_count(), 1);
    }

    #[test]
    fn unknown_cid_not_found() {
        let err = MemoryStore::new().fetch("bafkreinope").unwrap_err();
        assert!(matches!(err, EvidenceError::NotFound(_)));
    }

    #[test]
    fn base32_known_vector() {
        assert_eq!(base32_lower(b"foobar"), "mzxw6ytboi");
    }
}
