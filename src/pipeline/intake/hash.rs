use sha2::{Digest, Sha256};

/// SHA-256 of raw payload bytes as lowercase hex.
///
/// Always computed over the bytes exactly as received, before any
/// preprocessing, so the hash on the ledger matches what the claimant uploaded.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn content_hash_deterministic() {
        assert_eq!(content_hash(b"complaint"), content_hash(b"complaint"));
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(content_hash(b"Content A"), content_hash(b"Content B"));
    }
}
