use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

use super::store::{gateway_url, EvidenceStore, PublishedEvidence};
use super::{map_transport_error, EvidenceError};

/// Pinata managed pinning API, authenticated with a JWT.
pub struct PinataStore {
    api_url: String,
    jwt: String,
    gateway: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataStore {
    pub fn new(api_url: &str, jwt: &str, gateway: &str, timeout: Duration) -> Result<Self, EvidenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EvidenceError::HttpClient(e.to_string()))?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            jwt: jwt.to_string(),
            gateway: gateway.to_string(),
            client,
            timeout,
        })
    }
}

impl EvidenceStore for PinataStore {
    fn publish(&self, name: &str, payload: &[u8]) -> Result<PublishedEvidence, EvidenceError> {
        let url = format!("{}/pinning/pinFileToIPFS", self.api_url);
        let form = Form::new()
            .part("file", Part::bytes(payload.to_vec()).file_name(name.to_string()))
            .text("pinataOptions", r#"{"cidVersion":1}"#);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .map_err(|e| map_transport_error(e, &self.api_url, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EvidenceError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PinResponse = response
            .json()
            .map_err(|e| EvidenceError::ResponseParsing(e.to_string()))?;

        tracing::info!(cid = %parsed.ipfs_hash, bytes = payload.len(), "Pinned evidence via Pinata");
        Ok(PublishedEvidence {
            gateway_url: gateway_url(&self.gateway, &parsed.ipfs_hash),
            cid: parsed.ipfs_hash,
            backend: self.name().to_string(),
        })
    }

    /// Pinata has no read API; content is fetched through the gateway.
    fn fetch(&self, cid: &str) -> Result<Vec<u8>, EvidenceError> {
        let url = gateway_url(&self.gateway, cid);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| map_transport_error(e, &self.gateway, self.timeout))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(EvidenceError::NotFound(cid.to_string()));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EvidenceError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response
            .bytes()
            .map_err(|e| EvidenceError::HttpClient(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "pinata"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_response_reads_ipfs_hash() {
        let r: PinResponse = serde_json::from_str(
            r#"{"IpfsHash":"bafkreixyz","PinSize":120,"Timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(r.ipfs_hash, "bafkreixyz");
    }

    #[test]
    fn unreachable_api_fails() {
        let store = PinataStore::new("http://127.0.0.1:9", "jwt", "http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        assert!(store.publish("bundle.json", b"{}").is_err());
    }
}
