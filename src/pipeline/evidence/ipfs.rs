use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

use super::store::{gateway_url, EvidenceStore, PublishedEvidence};
use super::{map_transport_error, EvidenceError};

/// Kubo (go-ipfs) node via its HTTP RPC API.
pub struct IpfsNodeStore {
    api_url: String,
    gateway: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

impl IpfsNodeStore {
    pub fn new(api_url: &str, gateway: &str, timeout: Duration) -> Result<Self, EvidenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EvidenceError::HttpClient(e.to_string()))?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            gateway: gateway.to_string(),
            client,
            timeout,
        })
    }
}

impl EvidenceStore for IpfsNodeStore {
    fn publish(&self, name: &str, payload: &[u8]) -> Result<PublishedEvidence, EvidenceError> {
        let url = format!("{}/api/v0/add", self.api_url);
        let form = Form::new().part(
            "file",
            Part::bytes(payload.to_vec()).file_name(name.to_string()),
        );

        let response = self
            .client
            .post(&url)
            .query(&[("pin", "true"), ("cid-version", "1")])
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

        let parsed: AddResponse = response
            .json()
            .map_err(|e| EvidenceError::ResponseParsing(e.to_string()))?;

        tracing::info!(cid = %parsed.hash, bytes = payload.len(), "Pinned evidence on IPFS node");
        Ok(PublishedEvidence {
            gateway_url: gateway_url(&self.gateway, &parsed.hash),
            cid: parsed.hash,
            backend: self.name().to_string(),
        })
    }

    fn fetch(&self, cid: &str) -> Result<Vec<u8>, EvidenceError> {
        let url = format!("{}/api/v0/cat", self.api_url);
        let response = self
            .client
            .post(&url)
            .query(&[("arg", cid)])
            .send()
            .map_err(|e| map_transport_error(e, &self.api_url, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            // Kubo answers 500 with "no link named" / "not found" for unknown CIDs.
            if body.contains("not found") || body.contains("invalid path") {
                return Err(EvidenceError::NotFound(cid.to_string()));
            }
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
        "ipfs-node"
    }
}
