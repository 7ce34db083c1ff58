//! Shared state and wire types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::ledger::{Ledger, LedgerRecord};
use crate::pipeline::processor::SubmissionProcessor;

/// Default page size for record listings.
pub const DEFAULT_PAGE_LIMIT: u64 = 20;
/// Largest page a client may request.
pub const MAX_PAGE_LIMIT: u64 = 100;
/// Allowance for multipart framing and the claimant field.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// ═══════════════════════════════════════════════════════════
// API context
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub processor: Arc<SubmissionProcessor>,
    /// The same ledger the processor writes through.
    pub ledger: Arc<dyn Ledger>,
    /// Bounds concurrent pipeline runs.
    pub permits: Arc<Semaphore>,
    pub expose_error_details: bool,
    /// Request body ceiling for submissions.
    pub body_limit: usize,
}

impl ApiContext {
    pub fn new(
        processor: Arc<SubmissionProcessor>,
        ledger: Arc<dyn Ledger>,
        max_concurrent_submissions: usize,
    ) -> Self {
        Self {
            processor,
            ledger,
            permits: Arc::new(Semaphore::new(max_concurrent_submissions.max(1))),
            expose_error_details: true,
            body_limit: crate::config::DEFAULT_MAX_IMAGE_BYTES
                + crate::config::DEFAULT_MAX_AUDIO_BYTES
                + MULTIPART_OVERHEAD_BYTES,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        processor: Arc<SubmissionProcessor>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            expose_error_details: config.expose_error_details(),
            body_limit: config.max_image_bytes + config.max_audio_bytes + MULTIPART_OVERHEAD_BYTES,
            ..Self::new(processor, ledger, config.max_concurrent_submissions)
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Request / response bodies
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct ListRecordsQuery {
    pub verified: Option<bool>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    pub records: Vec<LedgerRecord>,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimantRecords {
    pub claimant: String,
    pub record_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct VerificationDecision {
    pub verified: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoleMembership {
    pub claimant: bool,
    pub government: bool,
    pub admin: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub contract_address: String,
    pub network_id: u64,
    pub total_records: u64,
}
