use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, LedgerSummary};
use crate::ledger::LedgerError;

/// `GET /api/ledger`: contract address, network id and record count.
pub async fn summary(State(ctx): State<ApiContext>) -> Result<Json<LedgerSummary>, ApiError> {
    let expose = ctx.expose_error_details;
    let ledger = ctx.ledger.clone();
    tokio::task::spawn_blocking(move || -> Result<LedgerSummary, LedgerError> {
        Ok(LedgerSummary {
            contract_address: ledger.contract_address().to_string(),
            network_id: ledger.network_id()?,
            total_records: ledger.get_total_records()?,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Ledger task failed: {e}")))?
    .map(Json)
    .map_err(|e| ApiError::from_ledger(e, expose))
}
