use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ClaimantRecords};
use crate::pipeline::intake::validate_claimant_address;

/// `GET /api/claimants/:address/records`
pub async fn records(
    State(ctx): State<ApiContext>,
    Path(address): Path<String>,
) -> Result<Json<ClaimantRecords>, ApiError> {
    validate_claimant_address(&address).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let expose = ctx.expose_error_details;
    let ledger = ctx.ledger.clone();
    let lookup = address.clone();
    let record_ids = tokio::task::spawn_blocking(move || ledger.get_records_for_claimant(&lookup))
        .await
        .map_err(|e| ApiError::Internal(format!("Ledger task failed: {e}")))?
        .map_err(|e| ApiError::from_ledger(e, expose))?;

    Ok(Json(ClaimantRecords {
        claimant: address,
        record_ids,
    }))
}
