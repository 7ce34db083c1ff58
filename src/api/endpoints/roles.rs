use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RoleMembership};
use crate::ledger::{LedgerError, Role};
use crate::pipeline::intake::validate_claimant_address;

/// `GET /api/roles/:address`
pub async fn membership(
    State(ctx): State<ApiContext>,
    Path(address): Path<String>,
) -> Result<Json<RoleMembership>, ApiError> {
    validate_claimant_address(&address).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let expose = ctx.expose_error_details;
    let ledger = ctx.ledger.clone();
    tokio::task::spawn_blocking(move || -> Result<RoleMembership, LedgerError> {
        Ok(RoleMembership {
            claimant: ledger.has_role(Role::Claimant, &address)?,
            government: ledger.has_role(Role::Government, &address)?,
            admin: ledger.has_role(Role::Admin, &address)?,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Ledger task failed: {e}")))?
    .map(Json)
    .map_err(|e| ApiError::from_ledger(e, expose))
}
