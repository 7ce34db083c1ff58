//! Ledger record endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{
    ApiContext, ListRecordsQuery, RecordPage, VerificationDecision, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use crate::ledger::{LedgerError, LedgerRecord, VerifyReceipt};

/// `GET /api/records?verified=&limit=&offset=`
///
/// With `verified` set, pages through the ledger's status index. Without
/// it, pages through ids in creation order (ids are dense from 1).
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<RecordPage>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    let offset = query.offset.unwrap_or(0);
    let expose = ctx.expose_error_details;
    let ledger = ctx.ledger.clone();

    let records = tokio::task::spawn_blocking(move || -> Result<Vec<LedgerRecord>, LedgerError> {
        let ids: Vec<u64> = match query.verified {
            Some(verified) => ledger.get_records_by_status(verified, limit, offset)?,
            None => {
                let total = ledger.get_total_records()?;
                (offset.saturating_add(1)..=total).take(limit as usize).collect()
            }
        };
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match ledger.get_record(id) {
                Ok(record) => records.push(record),
                Err(LedgerError::NotFound(_)) => tracing::warn!(id, "Listed record id not found"),
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Ledger task failed: {e}")))?
    .map_err(|e| ApiError::from_ledger(e, expose))?;

    Ok(Json(RecordPage {
        records,
        limit,
        offset,
    }))
}

/// `GET /api/records/:id`
pub async fn detail(State(ctx): State<ApiContext>, Path(id): Path<u64>) -> Result<Json<LedgerRecord>, ApiError> {
    let expose = ctx.expose_error_details;
    let ledger = ctx.ledger.clone();
    tokio::task::spawn_blocking(move || ledger.get_record(id))
        .await
        .map_err(|e| ApiError::Internal(format!("Ledger task failed: {e}")))?
        .map(Json)
        .map_err(|e| ApiError::from_ledger(e, expose))
}

/// `POST /api/records/:id/verification`, a government-role decision.
pub async fn decide(
    State(ctx): State<ApiContext>,
    Path(id): Path<u64>,
    Json(decision): Json<VerificationDecision>,
) -> Result<Json<VerifyReceipt>, ApiError> {
    let expose = ctx.expose_error_details;
    let ledger = ctx.ledger.clone();
    let receipt = tokio::task::spawn_blocking(move || ledger.set_verified(id, decision.verified))
        .await
        .map_err(|e| ApiError::Internal(format!("Ledger task failed: {e}")))?
        .map_err(|e| ApiError::from_ledger(e, expose))?;

    tracing::info!(record_id = id, verified = receipt.verified, tx = %receipt.tx_hash, "Verification decision recorded");
    Ok(Json(receipt))
}
