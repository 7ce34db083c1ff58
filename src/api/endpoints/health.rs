//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::strategy::ProviderSelection;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub auto_approval_threshold: u8,
    pub providers: Vec<ProviderSelection>,
}

/// `GET /api/health`: liveness plus the provider each stage runs on.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let providers = ctx.processor.selections().to_vec();
    let status = if providers.iter().any(|p| p.degraded) {
        "degraded"
    } else {
        "ok"
    };

    Ok(Json(HealthResponse {
        status,
        name: crate::config::APP_NAME,
        version: crate::config::APP_VERSION,
        auto_approval_threshold: ctx.processor.auto_approval_threshold(),
        providers,
    }))
}
