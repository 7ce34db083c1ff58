//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = ctx.body_limit;

    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/submissions", post(endpoints::submissions::create))
        .route("/records", get(endpoints::records::list))
        .route("/records/:id", get(endpoints::records::detail))
        .route("/records/:id/verification", post(endpoints::records::decide))
        .route("/claimants/:address/records", get(endpoints::claimants::records))
        .route("/roles/:address", get(endpoints::roles::membership))
        .route("/ledger", get(endpoints::ledger::summary))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive());

    Router::new().nest("/api", routes)
}
