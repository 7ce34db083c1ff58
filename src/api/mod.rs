//! HTTP API.
//!
//! `api_router()` returns a composable `Router` with every route nested
//! under `/api/`. Submissions run the blocking pipeline on Tokio's blocking
//! pool; record reads and verification decisions go straight to the ledger.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::serve;
pub use types::ApiContext;
