//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::ledger::LedgerError;
use crate::pipeline::processor::{ErrorKind, ProcessingError};

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Set when a ledger record was created before the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<u64>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A failed pipeline run. `detail` is the full error text; it only
    /// reaches the client when `expose` is set.
    #[error("{detail}")]
    Pipeline {
        kind: ErrorKind,
        detail: String,
        record_id: Option<u64>,
        expose: bool,
    },

    /// A failed ledger read or verification decision.
    #[error("Ledger unavailable: {detail}")]
    Ledger { detail: String, expose: bool },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn from_processing(err: ProcessingError, expose: bool) -> Self {
        ApiError::Pipeline {
            kind: err.kind(),
            detail: err.to_string(),
            record_id: err.record_id(),
            expose,
        }
    }

    pub fn from_ledger(err: LedgerError, expose: bool) -> Self {
        match err {
            LedgerError::NotFound(id) => ApiError::NotFound(format!("Record {id} not found")),
            LedgerError::InvalidArgument(detail) => ApiError::BadRequest(detail),
            other => ApiError::Ledger {
                detail: other.to_string(),
                expose,
            },
        }
    }
}

/// Status, code and client-safe message for a pipeline failure kind.
fn classify(kind: ErrorKind) -> (StatusCode, &'static str, &'static str) {
    match kind {
        ErrorKind::InputRejected => (StatusCode::BAD_REQUEST, "INPUT_REJECTED", "Submission rejected"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "Record not found"),
        ErrorKind::ExtractionUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "EXTRACTION_UNAVAILABLE",
            "Text extraction is unavailable",
        ),
        ErrorKind::TranscriptionFailed => (
            StatusCode::BAD_GATEWAY,
            "TRANSCRIPTION_FAILED",
            "Speech transcription failed",
        ),
        ErrorKind::PublishFailed => (
            StatusCode::BAD_GATEWAY,
            "PUBLISH_FAILED",
            "Evidence could not be published",
        ),
        ErrorKind::LedgerWriteFailed => (
            StatusCode::BAD_GATEWAY,
            "LEDGER_WRITE_FAILED",
            "Ledger transaction failed",
        ),
        ErrorKind::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            "CANCELLED",
            "Submission was cancelled",
        ),
        ErrorKind::TranscriptionDegraded | ErrorKind::ScoringDegraded | ErrorKind::Internal => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "An internal error occurred",
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, record_id) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Pipeline {
                kind,
                detail,
                record_id,
                expose,
            } => {
                let (status, code, generic) = classify(kind);
                if status.is_server_error() {
                    tracing::error!(code, detail = %detail, record_id = ?record_id, "Submission failed");
                }
                // Input problems are the caller's to fix, so they always get the detail.
                let message = if expose || kind == ErrorKind::InputRejected {
                    detail
                } else {
                    generic.to_string()
                };
                (status, code, message, record_id)
            }
            ApiError::Ledger { detail, expose } => {
                tracing::error!(detail = %detail, "Ledger request failed");
                let message = if expose {
                    detail
                } else {
                    "Ledger request failed".to_string()
                };
                (StatusCode::BAD_GATEWAY, "LEDGER_UNAVAILABLE", message, None)
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                record_id,
            },
        };
        (status, Json(body)).into_response()
    }
}
