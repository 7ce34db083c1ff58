//! Speech-to-text for the spoken statement.
//!
//! The provider is chosen once at startup (see `pipeline::strategy`): the
//! cloud recognizer when an API key is configured, otherwise the placeholder.
//! Per-call failures of the cloud recognizer are fatal for that submission.

pub mod types;
pub mod encoding;
pub mod cloud_speech;
pub mod placeholder;

pub use types::*;
pub use encoding::*;
pub use cloud_speech::*;
pub use placeholder::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Cannot connect to speech service at {0}")]
    Connection(String),

    #[error("Speech request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Speech service returned {status}: {body}")]
    ServiceError { status: u16, body: String },

    #[error("Failed to parse speech response: {0}")]
    ResponseParsing(String),

    #[error("Audio payload is empty")]
    EmptyAudio,
}
