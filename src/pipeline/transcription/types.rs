use serde::{Deserialize, Serialize};

use super::TranscriptionError;
use crate::pipeline::intake::AudioFormat;

/// Which strategy produced a stage result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Primary,
    Fallback,
}

/// Text recovered from the spoken statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    /// 0-100
    pub confidence: f32,
    /// SHA-256 of the raw audio bytes.
    pub content_hash: String,
    pub provider: Provider,
    /// Language the recognizer settled on, when it reports one.
    pub language_code: Option<String>,
    pub warnings: Vec<String>,
}

/// Speech recognizer abstraction (allows mocking for tests).
pub trait SpeechTranscriber: Send + Sync {
    fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> Result<TranscriptionResult, TranscriptionError>;

    fn provider(&self) -> Provider;

    /// Provider identifier for logs and health output.
    fn name(&self) -> &str;
}
