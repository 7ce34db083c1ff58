use super::types::{Provider, SpeechTranscriber, TranscriptionResult};
use super::TranscriptionError;
use crate::pipeline::extraction::normalize_recognized_text;
use crate::pipeline::intake::{content_hash, AudioFormat};

/// Returned verbatim, not through `normalize_recognized_text`. The brackets
/// fall outside the recognized-text punctuation set, so the marker can never
/// be mistaken for normalized speech.
pub const PLACEHOLDER_TRANSCRIPT: &str =
    "[transcription unavailable: speech provider not configured]";
pub const PLACEHOLDER_CONFIDENCE: f32 = 10.0;

/// Upper bound on the confidence any fallback transcriber may report.
pub const FALLBACK_CONFIDENCE_CEILING: f32 = 50.0;

/// Used when no speech provider is configured. Lets the pipeline complete
/// with a clearly marked, low-confidence transcript.
#[derive(Debug, Default)]
pub struct PlaceholderTranscriber;

impl SpeechTranscriber for PlaceholderTranscriber {
    fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        tracing::warn!(format = ?format, "Speech provider not configured, using placeholder transcript");
        Ok(TranscriptionResult {
            text: PLACEHOLDER_TRANSCRIPT.to_string(),
            confidence: PLACEHOLDER_CONFIDENCE.min(FALLBACK_CONFIDENCE_CEILING),
            content_hash: content_hash(audio),
            provider: Provider::Fallback,
            language_code: None,
            warnings: vec!["speech provider not configured".into()],
        })
    }

    fn provider(&self) -> Provider {
        Provider::Fallback
    }

    fn name(&self) -> &str {
        "placeholder"
    }
}

// ═══════════════════════════════════════════════════════════
// Mock implementations (testing)
// ═══════════════════════════════════════════════════════════

/// Mock transcriber returning a fixed transcript, or failing every call.
pub struct MockTranscriber {
    text: String,
    confidence: f32,
    fail: bool,
}

impl MockTranscriber {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            fail: true,
        }
    }
}

impl SpeechTranscriber for MockTranscriber {
    fn transcribe(
        &self,
        audio: &[u8],
        _format: AudioFormat,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        if self.fail {
            return Err(TranscriptionError::ServiceError {
                status: 503,
                body: "mock outage".into(),
            });
        }
        Ok(TranscriptionResult {
            text: normalize_recognized_text(&self.text),
            confidence: self.confidence,
            content_hash: content_hash(audio),
            provider: Provider::Primary,
            language_code: Some("en-IN".into()),
            warnings: Vec::new(),
        })
    }

    fn provider(&self) -> Provider {
        Provider::Primary
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_marked_fallback_with_capped_confidence() {
        let result = PlaceholderTranscriber.transcribe(b"OggS-audio", AudioFormat::Ogg).unwrap();
        assert_eq!(result.provider, Provider::Fallback);
        assert_eq!(result.text, PLACEHOLDER_TRANSCRIPT);
        assert!(result.confidence <= FALLBACK_CONFIDENCE_CEILING);
        assert_eq!(result.content_hash, content_hash(b"OggS-audio"));
    }

    #[test]
    fn placeholder_marker_is_not_normalized() {
        let result = PlaceholderTranscriber.transcribe(b"RIFF", AudioFormat::Wav).unwrap();
        assert!(result.text.starts_with('[') && result.text.ends_with(']'));
        assert_ne!(normalize_recognized_text(&result.text), result.text);
    }

    #[test]
    fn mock_normalizes_text() {
        let result = MockTranscriber::new("hello   world .", 88.0)
            .transcribe(b"a", AudioFormat::Wav)
            .unwrap();
        assert_eq!(result.text, "hello world.");
        assert_eq!(result.provider, Provider::Primary);
    }
}
