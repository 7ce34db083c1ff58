use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::encoding::encoding_for;
use super::types::{Provider, SpeechTranscriber, TranscriptionResult};
use super::TranscriptionError;
use crate::config::SpeechConfig;
use crate::pipeline::extraction::normalize_recognized_text;
use crate::pipeline::intake::{content_hash, AudioFormat};

/// Google Cloud Speech-to-Text v1 (`speech:recognize`) over REST, authenticated
/// with an API key.
pub struct CloudSpeechTranscriber {
    endpoint: String,
    api_key: String,
    language_code: String,
    alternative_language_codes: Vec<String>,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl CloudSpeechTranscriber {
    pub fn new(config: &SpeechConfig, api_key: &str) -> Result<Self, TranscriptionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TranscriptionError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            language_code: config.language_code.clone(),
            alternative_language_codes: config.alternative_language_codes.clone(),
            client,
            timeout: config.timeout,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    alternative_language_codes: &'a [String],
    enable_automatic_punctuation: bool,
    model: &'a str,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<RecognitionAlternative>,
    pub language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionAlternative {
    #[serde(default)]
    pub transcript: String,
    /// 0.0-1.0; absent on some non-final results.
    pub confidence: Option<f32>,
}

/// Join the top alternative of every result. Returns (text, confidence 0-100,
/// language of the first result that reports one).
pub fn assemble_transcript(response: &RecognizeResponse) -> (String, f32, Option<String>) {
    let mut parts = Vec::new();
    let mut confidences = Vec::new();
    let mut language = None;

    for result in &response.results {
        let Some(top) = result.alternatives.first() else {
            continue;
        };
        let transcript = top.transcript.trim();
        if !transcript.is_empty() {
            parts.push(transcript.to_string());
        }
        if let Some(c) = top.confidence {
            confidences.push(c.clamp(0.0, 1.0));
        }
        if language.is_none() {
            language = result.language_code.clone();
        }
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32 * 100.0
    };

    (parts.join(" "), confidence, language)
}

impl SpeechTranscriber for CloudSpeechTranscriber {
    fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }
        let _span = tracing::info_span!("cloud_speech", format = ?format, bytes = audio.len()).entered();
        let start = std::time::Instant::now();

        let encoding = encoding_for(format);
        let mut warnings = Vec::new();
        if encoding.approximate {
            tracing::warn!(format = ?format, encoding = encoding.encoding, "No native encoding, sending best-effort");
            warnings.push(format!(
                "{} audio sent as {}; recognition may be degraded",
                format.extension(),
                encoding.encoding
            ));
        }

        let body = RecognizeRequest {
            config: RecognitionConfig {
                encoding: encoding.encoding,
                sample_rate_hertz: encoding.sample_rate_hertz,
                language_code: &self.language_code,
                alternative_language_codes: &self.alternative_language_codes,
                enable_automatic_punctuation: true,
                model: "default",
            },
            audio: RecognitionAudio {
                content: BASE64.encode(audio),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    TranscriptionError::Connection(self.endpoint.clone())
                } else if e.is_timeout() {
                    TranscriptionError::Timeout(self.timeout)
                } else {
                    TranscriptionError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TranscriptionError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RecognizeResponse = response
            .json()
            .map_err(|e| TranscriptionError::ResponseParsing(e.to_string()))?;

        let (raw_text, confidence, language_code) = assemble_transcript(&parsed);
        let text = normalize_recognized_text(&raw_text);

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            results = parsed.results.len(),
            confidence,
            language = language_code.as_deref().unwrap_or("unknown"),
            "Speech recognition complete"
        );

        Ok(TranscriptionResult {
            text,
            confidence,
            content_hash: content_hash(audio),
            provider: Provider::Primary,
            language_code,
            warnings,
        })
    }

    fn provider(&self) -> Provider {
        Provider::Primary
    }

    fn name(&self) -> &str {
        "google-speech-v1"
    }
}
