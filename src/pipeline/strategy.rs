//! Provider selection per pipeline stage.
//!
//! Each stage has a primary provider and at most one fallback, chosen once
//! at startup from configuration and availability:
//!
//! | Stage         | Primary            | Fallback                         |
//! |---------------|--------------------|----------------------------------|
//! | Extraction    | Tesseract CLI      | none (failure is fatal)          |
//! | Transcription | Cloud Speech v1    | placeholder (no API key)         |
//! | Scoring       | external script    | local ensemble (per call)        |
//! | Storage       | IPFS node          | Pinata (per call, if JWT set)    |

use std::sync::Arc;

use serde::Serialize;

use crate::config::{AppConfig, ScorerConfig, SpeechConfig, StorageConfig};
use crate::pipeline::evidence::{EvidenceError, EvidenceStore, FallbackStore, IpfsNodeStore, PinataStore};
use crate::pipeline::extraction::{ImageTextExtractor, OcrPreprocessor, TesseractCli};
use crate::pipeline::scoring::{AgreementScorer, ExternalScorer};
use crate::pipeline::transcription::{
    CloudSpeechTranscriber, PlaceholderTranscriber, SpeechTranscriber, TranscriptionError,
};

/// Which provider a stage will use, reported by the health endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSelection {
    pub stage: &'static str,
    pub active: String,
    pub fallback: Option<String>,
    /// The stage runs on its fallback from the start.
    pub degraded: bool,
}

/// Providers built from configuration.
pub struct Providers {
    pub extractor: ImageTextExtractor,
    pub transcriber: Box<dyn SpeechTranscriber>,
    pub scorer: AgreementScorer,
    pub store: Box<dyn EvidenceStore>,
    pub selections: Vec<ProviderSelection>,
}

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("Speech provider setup failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Storage provider setup failed: {0}")]
    Storage(#[from] EvidenceError),
}

pub fn select_providers(config: &AppConfig) -> Result<Providers, StrategyError> {
    let (extractor, ocr_selection) = select_extractor(config);
    let (transcriber, stt_selection) = select_transcriber(&config.speech)?;
    let (scorer, scorer_selection) = select_scorer(&config.scorer);
    let (store, storage_selection) = select_store(&config.storage)?;

    let selections = vec![ocr_selection, stt_selection, scorer_selection, storage_selection];
    for s in &selections {
        tracing::info!(
            stage = s.stage,
            active = %s.active,
            fallback = s.fallback.as_deref().unwrap_or("none"),
            degraded = s.degraded,
            "Provider selected"
        );
    }

    Ok(Providers {
        extractor,
        transcriber,
        scorer,
        store,
        selections,
    })
}

/// OCR has no fallback. A failed probe is logged and the engine kept, so
/// every extraction fails with `ExtractionUnavailable` rather than the
/// service refusing to start.
pub fn select_extractor(config: &AppConfig) -> (ImageTextExtractor, ProviderSelection) {
    let engine = TesseractCli::new(&config.ocr.tesseract_bin, &config.ocr.languages, config.ocr.timeout);
    let active = match engine.probe() {
        Ok(version) => {
            tracing::info!(version = %version, "Tesseract available");
            format!("tesseract ({version})")
        }
        Err(e) => {
            tracing::error!(error = %e, bin = %config.ocr.tesseract_bin.display(), "Tesseract probe failed, extraction will fail");
            "tesseract (unavailable)".to_string()
        }
    };
    let degraded = active.ends_with("(unavailable)");
    let extractor = ImageTextExtractor::new(
        Box::new(OcrPreprocessor::new(config.ocr.min_working_width)),
        Arc::new(engine),
    );
    (
        extractor,
        ProviderSelection {
            stage: "extraction",
            active,
            fallback: None,
            degraded,
        },
    )
}

pub fn select_transcriber(
    config: &SpeechConfig,
) -> Result<(Box<dyn SpeechTranscriber>, ProviderSelection), TranscriptionError> {
    match config.api_key.as_deref() {
        Some(key) => Ok((
            Box::new(CloudSpeechTranscriber::new(config, key)?),
            ProviderSelection {
                stage: "transcription",
                active: "google-speech-v1".into(),
                fallback: None,
                degraded: false,
            },
        )),
        None => {
            tracing::warn!("No speech API key configured, transcriptions will be placeholders");
            Ok((
                Box::new(PlaceholderTranscriber),
                ProviderSelection {
                    stage: "transcription",
                    active: "placeholder".into(),
                    fallback: None,
                    degraded: true,
                },
            ))
        }
    }
}

pub fn select_scorer(config: &ScorerConfig) -> (AgreementScorer, ProviderSelection) {
    match ExternalScorer::from_config(config) {
        Some(external) => (
            AgreementScorer::new(Some(external)),
            ProviderSelection {
                stage: "scoring",
                active: "external".into(),
                fallback: Some("local_ensemble".into()),
                degraded: false,
            },
        ),
        None => (
            AgreementScorer::local(),
            ProviderSelection {
                stage: "scoring",
                active: "local_ensemble".into(),
                fallback: None,
                degraded: config.script.is_some(),
            },
        ),
    }
}

pub fn select_store(
    config: &StorageConfig,
) -> Result<(Box<dyn EvidenceStore>, ProviderSelection), EvidenceError> {
    let primary = IpfsNodeStore::new(&config.ipfs_api_url, &config.gateway_url, config.timeout)?;
    let secondary: Option<Box<dyn EvidenceStore>> = match config.pinata_jwt.as_deref() {
        Some(jwt) => Some(Box::new(PinataStore::new(
            &config.pinata_api_url,
            jwt,
            &config.gateway_url,
            config.timeout,
        )?)),
        None => None,
    };
    let selection = ProviderSelection {
        stage: "storage",
        active: "ipfs-node".into(),
        fallback: secondary.as_ref().map(|s| s.name().to_string()),
        degraded: false,
    };
    Ok((Box::new(FallbackStore::new(Box::new(primary), secondary)), selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn no_api_key_selects_placeholder() {
        let config = AppConfig::default();
        let (transcriber, selection) = select_transcriber(&config.speech).unwrap();
        assert_eq!(transcriber.name(), "placeholder");
        assert!(selection.degraded);
    }

    #[test]
    fn api_key_selects_cloud() {
        let mut config = AppConfig::default();
        config.speech.api_key = Some("key".into());
        let (transcriber, selection) = select_transcriber(&config.speech).unwrap();
        assert_eq!(transcriber.name(), "google-speech-v1");
        assert!(!selection.degraded);
    }

    #[test]
    fn missing_script_degrades_to_local() {
        let config = ScorerConfig {
            interpreter: "python3".into(),
            script: Some(PathBuf::from("/nonexistent/similarity_calculator.py")),
            timeout: Duration::from_secs(1),
        };
        let (scorer, selection) = select_scorer(&config);
        assert!(!scorer.has_external());
        assert_eq!(selection.active, "local_ensemble");
        assert!(selection.degraded);
    }

    #[test]
    fn pinata_fallback_only_with_jwt() {
        let mut config = AppConfig::default();
        let (_, without) = select_store(&config.storage).unwrap();
        assert!(without.fallback.is_none());

        config.storage.pinata_jwt = Some("jwt".into());
        let (_, with) = select_store(&config.storage).unwrap();
        assert_eq!(with.fallback.as_deref(), Some("pinata"));
    }

    #[test]
    fn missing_tesseract_is_reported_not_fatal() {
        let mut config = AppConfig::default();
        config.ocr.tesseract_bin = PathBuf::from("/nonexistent/tesseract");
        let (_, selection) = select_extractor(&config);
        assert!(selection.degraded);
        assert!(selection.fallback.is_none());
    }
}
