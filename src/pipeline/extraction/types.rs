use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Text recovered from the complaint image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Normalized recognized text.
    pub text: String,
    /// Mean word confidence, 0-100.
    pub confidence: f32,
    /// SHA-256 of the original (unprocessed) image bytes.
    pub content_hash: String,
    /// Whether recognition ran on the preprocessed image or the original.
    pub preprocessed: bool,
    pub word_count: usize,
    pub warnings: Vec<ExtractionWarning>,
}

/// Warnings about extraction quality
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    LowConfidence { confidence: f32 },
    PoorContrast { rms: f32 },
    PreprocessingSkipped { reason: String },
    NoTextFound,
}

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// 0-100
    pub confidence: f32,
    pub word_confidences: Vec<OcrWordResult>,
}

/// A single recognized word with its confidence (0-100).
#[derive(Debug, Clone)]
pub struct OcrWordResult {
    pub text: String,
    pub confidence: f32,
}

/// OCR engine abstraction (allows mocking for tests).
///
/// Engines read from a file so the input lives in the submission's
/// temporary directory and is disposed with it.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image_path: &Path) -> Result<OcrPageResult, ExtractionError>;

    /// Engine identifier for logs and health output.
    fn name(&self) -> &str;
}

/// Main extraction trait used by the pipeline orchestrator.
pub trait TextExtractor: Send + Sync {
    /// Extract text from `image_bytes`, using `workdir` for any temporary
    /// files. The caller owns `workdir` and removes it afterwards.
    fn extract(&self, image_bytes: &[u8], workdir: &Path) -> Result<ExtractionResult, ExtractionError>;
}
