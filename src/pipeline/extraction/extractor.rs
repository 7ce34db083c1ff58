//! Text extraction from the complaint image: preprocess → recognize → normalize.

use std::path::Path;
use std::sync::Arc;

use super::preprocess::{ImagePreprocessor, POOR_CONTRAST_RMS};
use super::sanitize::normalize_recognized_text;
use super::types::{ExtractionResult, ExtractionWarning, OcrEngine, TextExtractor};
use super::ExtractionError;
use crate::pipeline::intake::content_hash;

/// Confidence (0-100) below which a warning is attached to the result.
const LOW_CONFIDENCE_THRESHOLD: f32 = 60.0;

/// Production extractor. There is no fallback engine: if `engine` cannot
/// be invoked the error propagates and the submission fails.
pub struct ImageTextExtractor {
    preprocessor: Box<dyn ImagePreprocessor>,
    engine: Arc<dyn OcrEngine>,
}

impl ImageTextExtractor {
    pub fn new(preprocessor: Box<dyn ImagePreprocessor>, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            preprocessor,
            engine,
        }
    }
}

impl TextExtractor for ImageTextExtractor {
    fn extract(&self, image_bytes: &[u8], workdir: &Path) -> Result<ExtractionResult, ExtractionError> {
        let content_hash = content_hash(image_bytes);
        let mut warnings = Vec::new();

        // Best-effort: any preprocessing failure falls back to the original bytes.
        let (ocr_input, preprocessed) = match self.preprocessor.preprocess(image_bytes) {
            Ok(prepared) => {
                if prepared.contrast_before < POOR_CONTRAST_RMS {
                    warnings.push(ExtractionWarning::PoorContrast {
                        rms: prepared.contrast_before,
                    });
                }
                (prepared.png_bytes, true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Preprocessing failed, recognizing original image");
                warnings.push(ExtractionWarning::PreprocessingSkipped {
                    reason: e.to_string(),
                });
                (image_bytes.to_vec(), false)
            }
        };

        let input_path = workdir.join(if preprocessed {
            "complaint.prepared.png"
        } else {
            "complaint.original"
        });
        std::fs::write(&input_path, &ocr_input)?;

        let page = self.engine.recognize(&input_path)?;
        let text = normalize_recognized_text(&page.text);
        let confidence = page.confidence.clamp(0.0, 100.0);

        if text.is_empty() {
            warnings.push(ExtractionWarning::NoTextFound);
        } else if confidence < LOW_CONFIDENCE_THRESHOLD {
            warnings.push(ExtractionWarning::LowConfidence { confidence });
        }

        tracing::info!(
            engine = self.engine.name(),
            preprocessed,
            confidence,
            text_len = text.len(),
            "Text extraction complete"
        );

        Ok(ExtractionResult {
            word_count: text.split_whitespace().count(),
            text,
            confidence,
            content_hash,
            preprocessed,
            warnings,
        })
    }
}
