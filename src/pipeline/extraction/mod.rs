pub mod types;
pub mod sanitize;
pub mod preprocess;
pub mod ocr;
pub mod extractor;

pub use types::*;
pub use sanitize::*;
pub use preprocess::*;
pub use ocr::*;
pub use extractor::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR engine cannot be invoked: {0}")]
    EngineUnavailable(String),

    #[error("OCR engine timed out after {0:?}")]
    EngineTimeout(Duration),

    #[error("OCR engine failed (exit code {code:?}): {stderr}")]
    EngineFailed { code: Option<i32>, stderr: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),
}
