//! Image preprocessing for handwritten/scanned complaint pages.
//!
//! Each step is a small pure function; `OcrPreprocessor` composes them:
//!
//! 1. Reject payloads too short to hold an image header
//! 2. Decode image
//! 3. Fix EXIF orientation (phone photos)
//! 4. Grayscale
//! 5. Contrast stretch (1st/99th percentile to full range)
//! 6. Unsharp mask
//! 7. Upscale to a minimum working width (never downscale)
//! 8. Encode PNG
//!
//! Preprocessing is best-effort: the extractor falls back to the original
//! bytes on any error returned from here.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageOutputFormat, Luma};
use tracing::debug;

use super::ExtractionError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Shortest payload worth handing to the decoder (a 1x1 PNG is 67 bytes).
/// Upper size limits are enforced at intake.
const MIN_DECODABLE_BYTES: usize = 67;

/// Upscaling stops here regardless of the configured working width.
const MAX_WORKING_WIDTH: u32 = 4096;

/// RMS contrast below which a page is flagged as washed out.
pub const POOR_CONTRAST_RMS: f32 = 25.0;

// ═══════════════════════════════════════════════════════════
// Interface
// ═══════════════════════════════════════════════════════════

/// Prepares an image for the OCR engine.
///
/// Pure image-to-image transform with no I/O.
pub trait ImagePreprocessor: Send + Sync {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError>;
}

/// Result of image preprocessing.
#[derive(Debug)]
pub struct PreparedImage {
    /// Grayscale PNG ready for recognition.
    pub png_bytes: Vec<u8>,
    pub original_width: u32,
    pub original_height: u32,
    pub width: u32,
    pub height: u32,
    /// RMS contrast of the grayscale page before stretching.
    pub contrast_before: f32,
}

/// Production preprocessor.
#[derive(Debug, Clone)]
pub struct OcrPreprocessor {
    /// Images narrower than this are upscaled to it.
    pub min_working_width: u32,
    /// Gaussian sigma for the unsharp mask.
    pub sharpen_sigma: f32,
    /// Minimum brightness difference the unsharp mask acts on.
    pub sharpen_threshold: i32,
}

impl Default for OcrPreprocessor {
    fn default() -> Self {
        Self {
            min_working_width: 1500,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
        }
    }
}

impl OcrPreprocessor {
    pub fn new(min_working_width: u32) -> Self {
        Self {
            min_working_width,
            ..Self::default()
        }
    }
}

impl ImagePreprocessor for OcrPreprocessor {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError> {
        check_decodable(image_bytes)?;

        let img = image::load_from_memory(image_bytes).map_err(|e| {
            ExtractionError::ImageProcessing(format!("Failed to decode image: {e}"))
        })?;
        let (orig_w, orig_h) = img.dimensions();

        let img = apply_orientation(img, read_exif_orientation(image_bytes));

        let mut gray = img.to_luma8();
        let contrast_before = compute_contrast_score(&gray);
        stretch_contrast(&mut gray);

        let sharpened =
            image::imageops::unsharpen(&gray, self.sharpen_sigma, self.sharpen_threshold);
        let working = upscale_to_width(sharpened, self.min_working_width);

        let (width, height) = working.dimensions();
        let png_bytes = encode_png(working)?;

        debug!(
            original = format!("{orig_w}x{orig_h}"),
            output = format!("{width}x{height}"),
            contrast_before,
            png_size = png_bytes.len(),
            "Image preprocessed for OCR"
        );

        Ok(PreparedImage {
            png_bytes,
            original_width: orig_w,
            original_height: orig_h,
            width,
            height,
            contrast_before,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Pure helper functions
// ═══════════════════════════════════════════════════════════

pub fn check_decodable(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.len() < MIN_DECODABLE_BYTES {
        return Err(ExtractionError::ImageProcessing(format!(
            "{} bytes is too short for an image",
            bytes.len()
        )));
    }
    Ok(())
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// RMS contrast: standard deviation of grayscale pixel intensities.
///
/// Range 0-127.5. Low contrast (< 25) indicates a washed-out scan.
pub fn compute_contrast_score(img: &GrayImage) -> f32 {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for pixel in img.pixels() {
        let val = pixel.0[0] as f64;
        sum += val;
        sum_sq += val * val;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - (mean * mean);
    variance.max(0.0).sqrt() as f32
}

/// Linear contrast stretch so the 1st percentile maps to 0 and the 99th to 255.
///
/// Percentiles instead of min/max keep a single speck of dust from pinning
/// the range. Uniform images are left untouched.
pub fn stretch_contrast(img: &mut GrayImage) {
    let mut histogram = [0u64; 256];
    for p in img.pixels() {
        histogram[p.0[0] as usize] += 1;
    }
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return;
    }

    let cut = total / 100;
    let low = percentile_bound(&histogram, cut, false);
    let high = percentile_bound(&histogram, cut, true);
    if high <= low {
        return;
    }

    let scale = 255.0 / (high - low) as f32;
    for p in img.pixels_mut() {
        let v = p.0[0].clamp(low, high);
        *p = Luma([((v - low) as f32 * scale).round() as u8]);
    }
}

fn percentile_bound(histogram: &[u64; 256], cut: u64, from_top: bool) -> u8 {
    let mut seen = 0u64;
    let indices: Box<dyn Iterator<Item = usize>> = if from_top {
        Box::new((0..256).rev())
    } else {
        Box::new(0..256)
    };
    for i in indices {
        seen += histogram[i];
        if seen > cut {
            return i as u8;
        }
    }
    if from_top {
        0
    } else {
        255
    }
}

/// Compute the upscaled size for a given minimum width. Never downscales.
pub fn compute_working_dimensions(width: u32, height: u32, min_width: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width.max(1), height.max(1));
    }
    let target = min_width.min(MAX_WORKING_WIDTH);
    if width >= target {
        return (width, height);
    }
    let scale = target as f32 / width as f32;
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    (target, new_h)
}

fn upscale_to_width(img: GrayImage, min_width: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    let (new_w, new_h) = compute_working_dimensions(w, h, min_width);
    if (new_w, new_h) == (w, h) {
        return img;
    }
    // CatmullRom: sharp text edges without Lanczos ringing.
    image::imageops::resize(&img, new_w, new_h, FilterType::CatmullRom)
}

/// Encode a grayscale image as PNG bytes.
pub fn encode_png(img: GrayImage) -> Result<Vec<u8>, ExtractionError> {
    let dynamic = DynamicImage::ImageLuma8(img);
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

// ═══════════════════════════════════════════════════════════
// Mock implementations (testing)
// ═══════════════════════════════════════════════════════════

/// Mock image preprocessor for testing.
pub struct MockImagePreprocessor {
    fail: bool,
}

impl MockImagePreprocessor {
    /// Passes the input through unchanged.
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePreprocessor for MockImagePreprocessor {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<PreparedImage, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::ImageProcessing(
                "Mock preprocessing failure".into(),
            ));
        }
        Ok(PreparedImage {
            png_bytes: image_bytes.to_vec(),
            original_width: 0,
            original_height: 0,
            width: 0,
            height: 0,
            contrast_before: 60.0,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
