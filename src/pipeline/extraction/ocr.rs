use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::types::{OcrEngine, OcrPageResult, OcrWordResult};
use super::ExtractionError;
use crate::pipeline::runner::{run_with_timeout, RunnerError};

/// Tesseract OCR driven through its command-line binary.
///
/// Runs `tesseract <image> stdout -l <langs> tsv` and reads per-word
/// confidences from the TSV output.
pub struct TesseractCli {
    binary: PathBuf,
    languages: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, languages: &str, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.to_string(),
            timeout,
        }
    }

    /// Check that the binary can be invoked. Returns the first line of
    /// `tesseract --version`.
    pub fn probe(&self) -> Result<String, ExtractionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--version");
        let out = run_with_timeout(cmd, self.timeout).map_err(map_runner_error)?;
        if !out.success {
            return Err(ExtractionError::EngineFailed {
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        // Older releases print the banner on stderr.
        let banner = if out.stdout.trim().is_empty() {
            out.stderr
        } else {
            out.stdout
        };
        Ok(banner.lines().next().unwrap_or("tesseract").trim().to_string())
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image_path: &Path) -> Result<OcrPageResult, ExtractionError> {
        let _span = tracing::info_span!(
            "tesseract",
            langs = %self.languages,
            image = %image_path.display(),
        )
        .entered();
        let start = std::time::Instant::now();

        let mut cmd = Command::new(&self.binary);
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("tsv");

        let out = run_with_timeout(cmd, self.timeout).map_err(map_runner_error)?;
        if !out.success {
            return Err(ExtractionError::EngineFailed {
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }

        let page = parse_tsv_page(&out.stdout);

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            words = page.word_confidences.len(),
            confidence = page.confidence,
            "Tesseract recognition complete"
        );

        Ok(page)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

fn map_runner_error(err: RunnerError) -> ExtractionError {
    match err {
        RunnerError::TimedOut { timeout, .. } => ExtractionError::EngineTimeout(timeout),
        other => ExtractionError::EngineUnavailable(other.to_string()),
    }
}

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    pub text: String,
    pub confidence: f32,
    fail: bool,
}

impl MockOcrEngine {
    pub fn new(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            fail: false,
        }
    }

    /// Engine that behaves like a missing binary.
    pub fn unavailable() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            fail: true,
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, image_path: &Path) -> Result<OcrPageResult, ExtractionError> {
        if self.fail {
            return Err(ExtractionError::EngineUnavailable(
                "mock engine not installed".into(),
            ));
        }
        if !image_path.exists() {
            return Err(ExtractionError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} missing", image_path.display()),
            )));
        }

        let word_confidences = self
            .text
            .split_whitespace()
            .map(|w| OcrWordResult {
                text: w.to_string(),
                confidence: self.confidence,
            })
            .collect();

        Ok(OcrPageResult {
            text: self.text.clone(),
            confidence: self.confidence,
            word_confidences,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Parse Tesseract TSV output into page text and per-word confidence.
///
/// TSV columns: level page_num block_num par_num line_num word_num left top width height conf text
/// Level 5 = individual word entries. Words sharing (block, par, line) are
/// joined with spaces; lines are joined with newlines. Page confidence is the
/// mean over words Tesseract could score (conf >= 0).
pub fn parse_tsv_page(tsv: &str) -> OcrPageResult {
    let mut lines: Vec<((u32, u32, u32), Vec<String>)> = Vec::new();
    let mut words = Vec::new();
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0usize;

    for line in tsv.lines().skip(1) {
        // Skip header row
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = match fields[0].parse() {
            Ok(l) => l,
            Err(_) => continue,
        };
        if level != 5 {
            continue;
        }

        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        // Tesseract returns -1 for words it can't assign confidence to
        let conf: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        let confidence = conf.clamp(0.0, 100.0);
        if conf >= 0.0 {
            conf_sum += confidence;
            conf_count += 1;
        }

        let key: (u32, u32, u32) = (
            fields[2].parse().unwrap_or(0),
            fields[3].parse().unwrap_or(0),
            fields[4].parse().unwrap_or(0),
        );
        match lines.last_mut() {
            Some((k, ws)) if *k == key => ws.push(word.to_string()),
            _ => lines.push((key, vec![word.to_string()])),
        }

        words.push(OcrWordResult {
            text: word.to_string(),
            confidence,
        });
    }

    let text = lines
        .iter()
        .map(|(_, ws)| ws.join(" "))
        .collect::<Vec<_>>()
        .join("\n");

    let confidence = if conf_count == 0 {
        0.0
    } else {
        conf_sum / conf_count as f32
    };

    OcrPageResult {
        text,
        confidence,
        word_confidences: words,
    }
}
