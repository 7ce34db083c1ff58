use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use super::ensemble::{normalize_for_comparison, normalized_edit_distance};
use super::types::ScoreMetrics;
use super::ScoringError;
use crate::config::ScorerConfig;
use crate::pipeline::runner::run_with_timeout;

/// Similarity computed by an out-of-process script.
///
/// Invoked as `<interpreter> <script> <text_a> <text_b>`; the script prints
/// one JSON object `{similarity_score, jaccard, cosine, levenshtein}` with the
/// score in 0.0-1.0, or `{"error": ...}` with a non-zero exit.
#[derive(Debug, Clone)]
pub struct ExternalScorer {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalScore {
    pub score: u8,
    pub metrics: ScoreMetrics,
}

#[derive(Deserialize)]
struct ScriptOutput {
    similarity_score: Option<f64>,
    #[serde(default)]
    jaccard: f64,
    #[serde(default)]
    cosine: f64,
    /// Raw character distance.
    #[serde(default)]
    levenshtein: f64,
    error: Option<String>,
}

impl ExternalScorer {
    pub fn new(interpreter: &str, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            script: script.into(),
            timeout,
        }
    }

    /// `None` when no script is configured or the script file is missing.
    pub fn from_config(config: &ScorerConfig) -> Option<Self> {
        let script = config.script.as_ref()?;
        if !script.is_file() {
            tracing::warn!(script = %script.display(), "Scorer script not found, external scoring disabled");
            return None;
        }
        Some(Self::new(&config.interpreter, script.clone(), config.timeout))
    }

    pub fn score(&self, text_a: &str, text_b: &str) -> Result<ExternalScore, ScoringError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.script).arg(text_a).arg(text_b);

        let out = run_with_timeout(cmd, self.timeout)?;
        if !out.success {
            // The script reports usage errors as JSON on stdout before exiting 1.
            if let Ok(parsed) = serde_json::from_str::<ScriptOutput>(last_line(&out.stdout)) {
                if let Some(err) = parsed.error {
                    return Err(ScoringError::Reported(err));
                }
            }
            return Err(ScoringError::NonZeroExit {
                code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }

        parse_script_output(&out.stdout, text_a, text_b)
    }
}

fn last_line(stdout: &str) -> &str {
    stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// Parse the script's JSON line. The raw distance is rescaled to 0-100 of the
/// longer normalized input so metrics match the local ensemble's.
pub fn parse_script_output(
    stdout: &str,
    text_a: &str,
    text_b: &str,
) -> Result<ExternalScore, ScoringError> {
    let line = last_line(stdout);
    let parsed: ScriptOutput =
        serde_json::from_str(line).map_err(|e| ScoringError::InvalidOutput(e.to_string()))?;

    if let Some(err) = parsed.error {
        return Err(ScoringError::Reported(err));
    }
    let fraction = parsed
        .similarity_score
        .ok_or_else(|| ScoringError::InvalidOutput("missing similarity_score".into()))?;
    if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
        return Err(ScoringError::OutOfRange(fraction));
    }

    let na = normalize_for_comparison(text_a);
    let nb = normalize_for_comparison(text_b);
    let distance = parsed.levenshtein.max(0.0).round() as usize;

    Ok(ExternalScore {
        score: (fraction * 100.0).round().clamp(0.0, 100.0) as u8,
        metrics: ScoreMetrics {
            jaccard: parsed.jaccard.clamp(0.0, 1.0),
            cosine: parsed.cosine.clamp(0.0, 1.0),
            edit_distance: normalized_edit_distance(distance, &na, &nb),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_score_and_scales() {
        let out = r#"{"similarity_score": 0.8312, "jaccard": 0.76, "cosine": 0.83, "levenshtein": 10}"#;
        let s = parse_script_output(out, "abcdefghij", "abcdefghijklmnopqrst").unwrap();
        assert_eq!(s.score, 83);
        assert_eq!(s.metrics.jaccard, 0.76);
        assert_eq!(s.metrics.edit_distance, 50.0);
    }

    #[test]
    fn takes_last_non_empty_line() {
        let out = "warming up\n{\"similarity_score\": 1.0}\n\n";
        assert_eq!(parse_script_output(out, "a", "a").unwrap().score, 100);
    }

    #[test]
    fn error_key_is_reported() {
        let err = parse_script_output(r#"{"error":"Usage: ..."}"#, "a", "b").unwrap_err();
        assert!(matches!(err, ScoringError::Reported(_)));
    }

    #[test]
    fn out_of_range_rejected() {
        let err = parse_script_output(r#"{"similarity_score": 1.7}"#, "a", "b").unwrap_err();
        assert!(matches!(err, ScoringError::OutOfRange(_)));
    }

    #[test]
    fn garbage_rejected() {
        let err = parse_script_output("Traceback (most recent call last):", "a", "b").unwrap_err();
        assert!(matches!(err, ScoringError::InvalidOutput(_)));
    }

    #[test]
    fn missing_script_disables_external() {
        let config = ScorerConfig {
            interpreter: "python3".into(),
            script: Some(PathBuf::from("/nonexistent/similarity.py")),
            timeout: Duration::from_secs(1),
        };
        assert!(ExternalScorer::from_config(&config).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn runs_script_through_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("score.sh");
        std::fs::write(
            &script,
            "echo '{\"similarity_score\": 0.5, \"jaccard\": 0.5, \"cosine\": 0.5, \"levenshtein\": 0}'\n",
        )
        .unwrap();
        let scorer = ExternalScorer::new("sh", &script, Duration::from_secs(5));
        assert_eq!(scorer.score("x", "y").unwrap().score, 50);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_with_error_json() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "echo '{\"error\": \"bad input\"}'; exit 1\n").unwrap();
        let scorer = ExternalScorer::new("sh", &script, Duration::from_secs(5));
        match scorer.score("x", "y").unwrap_err() {
            ScoringError::Reported(msg) => assert_eq!(msg, "bad input"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
