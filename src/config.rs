//! Service configuration.
//!
//! Compile-time constants plus `AppConfig`, read once at startup from
//! `CLAIMCHECK_*` environment variables. Every field has a default so a bare
//! `claimcheck` binary starts against local services (Kubo on :5001, an EVM
//! dev node on :8545) with the placeholder transcriber.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Claimcheck";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Score (0-100) at or above which a record is verified without human review.
pub const DEFAULT_AUTO_APPROVAL_THRESHOLD: u8 = 75;

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Default filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "claimcheck=info,claimcheck_lib=info,tower_http=warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Deployment environment. Controls whether failure details reach callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    Development,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub auto_approval_threshold: u8,
    pub max_image_bytes: usize,
    pub max_audio_bytes: usize,
    pub max_concurrent_submissions: usize,
    pub ocr: OcrConfig,
    pub speech: SpeechConfig,
    pub scorer: ScorerConfig,
    pub storage: StorageConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub tesseract_bin: PathBuf,
    pub languages: String,
    pub min_working_width: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Cloud Speech API key. `None` selects the placeholder transcriber.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub language_code: String,
    pub alternative_language_codes: Vec<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub interpreter: String,
    /// Path to the similarity script. `None` disables the external scorer.
    pub script: Option<PathBuf>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub ipfs_api_url: String,
    pub pinata_api_url: String,
    /// Pinata JWT. `None` disables the managed pinning fallback.
    pub pinata_jwt: Option<String>,
    pub gateway_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub claimant_account: String,
    pub government_account: String,
    pub rpc_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            environment: Environment::Development,
            auto_approval_threshold: DEFAULT_AUTO_APPROVAL_THRESHOLD,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_audio_bytes: DEFAULT_MAX_AUDIO_BYTES,
            max_concurrent_submissions: 4,
            ocr: OcrConfig {
                tesseract_bin: PathBuf::from("tesseract"),
                languages: "eng".into(),
                min_working_width: 1500,
                timeout: Duration::from_secs(60),
            },
            speech: SpeechConfig {
                api_key: None,
                endpoint: "https://speech.googleapis.com/v1/speech:recognize".into(),
                language_code: "en-IN".into(),
                alternative_language_codes: ["hi-IN", "ta-IN", "te-IN", "bn-IN", "mr-IN"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                timeout: Duration::from_secs(90),
            },
            scorer: ScorerConfig {
                interpreter: "python3".into(),
                script: None,
                timeout: Duration::from_secs(20),
            },
            storage: StorageConfig {
                ipfs_api_url: "http://127.0.0.1:5001".into(),
                pinata_api_url: "https://api.pinata.cloud".into(),
                pinata_jwt: None,
                gateway_url: "https://ipfs.io".into(),
                timeout: Duration::from_secs(30),
            },
            ledger: LedgerConfig {
                rpc_url: "http://127.0.0.1:8545".into(),
                contract_address: "0x0000000000000000000000000000000000000000".into(),
                claimant_account: "0x0000000000000000000000000000000000000000".into(),
                government_account: "0x0000000000000000000000000000000000000000".into(),
                rpc_timeout: Duration::from_secs(15),
                confirmation_timeout: Duration::from_secs(120),
                poll_interval: Duration::from_millis(1000),
            },
        }
    }
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CLAIMCHECK_BIND_ADDR") {
            cfg.bind_addr = parse("CLAIMCHECK_BIND_ADDR", &v)?;
        }
        if let Some(v) = get("CLAIMCHECK_ENV") {
            cfg.environment = match v.to_ascii_lowercase().as_str() {
                "production" | "prod" => Environment::Production,
                "development" | "dev" | "test" => Environment::Development,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "CLAIMCHECK_ENV",
                        reason: format!("unknown environment '{other}'"),
                    })
                }
            };
        }
        if let Some(v) = get("CLAIMCHECK_AUTO_APPROVAL_THRESHOLD") {
            let threshold: u8 = parse("CLAIMCHECK_AUTO_APPROVAL_THRESHOLD", &v)?;
            if threshold > 100 {
                return Err(ConfigError::InvalidValue {
                    key: "CLAIMCHECK_AUTO_APPROVAL_THRESHOLD",
                    reason: "must be within 0-100".into(),
                });
            }
            cfg.auto_approval_threshold = threshold;
        }
        if let Some(v) = get("CLAIMCHECK_MAX_IMAGE_BYTES") {
            cfg.max_image_bytes = parse("CLAIMCHECK_MAX_IMAGE_BYTES", &v)?;
        }
        if let Some(v) = get("CLAIMCHECK_MAX_AUDIO_BYTES") {
            cfg.max_audio_bytes = parse("CLAIMCHECK_MAX_AUDIO_BYTES", &v)?;
        }
        if let Some(v) = get("CLAIMCHECK_MAX_CONCURRENT_SUBMISSIONS") {
            let n: usize = parse("CLAIMCHECK_MAX_CONCURRENT_SUBMISSIONS", &v)?;
            cfg.max_concurrent_submissions = n.max(1);
        }

        // OCR
        if let Some(v) = get("CLAIMCHECK_TESSERACT_BIN") {
            cfg.ocr.tesseract_bin = PathBuf::from(v);
        }
        if let Some(v) = get("CLAIMCHECK_OCR_LANGUAGES") {
            cfg.ocr.languages = v;
        }
        if let Some(v) = get("CLAIMCHECK_OCR_MIN_WIDTH") {
            cfg.ocr.min_working_width = parse("CLAIMCHECK_OCR_MIN_WIDTH", &v)?;
        }
        if let Some(v) = get("CLAIMCHECK_OCR_TIMEOUT_SECS") {
            cfg.ocr.timeout = secs("CLAIMCHECK_OCR_TIMEOUT_SECS", &v)?;
        }

        // Speech
        cfg.speech.api_key = get("CLAIMCHECK_SPEECH_API_KEY");
        if let Some(v) = get("CLAIMCHECK_SPEECH_ENDPOINT") {
            cfg.speech.endpoint = v;
        }
        if let Some(v) = get("CLAIMCHECK_SPEECH_LANGUAGE") {
            cfg.speech.language_code = v;
        }
        if let Some(v) = get("CLAIMCHECK_SPEECH_ALT_LANGUAGES") {
            cfg.speech.alternative_language_codes = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("CLAIMCHECK_SPEECH_TIMEOUT_SECS") {
            cfg.speech.timeout = secs("CLAIMCHECK_SPEECH_TIMEOUT_SECS", &v)?;
        }

        // Scorer
        if let Some(v) = get("CLAIMCHECK_SCORER_INTERPRETER") {
            cfg.scorer.interpreter = v;
        }
        cfg.scorer.script = get("CLAIMCHECK_SCORER_SCRIPT").map(PathBuf::from);
        if let Some(v) = get("CLAIMCHECK_SCORER_TIMEOUT_SECS") {
            cfg.scorer.timeout = secs("CLAIMCHECK_SCORER_TIMEOUT_SECS", &v)?;
        }

        // Storage
        if let Some(v) = get("CLAIMCHECK_IPFS_API_URL") {
            cfg.storage.ipfs_api_url = v;
        }
        if let Some(v) = get("CLAIMCHECK_PINATA_API_URL") {
            cfg.storage.pinata_api_url = v;
        }
        cfg.storage.pinata_jwt = get("CLAIMCHECK_PINATA_JWT");
        if let Some(v) = get("CLAIMCHECK_IPFS_GATEWAY") {
            cfg.storage.gateway_url = v;
        }
        if let Some(v) = get("CLAIMCHECK_STORAGE_TIMEOUT_SECS") {
            cfg.storage.timeout = secs("CLAIMCHECK_STORAGE_TIMEOUT_SECS", &v)?;
        }

        // Ledger
        if let Some(v) = get("CLAIMCHECK_RPC_URL") {
            cfg.ledger.rpc_url = v;
        }
        if let Some(v) = get("CLAIMCHECK_CONTRACT_ADDRESS") {
            cfg.ledger.contract_address = v;
        }
        if let Some(v) = get("CLAIMCHECK_CLAIMANT_ACCOUNT") {
            cfg.ledger.claimant_account = v;
        }
        if let Some(v) = get("CLAIMCHECK_GOVERNMENT_ACCOUNT") {
            cfg.ledger.government_account = v;
        }
        if let Some(v) = get("CLAIMCHECK_RPC_TIMEOUT_SECS") {
            cfg.ledger.rpc_timeout = secs("CLAIMCHECK_RPC_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("CLAIMCHECK_CONFIRMATION_TIMEOUT_SECS") {
            cfg.ledger.confirmation_timeout = secs("CLAIMCHECK_CONFIRMATION_TIMEOUT_SECS", &v)?;
        }

        Ok(cfg)
    }

    /// Failure details are only shown to callers outside production.
    pub fn expose_error_details(&self) -> bool {
        self.environment != Environment::Production
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
        })
}

fn secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let n: u64 = parse(key, value)?;
    if n == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "timeout must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.auto_approval_threshold, 75);
        assert!(cfg.speech.api_key.is_none());
        assert!(cfg.scorer.script.is_none());
        assert!(cfg.storage.pinata_jwt.is_none());
        assert_eq!(cfg.environment, Environment::Development);
        assert!(cfg.expose_error_details());
    }

    #[test]
    fn reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("CLAIMCHECK_ENV", "production"),
            ("CLAIMCHECK_AUTO_APPROVAL_THRESHOLD", "80"),
            ("CLAIMCHECK_SPEECH_API_KEY", "key-123"),
            ("CLAIMCHECK_SPEECH_ALT_LANGUAGES", "hi-IN, ta-IN"),
            ("CLAIMCHECK_OCR_TIMEOUT_SECS", "5"),
            ("CLAIMCHECK_BIND_ADDR", "0.0.0.0:9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.auto_approval_threshold, 80);
        assert_eq!(cfg.speech.api_key.as_deref(), Some("key-123"));
        assert_eq!(cfg.speech.alternative_language_codes, vec!["hi-IN", "ta-IN"]);
        assert_eq!(cfg.ocr.timeout, Duration::from_secs(5));
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert!(!cfg.expose_error_details());
    }

    #[test]
    fn blank_values_are_ignored() {
        let cfg = AppConfig::from_lookup(lookup(&[("CLAIMCHECK_SPEECH_API_KEY", "  ")])).unwrap();
        assert!(cfg.speech.api_key.is_none());
    }

    #[test]
    fn rejects_threshold_above_100() {
        let err = AppConfig::from_lookup(lookup(&[("CLAIMCHECK_AUTO_APPROVAL_THRESHOLD", "101")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLAIMCHECK_AUTO_APPROVAL_THRESHOLD"));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(AppConfig::from_lookup(lookup(&[("CLAIMCHECK_SCORER_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn rejects_unknown_environment() {
        assert!(AppConfig::from_lookup(lookup(&[("CLAIMCHECK_ENV", "staging")])).is_err());
    }
}
