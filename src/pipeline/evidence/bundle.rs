use serde::{Deserialize, Serialize};

use super::EvidenceError;
use crate::pipeline::scoring::{ClassificationCode, ScoreMetrics, ScoringMethod};
use crate::pipeline::transcription::Provider;

/// Bundle layout version. Bump when fields change meaning.
pub const BUNDLE_VERSION: u32 = 1;

/// Everything needed to re-examine a verification decision later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceBundle {
    pub version: u32,
    pub submission_id: String,
    pub claimant: String,
    pub extracted_text: String,
    pub extraction_confidence: f32,
    pub transcribed_text: String,
    pub transcription_confidence: f32,
    pub transcription_provider: Provider,
    /// SHA-256 of the original image bytes.
    pub image_hash: String,
    /// SHA-256 of the raw audio bytes.
    pub audio_hash: String,
    pub similarity_score: u8,
    pub scoring_method: ScoringMethod,
    pub metrics: ScoreMetrics,
    /// Whether the score met the auto-approval threshold when the bundle was built.
    pub verified: bool,
    pub classifications: Vec<ClassificationCode>,
    /// RFC 3339
    pub timestamp: String,
}

/// Deterministic serialization: keys sorted at every level, no whitespace.
pub fn canonical_bytes(bundle: &EvidenceBundle) -> Result<Vec<u8>, EvidenceError> {
    // serde_json::Map is a BTreeMap, so going through Value sorts keys.
    let value = serde_json::to_value(bundle)?;
    Ok(serde_json::to_vec(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> EvidenceBundle {
        EvidenceBundle {
            version: BUNDLE_VERSION,
            submission_id: "sub-1".into(),
            claimant: "0x1111111111111111111111111111111111111111".into(),
            extracted_text: "theft of motorcycle".into(),
            extraction_confidence: 91.0,
            transcribed_text: "the theft of a motorcycle".into(),
            transcription_confidence: 88.0,
            transcription_provider: Provider::Primary,
            image_hash: "aa".into(),
            audio_hash: "bb".into(),
            similarity_score: 96,
            scoring_method: ScoringMethod::LocalEnsemble,
            metrics: ScoreMetrics {
                jaccard: 1.0,
                cosine: 1.0,
                edit_distance: 21.0,
            },
            verified: true,
            classifications: vec![],
            timestamp: "2026-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn keys_are_sorted() {
        let bytes = canonical_bytes(&sample_bundle()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let audio = text.find("\"audio_hash\"").unwrap();
        let claimant = text.find("\"claimant\"").unwrap();
        let version = text.find("\"version\"").unwrap();
        assert!(audio < claimant && claimant < version);
        assert!(!text.contains('\n'));
    }

    #[test]
    fn serialization_is_stable() {
        let b = sample_bundle();
        assert_eq!(canonical_bytes(&b).unwrap(), canonical_bytes(&b.clone()).unwrap());
    }

    #[test]
    fn enums_serialize_snake_case() {
        let v: serde_json::Value =
            serde_json::from_slice(&canonical_bytes(&sample_bundle()).unwrap()).unwrap();
        assert_eq!(v["scoring_method"], "local_ensemble");
        assert_eq!(v["transcription_provider"], "primary");
        assert_eq!(v["metrics"]["editDistance"], 21.0);
    }
}
