use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    External,
    LocalEnsemble,
}

/// Component metrics behind a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreMetrics {
    /// 0.0-1.0
    pub jaccard: f64,
    /// 0.0-1.0
    pub cosine: f64,
    /// Character edit distance as a percentage of the longer text, 0-100.
    pub edit_distance: f64,
}

/// Offence classification matched by keyword in the complaint text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationCode {
    /// Statutory section, e.g. `"379"` or `"IT Act 66"`.
    pub code: String,
    pub offence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementResult {
    /// 0-100
    pub score: u8,
    pub method: ScoringMethod,
    pub metrics: ScoreMetrics,
    /// Auxiliary metadata. Never feeds into `score`.
    pub classifications: Vec<ClassificationCode>,
    /// Why the external scorer was bypassed, when it was configured but failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}
