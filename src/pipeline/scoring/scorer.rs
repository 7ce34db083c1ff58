use super::classify::classify_offence;
use super::ensemble::ensemble_score;
use super::external::ExternalScorer;
use super::types::{AgreementResult, ScoringMethod};

/// External scorer when configured, local ensemble otherwise or on failure.
pub struct AgreementScorer {
    external: Option<ExternalScorer>,
}

impl AgreementScorer {
    pub fn new(external: Option<ExternalScorer>) -> Self {
        Self { external }
    }

    /// Local ensemble only.
    pub fn local() -> Self {
        Self { external: None }
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    /// Score agreement between the extracted and transcribed text.
    /// Classification runs over the extracted text only.
    pub fn score(&self, extracted: &str, transcribed: &str) -> AgreementResult {
        let classifications = classify_offence(extracted);

        let mut fallback_reason = None;
        if let Some(external) = &self.external {
            match external.score(extracted, transcribed) {
                Ok(s) => {
                    tracing::debug!(score = s.score, "External scorer succeeded");
                    return AgreementResult {
                        score: s.score,
                        method: ScoringMethod::External,
                        metrics: s.metrics,
                        classifications,
                        fallback_reason: None,
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "External scorer failed, using local ensemble");
                    fallback_reason = Some(e.to_string());
                }
            }
        }

        let (score, metrics) = ensemble_score(extracted, transcribed);
        AgreementResult {
            score,
            method: ScoringMethod::LocalEnsemble,
            metrics,
            classifications,
            fallback_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn local_scorer_uses_ensemble() {
        let r = AgreementScorer::local().score("theft of motorcycle", "theft of motorcycle");
        assert_eq!(r.method, ScoringMethod::LocalEnsemble);
        assert_eq!(r.score, 100);
        assert!(r.fallback_reason.is_none());
        assert_eq!(r.classifications[0].code, "379");
    }

    #[test]
    fn failing_external_falls_back() {
        let external = ExternalScorer::new(
            "/nonexistent/interpreter",
            "/nonexistent/script.py",
            Duration::from_secs(1),
        );
        let r = AgreementScorer::new(Some(external)).score("assault by neighbor", "assault by neighbor");
        assert_eq!(r.method, ScoringMethod::LocalEnsemble);
        assert_eq!(r.score, 100);
        assert!(r.fallback_reason.is_some());
    }

    #[test]
    fn classification_never_changes_score() {
        let scorer = AgreementScorer::local();
        let with = scorer.score("murder and theft reported", "weather report");
        let without = scorer.score("margin and thirst reported", "weather report");
        assert!(!with.classifications.is_empty());
        assert!(without.classifications.is_empty());
        assert_eq!(with.metrics.jaccard, without.metrics.jaccard);
    }
}
