use super::store::{EvidenceStore, PublishedEvidence};
use super::EvidenceError;

/// Primary store with an optional secondary tried on any primary failure.
pub struct FallbackStore {
    primary: Box<dyn EvidenceStore>,
    secondary: Option<Box<dyn EvidenceStore>>,
}

impl FallbackStore {
    pub fn new(primary: Box<dyn EvidenceStore>, secondary: Option<Box<dyn EvidenceStore>>) -> Self {
        Self { primary, secondary }
    }

    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }
}

impl EvidenceStore for FallbackStore {
    fn publish(&self, name: &str, payload: &[u8]) -> Result<PublishedEvidence, EvidenceError> {
        let primary_err = match self.primary.publish(name, payload) {
            Ok(published) => return Ok(published),
            Err(e) => e,
        };

        let Some(secondary) = &self.secondary else {
            return Err(EvidenceError::AllBackendsFailed {
                primary: primary_err.to_string(),
                secondary: None,
            });
        };

        tracing::warn!(
            primary = self.primary.name(),
            secondary = secondary.name(),
            error = %primary_err,
            "Primary storage failed, trying secondary"
        );
        secondary
            .publish(name, payload)
            .map_err(|e| EvidenceError::AllBackendsFailed {
                primary: primary_err.to_string(),
                secondary: Some(e.to_string()),
            })
    }

    fn fetch(&self, cid: &str) -> Result<Vec<u8>, EvidenceError> {
        match (self.primary.fetch(cid), &self.secondary) {
            (Ok(bytes), _) => Ok(bytes),
            (Err(e), None) => Err(e),
            (Err(e), Some(secondary)) => {
                tracing::debug!(error = %e, "Primary fetch failed, trying secondary");
                secondary.fetch(cid)
            }
        }
    }

    fn name(&self) -> &str {
        "fallback"
    }
}
