//! Submission processing orchestrator.
//!
//! Drives one submission through
//! `Validating → Extracting → Transcribing → Scoring → Publishing →
//! Committing → AutoVerifying → Done`, with `Failed` reachable from every
//! non-terminal stage. Stages run strictly in order and are never retried
//! here. The submission's temporary directory is disposed on every exit.
//!
//! Uses trait-based DI for every external dependency so the orchestrator
//! stays fully testable with mock implementations.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::ledger::{Ledger, LedgerError};
use crate::pipeline::artifacts::SubmissionArtifacts;
use crate::pipeline::evidence::{canonical_bytes, EvidenceBundle, EvidenceError, EvidenceStore, BUNDLE_VERSION};
use crate::pipeline::extraction::{ExtractionError, TextExtractor};
use crate::pipeline::intake::{validate_submission, AudioFormat, IntakeError, IntakeLimits, SubmissionRequest};
use crate::pipeline::scoring::{AgreementScorer, ClassificationCode, ScoreMetrics, ScoringMethod};
use crate::pipeline::strategy::{select_providers, ProviderSelection, StrategyError};
use crate::pipeline::transcription::{Provider, SpeechTranscriber, TranscriptionError};

// ---------------------------------------------------------------------------
// Stages and cancellation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Validating,
    Extracting,
    Transcribing,
    Scoring,
    Publishing,
    Committing,
    AutoVerifying,
    Done,
    Failed,
}

/// Shared flag checked before each stage. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure taxonomy. The two `*Degraded` kinds never fail a submission;
/// they are reported in `SubmissionOutcome::degradations`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputRejected,
    ExtractionUnavailable,
    TranscriptionFailed,
    TranscriptionDegraded,
    ScoringDegraded,
    PublishFailed,
    LedgerWriteFailed,
    NotFound,
    Cancelled,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Submission rejected: {0}")]
    Intake(#[from] IntakeError),

    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Evidence publication failed: {0}")]
    Publish(#[from] EvidenceError),

    /// `record_id` is set when the record was created but auto-verification failed.
    #[error("Ledger write failed: {source}")]
    LedgerWrite {
        #[source]
        source: LedgerError,
        record_id: Option<u64>,
    },

    #[error("Temporary artifact error: {0}")]
    Artifacts(#[source] std::io::Error),

    #[error("Submission cancelled before {0:?}")]
    Cancelled(PipelineStage),

    #[error("Processor setup failed: {0}")]
    Setup(#[from] StrategyError),
}

impl ProcessingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::Intake(_) => ErrorKind::InputRejected,
            ProcessingError::Extraction(_) => ErrorKind::ExtractionUnavailable,
            ProcessingError::Transcription(_) => ErrorKind::TranscriptionFailed,
            ProcessingError::Publish(_) => ErrorKind::PublishFailed,
            ProcessingError::LedgerWrite { source, .. } => match source {
                LedgerError::NotFound(_) => ErrorKind::NotFound,
                _ => ErrorKind::LedgerWriteFailed,
            },
            ProcessingError::Cancelled(_) => ErrorKind::Cancelled,
            ProcessingError::Artifacts(_) | ProcessingError::Setup(_) => ErrorKind::Internal,
        }
    }

    /// Id of a record created before the failure, if any.
    pub fn record_id(&self) -> Option<u64> {
        match self {
            ProcessingError::LedgerWrite { record_id, .. } => *record_id,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A non-fatal condition the result was produced under.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Degradation {
    pub kind: ErrorKind,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub submission_id: String,
    pub record_id: u64,
    pub content_identifier: String,
    /// `ipfs://<cid>`
    pub storage_url: String,
    pub gateway_url: String,
    pub storage_backend: String,
    pub ledger_tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_tx_hash: Option<String>,
    pub extracted_text: String,
    pub extraction_confidence: f32,
    pub transcribed_text: String,
    pub transcription_confidence: f32,
    pub transcription_provider: Provider,
    pub similarity_score: u8,
    pub scoring_method: ScoringMethod,
    pub metrics: ScoreMetrics,
    pub verified: bool,
    pub classifications: Vec<ClassificationCode>,
    pub degradations: Vec<Degradation>,
    /// Stages entered, in order.
    pub stages: Vec<PipelineStage>,
    /// RFC 3339
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct SubmissionProcessor {
    extractor: Box<dyn TextExtractor>,
    transcriber: Box<dyn SpeechTranscriber>,
    scorer: AgreementScorer,
    store: Box<dyn EvidenceStore>,
    ledger: Arc<dyn Ledger>,
    limits: IntakeLimits,
    auto_approval_threshold: u8,
    artifact_root: Option<PathBuf>,
    selections: Vec<ProviderSelection>,
}

/// Ordered record of stage transitions for one submission.
struct StageTrace {
    stages: Vec<PipelineStage>,
    started: Instant,
}

impl StageTrace {
    fn new() -> Self {
        Self {
            stages: Vec::new(),
            started: Instant::now(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        tracing::info!(
            stage = ?stage,
            from = ?self.stages.last(),
            elapsed_ms = %self.started.elapsed().as_millis(),
            "Stage transition"
        );
        self.stages.push(stage);
    }

    /// Enter `stage` unless the submission was cancelled.
    fn advance(&mut self, stage: PipelineStage, cancel: &CancellationToken) -> Result<(), ProcessingError> {
        if cancel.is_cancelled() {
            return Err(ProcessingError::Cancelled(stage));
        }
        self.enter(stage);
        Ok(())
    }
}

impl SubmissionProcessor {
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        transcriber: Box<dyn SpeechTranscriber>,
        scorer: AgreementScorer,
        store: Box<dyn EvidenceStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            extractor,
            transcriber,
            scorer,
            store,
            ledger,
            limits: IntakeLimits::default(),
            auto_approval_threshold: crate::config::DEFAULT_AUTO_APPROVAL_THRESHOLD,
            artifact_root: None,
            selections: Vec::new(),
        }
    }

    pub fn with_limits(mut self, limits: IntakeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.auto_approval_threshold = threshold;
        self
    }

    /// Directory under which per-submission temp dirs are created.
    pub fn with_artifact_root(mut self, root: PathBuf) -> Self {
        self.artifact_root = Some(root);
        self
    }

    pub fn with_selections(mut self, selections: Vec<ProviderSelection>) -> Self {
        self.selections = selections;
        self
    }

    pub fn selections(&self) -> &[ProviderSelection] {
        &self.selections
    }

    pub fn auto_approval_threshold(&self) -> u8 {
        self.auto_approval_threshold
    }

    /// Run one submission to `Done` or `Failed`.
    pub fn process(
        &self,
        request: &SubmissionRequest,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome, ProcessingError> {
        let submission_id = Uuid::new_v4().to_string();
        let _span = tracing::info_span!("submission", submission_id = %submission_id).entered();
        let mut trace = StageTrace::new();

        let result = self.run(&submission_id, request, cancel, &mut trace);
        match &result {
            Ok(outcome) => tracing::info!(
                record_id = outcome.record_id,
                score = outcome.similarity_score,
                verified = outcome.verified,
                elapsed_ms = %trace.started.elapsed().as_millis(),
                "Submission complete"
            ),
            Err(e) => {
                let failed_in = trace.stages.last().copied();
                trace.enter(PipelineStage::Failed);
                tracing::warn!(
                    stage = ?failed_in,
                    kind = ?e.kind(),
                    record_id = ?e.record_id(),
                    error = %e,
                    "Submission failed"
                );
            }
        }
        result
    }

    fn run(
        &self,
        submission_id: &str,
        request: &SubmissionRequest,
        cancel: &CancellationToken,
        trace: &mut StageTrace,
    ) -> Result<SubmissionOutcome, ProcessingError> {
        trace.advance(PipelineStage::Validating, cancel)?;
        let formats = validate_submission(request, &self.limits)?;

        let artifacts = SubmissionArtifacts::create(self.artifact_root.as_deref(), submission_id)
            .map_err(ProcessingError::Artifacts)?;

        let result = self.run_with_artifacts(submission_id, request, formats.audio, &artifacts, cancel, trace);

        // Disposal problems are logged and never replace the stage result.
        let path = artifacts.path().to_path_buf();
        if let Err(e) = artifacts.dispose() {
            tracing::warn!(path = %path.display(), error = %e, "Failed to dispose submission artifacts");
        }
        result
    }

    fn run_with_artifacts(
        &self,
        submission_id: &str,
        request: &SubmissionRequest,
        audio_format: AudioFormat,
        artifacts: &SubmissionArtifacts,
        cancel: &CancellationToken,
        trace: &mut StageTrace,
    ) -> Result<SubmissionOutcome, ProcessingError> {
        artifacts
            .write("complaint.image", &request.image)
            .and_then(|_| artifacts.write(&format!("statement.{}", audio_format.extension()), &request.audio))
            .map_err(ProcessingError::Artifacts)?;

        let mut degradations = Vec::new();

        trace.advance(PipelineStage::Extracting, cancel)?;
        let extraction = self.extractor.extract(&request.image, artifacts.path())?;

        trace.advance(PipelineStage::Transcribing, cancel)?;
        let transcription = self.transcriber.transcribe(&request.audio, audio_format)?;
        if transcription.provider == Provider::Fallback {
            degradations.push(Degradation {
                kind: ErrorKind::TranscriptionDegraded,
                detail: format!("transcribed by {}", self.transcriber.name()),
            });
        }

        trace.advance(PipelineStage::Scoring, cancel)?;
        let agreement = self.scorer.score(&extraction.text, &transcription.text);
        if let Some(reason) = &agreement.fallback_reason {
            degradations.push(Degradation {
                kind: ErrorKind::ScoringDegraded,
                detail: reason.clone(),
            });
        }
        let meets_threshold = agreement.score >= self.auto_approval_threshold;
        let timestamp = chrono::Utc::now().to_rfc3339();

        trace.advance(PipelineStage::Publishing, cancel)?;
        let bundle = EvidenceBundle {
            version: BUNDLE_VERSION,
            submission_id: submission_id.to_string(),
            claimant: request.claimant.clone(),
            extracted_text: extraction.text.clone(),
            extraction_confidence: extraction.confidence,
            transcribed_text: transcription.text.clone(),
            transcription_confidence: transcription.confidence,
            transcription_provider: transcription.provider,
            image_hash: extraction.content_hash.clone(),
            audio_hash: transcription.content_hash.clone(),
            similarity_score: agreement.score,
            scoring_method: agreement.method,
            metrics: agreement.metrics,
            verified: meets_threshold,
            classifications: agreement.classifications.clone(),
            timestamp: timestamp.clone(),
        };
        let payload = canonical_bytes(&bundle)?;
        let published = self
            .store
            .publish(&format!("evidence-{submission_id}.json"), &payload)?;

        trace.advance(PipelineStage::Committing, cancel)?;
        let created = self
            .ledger
            .create_record(&published.cid, agreement.score)
            .map_err(|source| ProcessingError::LedgerWrite {
                source,
                record_id: None,
            })?;

        // No cancellation checks past this point: the record exists and the
        // auto-verify decision must follow it.
        let mut verified = created.auto_verified;
        let mut verification_tx_hash = None;
        if meets_threshold && !created.auto_verified {
            trace.enter(PipelineStage::AutoVerifying);
            let receipt = self
                .ledger
                .set_verified(created.record_id, true)
                .map_err(|source| ProcessingError::LedgerWrite {
                    source,
                    record_id: Some(created.record_id),
                })?;
            verified = receipt.verified;
            verification_tx_hash = Some(receipt.tx_hash);
        } else if created.auto_verified {
            tracing::info!(record_id = created.record_id, "Ledger verified record at creation");
        }
        trace.enter(PipelineStage::Done);

        Ok(SubmissionOutcome {
            submission_id: submission_id.to_string(),
            record_id: created.record_id,
            storage_url: format!("ipfs://{}", published.cid),
            content_identifier: published.cid,
            gateway_url: published.gateway_url,
            storage_backend: published.backend,
            ledger_tx_hash: created.tx_hash,
            verification_tx_hash,
            extracted_text: extraction.text,
            extraction_confidence: extraction.confidence,
            transcribed_text: transcription.text,
            transcription_confidence: transcription.confidence,
            transcription_provider: transcription.provider,
            similarity_score: agreement.score,
            scoring_method: agreement.method,
            metrics: agreement.metrics,
            verified,
            classifications: agreement.classifications,
            degradations,
            stages: trace.stages.clone(),
            timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build a `SubmissionProcessor` with production providers selected from
/// `config`. The ledger is shared with the read endpoints.
pub fn build_processor(config: &AppConfig, ledger: Arc<dyn Ledger>) -> Result<SubmissionProcessor, ProcessingError> {
    let providers = select_providers(config)?;
    Ok(SubmissionProcessor::new(
        Box::new(providers.extractor),
        providers.transcriber,
        providers.scorer,
        providers.store,
        ledger,
    )
    .with_limits(IntakeLimits {
        max_image_bytes: config.max_image_bytes,
        max_audio_bytes: config.max_audio_bytes,
    })
    .with_threshold(config.auto_approval_threshold)
    .with_selections(providers.selections))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerWrite, MemoryLedger};
    use crate::pipeline::evidence::{MemoryStore, PublishedEvidence};
    use crate::pipeline::extraction::{ImageTextExtractor, MockImagePreprocessor, MockOcrEngine};
    use crate::pipeline::transcription::{
        MockTranscriber, PlaceholderTranscriber, FALLBACK_CONFIDENCE_CEILING,
    };

    const CLAIMANT: &str = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4";

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            claimant: CLAIMANT.into(),
            image: vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3],
            image_name: Some("complaint.png".into()),
            audio: b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec(),
            audio_name: Some("statement.wav".into()),
            audio_mime: None,
        }
    }

    struct Harness {
        processor: SubmissionProcessor,
        ledger: Arc<MemoryLedger>,
        store: Arc<MemoryStore>,
        root: tempfile::TempDir,
    }

    impl Harness {
        fn root_is_empty(&self) -> bool {
            std::fs::read_dir(self.root.path()).unwrap().next().is_none()
        }
    }

    /// Lets a test inspect the store the processor owns.
    struct SharedStore(Arc<MemoryStore>);

    impl EvidenceStore for SharedStore {
        fn publish(&self, name: &str, payload: &[u8]) -> Result<PublishedEvidence, EvidenceError> {
            self.0.publish(name, payload)
        }
        fn fetch(&self, cid: &str) -> Result<Vec<u8>, EvidenceError> {
            self.0.fetch(cid)
        }
        fn name(&self) -> &str {
            self.0.name()
        }
    }

    fn harness(
        ocr: MockOcrEngine,
        transcriber: Box<dyn SpeechTranscriber>,
        store: MemoryStore,
        ledger: MemoryLedger,
    ) -> Harness {
        let ledger = Arc::new(ledger);
        let store = Arc::new(store);
        let root = tempfile::tempdir().unwrap();
        let extractor = ImageTextExtractor::new(Box::new(MockImagePreprocessor::new()), Arc::new(ocr));
        let processor = SubmissionProcessor::new(
            Box::new(extractor),
            transcriber,
            AgreementScorer::local(),
            Box::new(SharedStore(Arc::clone(&store))),
            ledger.clone(),
        )
        .with_artifact_root(root.path().to_path_buf());
        Harness {
            processor,
            ledger,
            store,
            root,
        }
    }

    fn matching() -> Harness {
        harness(
            MockOcrEngine::new("theft of motorcycle near main market", 92.0),
            Box::new(MockTranscriber::new("the theft of a motorcycle near the main market", 88.0)),
            MemoryStore::new(),
            MemoryLedger::default(),
        )
    }

    fn unrelated() -> Harness {
        harness(
            MockOcrEngine::new("assault by neighbor", 92.0),
            Box::new(MockTranscriber::new("weather report for tomorrow", 88.0)),
            MemoryStore::new(),
            MemoryLedger::default(),
        )
    }

    #[test]
    fn matching_statement_is_created_and_auto_verified() {
        let h = matching();
        let outcome = h.processor.process(&request(), &CancellationToken::new()).unwrap();

        assert!(outcome.similarity_score >= 80);
        assert!(outcome.verified);
        assert!(outcome.verification_tx_hash.is_some());
        assert_eq!(outcome.scoring_method, ScoringMethod::LocalEnsemble);
        assert_eq!(outcome.classifications[0].code, "379");
        assert_eq!(
            h.ledger.writes(),
            vec![
                LedgerWrite::Create {
                    content_identifier: outcome.content_identifier.clone(),
                    score: outcome.similarity_score,
                },
                LedgerWrite::SetVerified {
                    id: outcome.record_id,
                    verified: true
                },
            ]
        );
        assert_eq!(
            outcome.stages,
            vec![
                PipelineStage::Validating,
                PipelineStage::Extracting,
                PipelineStage::Transcribing,
                PipelineStage::Scoring,
                PipelineStage::Publishing,
                PipelineStage::Committing,
                PipelineStage::AutoVerifying,
                PipelineStage::Done,
            ]
        );
        assert_eq!(outcome.storage_url, format!("ipfs://{}", outcome.content_identifier));
        assert!(h.root_is_empty());
    }

    #[test]
    fn unrelated_statement_is_created_but_not_verified() {
        let h = unrelated();
        let outcome = h.processor.process(&request(), &CancellationToken::new()).unwrap();
        assert!(outcome.similarity_score < 75);
        assert!(!outcome.verified);
        assert!(outcome.verification_tx_hash.is_none());
        assert_eq!(h.ledger.writes().len(), 1);
        assert!(!outcome.stages.contains(&PipelineStage::AutoVerifying));
    }

    #[test]
    fn threshold_is_inclusive() {
        // Identical texts score 100; a threshold of 100 must still verify.
        let h = harness(
            MockOcrEngine::new("stolen bicycle", 90.0),
            Box::new(MockTranscriber::new("stolen bicycle", 90.0)),
            MemoryStore::new(),
            MemoryLedger::default(),
        );
        let processor = h.processor.with_threshold(100);
        let outcome = processor.process(&request(), &CancellationToken::new()).unwrap();
        assert_eq!(outcome.similarity_score, 100);
        assert!(outcome.verified);
    }

    #[test]
    fn identical_submissions_create_distinct_records() {
        let h = unrelated();
        let a = h.processor.process(&request(), &CancellationToken::new()).unwrap();
        let b = h.processor.process(&request(), &CancellationToken::new()).unwrap();
        assert_ne!(a.record_id, b.record_id);
        assert_eq!(h.ledger.get_total_records().unwrap(), 2);
    }

    #[test]
    fn published_bundle_round_trips() {
        let h = matching();
        let outcome = h.processor.process(&request(), &CancellationToken::new()).unwrap();
        let bytes = h.store.fetch(&outcome.content_identifier).unwrap();
        let bundle: EvidenceBundle = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(canonical_bytes(&bundle).unwrap(), bytes);
        assert_eq!(bundle.claimant, CLAIMANT);
        assert_eq!(bundle.similarity_score, outcome.similarity_score);
        assert_eq!(bundle.image_hash, crate::pipeline::intake::content_hash(&request().image));
    }

    #[test]
    fn ledger_claimant_is_the_service_account_not_the_submitter() {
        let h = matching();
        let outcome = h.processor.process(&request(), &CancellationToken::new()).unwrap();
        let record = h.ledger.get_record(outcome.record_id).unwrap();
        assert!(record.claimant.eq_ignore_ascii_case("0x70997970c51812dc3a010c7d01b50e0d17dc79c8"));
        assert!(h.ledger.get_records_for_claimant(CLAIMANT).unwrap().is_empty());

        let bytes = h.store.fetch(&outcome.content_identifier).unwrap();
        let bundle: EvidenceBundle = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(bundle.claimant, CLAIMANT);
    }

    #[test]
    fn publish_failure_writes_nothing_and_cleans_up() {
        let h = harness(
            MockOcrEngine::new("theft of motorcycle", 92.0),
            Box::new(MockTranscriber::new("theft of motorcycle", 90.0)),
            MemoryStore::failing(),
            MemoryLedger::default(),
        );
        let err = h.processor.process(&request(), &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PublishFailed);
        assert!(h.ledger.writes().is_empty());
        assert!(h.root_is_empty());
    }

    #[test]
    fn placeholder_transcription_still_completes() {
        let h = harness(
            MockOcrEngine::new("theft of motorcycle", 92.0),
            Box::new(PlaceholderTranscriber),
            MemoryStore::new(),
            MemoryLedger::default(),
        );
        let outcome = h.processor.process(&request(), &CancellationToken::new()).unwrap();
        assert_eq!(outcome.transcription_provider, Provider::Fallback);
        assert!(outcome.transcription_confidence <= FALLBACK_CONFIDENCE_CEILING);
        assert!(outcome
            .degradations
            .iter()
            .any(|d| d.kind == ErrorKind::TranscriptionDegraded));
        assert_eq!(h.ledger.writes().len(), 1);
        assert!(!outcome.verified);
    }

    #[test]
    fn ocr_unavailable_is_fatal() {
        let h = harness(
            MockOcrEngine::unavailable(),
            Box::new(MockTranscriber::new("anything", 90.0)),
            MemoryStore::new(),
            MemoryLedger::default(),
        );
        let err = h.processor.process(&request(), &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionUnavailable);
        assert_eq!(h.store.publish_count(), 0);
        assert!(h.ledger.writes().is_empty());
        assert!(h.root_is_empty());
    }

    #[test]
    fn transcription_call_failure_is_fatal() {
        let h = harness(
            MockOcrEngine::new("theft", 92.0),
            Box::new(MockTranscriber::failing()),
            MemoryStore::new(),
            MemoryLedger::default(),
        );
        let err = h.processor.process(&request(), &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TranscriptionFailed);
        assert!(h.root_is_empty());
    }

    #[test]
    fn invalid_request_rejected_before_any_artifact() {
        let h = matching();
        let mut req = request();
        req.claimant = "not-an-address".into();
        let err = h.processor.process(&req, &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputRejected);
        assert!(h.root_is_empty());
        assert!(h.ledger.writes().is_empty());
    }

    #[test]
    fn cancelled_submission_stops_and_cleans_up() {
        let h = matching();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = h.processor.process(&request(), &cancel).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(h.ledger.writes().is_empty());
        assert!(h.root_is_empty());
    }

    /// Cancels the submission from inside the extraction stage.
    struct CancellingExtractor(CancellationToken);

    impl TextExtractor for CancellingExtractor {
        fn extract(
            &self,
            image_bytes: &[u8],
            _workdir: &std::path::Path,
        ) -> Result<crate::pipeline::extraction::ExtractionResult, ExtractionError> {
            self.0.cancel();
            Ok(crate::pipeline::extraction::ExtractionResult {
                text: "theft of motorcycle".into(),
                confidence: 90.0,
                content_hash: crate::pipeline::intake::content_hash(image_bytes),
                preprocessed: false,
                word_count: 3,
                warnings: Vec::new(),
            })
        }
    }

    #[test]
    fn cancellation_during_extraction_stops_before_transcribing() {
        let cancel = CancellationToken::new();
        let ledger = Arc::new(MemoryLedger::default());
        let store = Arc::new(MemoryStore::new());
        let root = tempfile::tempdir().unwrap();
        let processor = SubmissionProcessor::new(
            Box::new(CancellingExtractor(cancel.clone())),
            Box::new(MockTranscriber::new("theft of motorcycle", 90.0)),
            AgreementScorer::local(),
            Box::new(SharedStore(Arc::clone(&store))),
            ledger.clone(),
        )
        .with_artifact_root(root.path().to_path_buf());
        let h = Harness {
            processor,
            ledger,
            store,
            root,
        };

        let err = h.processor.process(&request(), &cancel).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(matches!(err, ProcessingError::Cancelled(PipelineStage::Transcribing)));
        assert_eq!(h.store.publish_count(), 0);
        assert!(h.ledger.writes().is_empty());
        assert!(h.root_is_empty());
    }

    #[test]
    fn create_failure_never_attempts_verification() {
        let ledger = MemoryLedger::default();
        ledger.fail_writes(true);
        let h = harness(
            MockOcrEngine::new("theft of motorcycle", 92.0),
            Box::new(MockTranscriber::new("theft of motorcycle", 90.0)),
            MemoryStore::new(),
            ledger,
        );
        let err = h.processor.process(&request(), &CancellationToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerWriteFailed);
        assert_eq!(err.record_id(), None);
        assert!(h.ledger.writes().is_empty());
    }

    #[test]
    fn contract_side_verification_is_not_repeated() {
        let h = harness(
            MockOcrEngine::new("theft of motorcycle", 92.0),
            Box::new(MockTranscriber::new("theft of motorcycle", 90.0)),
            MemoryStore::new(),
            MemoryLedger::default().with_contract_auto_verify(75),
        );
        let outcome = h.processor.process(&request(), &CancellationToken::new()).unwrap();
        assert!(outcome.verified);
        assert!(outcome.verification_tx_hash.is_none());
        assert_eq!(h.ledger.writes().len(), 1);
    }

    #[test]
    fn error_kinds() {
        let e = ProcessingError::LedgerWrite {
            source: LedgerError::Timeout(std::time::Duration::from_secs(1)),
            record_id: Some(3),
        };
        assert_eq!(e.kind(), ErrorKind::LedgerWriteFailed);
        assert_eq!(e.record_id(), Some(3));
        assert_eq!(
            ProcessingError::Cancelled(PipelineStage::Scoring).kind(),
            ErrorKind::Cancelled
        );
    }
}
