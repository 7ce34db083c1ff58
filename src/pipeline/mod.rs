pub mod intake;
pub mod runner;
pub mod extraction;
pub mod transcription;
pub mod scoring;
pub mod evidence;
pub mod strategy; // Provider selection per stage
pub mod artifacts;
pub mod processor; // Submission orchestrator
