//! Agreement scoring between the extracted and transcribed texts.
//!
//! `AgreementScorer` tries the external similarity process when one is
//! configured and falls back to the deterministic local ensemble on any
//! failure. Scoring itself never fails a submission.

pub mod types;
pub mod ensemble;
pub mod external;
pub mod classify;
pub mod scorer;

pub use types::*;
pub use ensemble::*;
pub use external::*;
pub use classify::*;
pub use scorer::*;

use thiserror::Error;

use crate::pipeline::runner::RunnerError;

/// Failures of the external scoring process. Always recoverable: the
/// caller falls back to the local ensemble.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error(transparent)]
    Process(#[from] RunnerError),

    #[error("Scorer exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Scorer reported an error: {0}")]
    Reported(String),

    #[error("Unparsable scorer output: {0}")]
    InvalidOutput(String),

    #[error("Scorer returned out-of-range score {0}")]
    OutOfRange(f64),
}
