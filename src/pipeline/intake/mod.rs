//! Submission intake: payload sniffing, size ceilings, claimant address
//! checks and content hashing. Everything here runs before the first
//! external call of a pipeline run.

pub mod format;
pub mod hash;
pub mod validate;

pub use format::*;
pub use hash::*;
pub use validate::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Missing {0} payload")]
    MissingPayload(&'static str),

    #[error("{field} too large: {size} bytes exceeds {max} byte limit")]
    PayloadTooLarge {
        field: &'static str,
        size: usize,
        max: usize,
    },

    #[error("Unsupported {field} format: {detail}")]
    UnsupportedFormat { field: &'static str, detail: String },

    #[error("Invalid claimant address: {0}")]
    InvalidAddress(String),
}
