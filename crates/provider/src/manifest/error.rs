//! Manifest coordination errors.
//!
//! [`ManifestError`] is the only error type that crosses the coordinator
//! boundary, always delivered on the submitting request's own response
//! channel — never through a side channel.

use thiserror::Error;

use dcm_common::validation::{ValidationError, VerificationError};

/// Outcome of a manifest submission, as seen by the submitter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// The coordinator is shutting down or has stopped; the submission was
    /// not processed and will not be retried.
    #[error("manifest coordinator is not running")]
    NotRunning,

    /// The manifest does not fit the deployment's groups.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The submission failed authenticity or version checks.
    #[error(transparent)]
    Verification(#[from] VerificationError),
}
