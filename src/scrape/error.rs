//! Errors that end a run.

use thiserror::Error;

use super::writer::OutputError;
use crate::search::SubmissionError;
use crate::session::BootstrapError;

/// A run that produced no usable output, or whose output could not be saved.
///
/// Page-level failures, interrupts and session expiry are not errors here:
/// they are reflected in the returned run's status and statistics.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The handshake failed; no page work was done.
    #[error("session could not be established: {0}")]
    Bootstrap(#[from] BootstrapError),

    /// The search was rejected; no page work was done.
    #[error("search could not be submitted: {0}")]
    Submission(#[from] SubmissionError),

    /// Results were gathered but could not be written.
    #[error("failed to save results: {0}")]
    Output(#[from] OutputError),
}
