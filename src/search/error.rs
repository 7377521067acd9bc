//! Errors raised while submitting a search.

use thiserror::Error;

use crate::portal::PortalError;

/// The search could not be submitted; the run cannot continue.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Submission was attempted before the handshake completed.
    #[error("cannot submit search: session is not established")]
    SessionNotEstablished,

    /// The search endpoint answered with a status of 400 or above.
    #[error("search submission failed: HTTP {status}")]
    UnexpectedStatus {
        /// The HTTP status code received.
        status: u16,
    },

    /// The search request never produced a response.
    #[error("search submission failed: {0}")]
    Transport(#[source] PortalError),

    /// The interrupt flag was raised while the search was in flight.
    #[error("search submission interrupted")]
    Interrupted,
}
