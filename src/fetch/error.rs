//! Errors for result-page retrieval.

use thiserror::Error;

/// A result page that could not be retrieved.
///
/// [`Exhausted`](Self::Exhausted) and [`Fatal`](Self::Fatal) are local to one
/// page: the run records the page as failed and moves on. The other two
/// variants end the paging loop.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every allowed attempt failed with a retryable error.
    #[error("page {page} failed after {attempts} attempt(s): {reason}")]
    Exhausted {
        /// The page number.
        page: u32,
        /// Attempts made, including the first.
        attempts: u32,
        /// Reason reported by the last attempt.
        reason: String,
    },

    /// The server rejected the request with a 4xx status; not retried.
    #[error("page {page} rejected: {reason}")]
    Fatal {
        /// The page number.
        page: u32,
        /// Attempts made before giving up.
        attempts: u32,
        /// What the server answered.
        reason: String,
    },

    /// The interrupt flag was raised before the page completed.
    #[error("interrupted while fetching page {page}")]
    Interrupted {
        /// The page number.
        page: u32,
    },

    /// The keep-alive ping was answered with an auth rejection.
    #[error("session expired before page {page}: keep-alive returned HTTP {status}")]
    SessionExpired {
        /// The page about to be fetched.
        page: u32,
        /// The rejecting status (401 or 403).
        status: u16,
    },
}

impl FetchError {
    /// The page number this error concerns.
    #[must_use]
    pub fn page(&self) -> u32 {
        match self {
            Self::Exhausted { page, .. }
            | Self::Fatal { page, .. }
            | Self::Interrupted { page }
            | Self::SessionExpired { page, .. } => *page,
        }
    }

    /// Whether the run may continue with the next page.
    #[must_use]
    pub fn is_page_local(&self) -> bool {
        matches!(self, Self::Exhausted { .. } | Self::Fatal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_display_includes_attempts() {
        let error = FetchError::Exhausted {
            page: 2,
            attempts: 3,
            reason: "HTTP 503".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("page 2"), "Expected page in: {msg}");
        assert!(msg.contains("3 attempt"), "Expected attempts in: {msg}");
        assert!(msg.contains("HTTP 503"), "Expected reason in: {msg}");
    }

    #[test]
    fn test_page_local_classification() {
        assert!(
            FetchError::Fatal {
                page: 1,
                attempts: 1,
                reason: "HTTP 404".to_string()
            }
            .is_page_local()
        );
        assert!(!FetchError::Interrupted { page: 4 }.is_page_local());
        assert!(!FetchError::SessionExpired { page: 5, status: 401 }.is_page_local());
        assert_eq!(FetchError::SessionExpired { page: 5, status: 401 }.page(), 5);
    }
}
