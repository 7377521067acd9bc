//! Errors raised while establishing a portal session.

use thiserror::Error;

use super::bootstrap::BootstrapStep;
use crate::portal::PortalError;

/// The disclaimer handshake failed; the run cannot continue.
///
/// There is no retry at this layer: a partially completed handshake leaves
/// server-side state that cannot be resumed safely.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A handshake step answered with a status of 400 or above.
    #[error("session handshake failed at {step}: HTTP {status}")]
    UnexpectedStatus {
        /// The step that failed.
        step: BootstrapStep,
        /// The HTTP status code received.
        status: u16,
    },

    /// The disclaimer page did not set the session cookie.
    #[error("session handshake failed at {step}: no {cookie} cookie received")]
    MissingSessionCookie {
        /// The step expected to set the cookie.
        step: BootstrapStep,
        /// Name of the missing cookie.
        cookie: &'static str,
    },

    /// A handshake request never produced a response.
    #[error("session handshake failed at {step}: {source}")]
    Transport {
        /// The step that failed.
        step: BootstrapStep,
        /// The underlying transport error.
        #[source]
        source: PortalError,
    },

    /// The interrupt flag was raised before the handshake finished.
    #[error("session handshake interrupted at {step}")]
    Interrupted {
        /// The step in progress or just completed.
        step: BootstrapStep,
    },
}

impl BootstrapError {
    /// Returns the handshake step that failed.
    #[must_use]
    pub fn step(&self) -> BootstrapStep {
        match self {
            Self::UnexpectedStatus { step, .. }
            | Self::MissingSessionCookie { step, .. }
            | Self::Transport { step, .. }
            | Self::Interrupted { step } => *step,
        }
    }

    /// Whether the handshake stopped because of an interrupt.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }

    /// Returns the HTTP status for status failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_display_names_step_and_status() {
        let error = BootstrapError::UnexpectedStatus {
            step: BootstrapStep::HomeActions,
            status: 500,
        };
        let msg = error.to_string();
        assert!(msg.contains("home actions"), "Expected step in: {msg}");
        assert!(msg.contains("HTTP 500"), "Expected status in: {msg}");
        assert_eq!(error.step(), BootstrapStep::HomeActions);
        assert_eq!(error.status(), Some(500));
    }

    #[test]
    fn test_missing_cookie_display() {
        let error = BootstrapError::MissingSessionCookie {
            step: BootstrapStep::OpenDisclaimer,
            cookie: "JSESSIONID",
        };
        let msg = error.to_string();
        assert!(msg.contains("JSESSIONID"), "Expected cookie name in: {msg}");
        assert_eq!(error.status(), None);
    }

    #[test]
    fn test_interrupted_is_flagged() {
        let error = BootstrapError::Interrupted {
            step: BootstrapStep::LoadWebRoot,
        };
        assert!(error.is_interrupted());
        assert_eq!(error.step(), BootstrapStep::LoadWebRoot);
        assert!(error.to_string().contains("interrupted"));
    }
}
