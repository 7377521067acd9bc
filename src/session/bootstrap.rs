//! The fixed disclaimer handshake that yields a server-recognised session.
//!
//! Steps, in order:
//! 1. navigate to the disclaimer page (must set `JSESSIONID`)
//! 2. accept the disclaimer (empty AJAX POST)
//! 3. load the application root
//! 4. post the home-actions initialisation call
//! 5. load the document action group
//! 6. load the search page
//!
//! A short fixed pause separates the steps so the traffic resembles a person
//! clicking through the UI.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, instrument};
use url::Url;

use super::error::BootstrapError;
use super::state::SessionState;
use crate::interrupt::InterruptFlag;
use crate::portal::{PortalClient, PortalError, PortalResponse, SESSION_COOKIE};
use crate::user_agent::{ANY_ACCEPT, FRAGMENT_ACCEPT, JSON_ACCEPT};

/// Default pause between handshake steps.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(500);

/// One step of the disclaimer handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    OpenDisclaimer,
    AcceptDisclaimer,
    LoadWebRoot,
    HomeActions,
    LoadActionGroup,
    LoadSearchPage,
}

impl BootstrapStep {
    /// All steps in protocol order.
    pub const ALL: [Self; 6] = [
        Self::OpenDisclaimer,
        Self::AcceptDisclaimer,
        Self::LoadWebRoot,
        Self::HomeActions,
        Self::LoadActionGroup,
        Self::LoadSearchPage,
    ];

    /// Human-readable step label used in logs and errors.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenDisclaimer => "GET disclaimer",
            Self::AcceptDisclaimer => "POST disclaimer acceptance",
            Self::LoadWebRoot => "GET web root",
            Self::HomeActions => "POST home actions",
            Self::LoadActionGroup => "GET action group",
            Self::LoadSearchPage => "GET search page",
        }
    }
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Performs the handshake against one portal.
#[derive(Debug)]
pub struct SessionBootstrapper<'a> {
    client: &'a PortalClient,
    step_delay: Duration,
    interrupt: InterruptFlag,
}

impl<'a> SessionBootstrapper<'a> {
    #[must_use]
    pub fn new(client: &'a PortalClient, step_delay: Duration) -> Self {
        Self {
            client,
            step_delay,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Abandons the handshake when `interrupt` is triggered.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Runs every handshake step and returns the established session.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError`] at the first step that fails to respond,
    /// answers with a status of 400 or above, or (for the first step) does
    /// not set the session cookie. [`BootstrapError::Interrupted`] when the
    /// interrupt flag is raised mid-handshake.
    #[instrument(skip(self), fields(base = %self.client.endpoints().base()))]
    pub async fn establish(&self) -> Result<SessionState, BootstrapError> {
        info!("establishing portal session");
        let mut session = SessionState::new();

        for step in BootstrapStep::ALL {
            let Some(result) = self.interrupt.guard(self.perform(step, &mut session)).await else {
                return Err(BootstrapError::Interrupted { step });
            };
            let response = result.map_err(|source| BootstrapError::Transport { step, source })?;

            if !response.is_ok() {
                return Err(BootstrapError::UnexpectedStatus {
                    step,
                    status: response.status.as_u16(),
                });
            }

            if step == BootstrapStep::OpenDisclaimer
                && !session.has_cookie(self.client.endpoints().disclaimer(), SESSION_COOKIE)
            {
                return Err(BootstrapError::MissingSessionCookie {
                    step,
                    cookie: SESSION_COOKIE,
                });
            }

            debug!(step = %step, status = response.status.as_u16(), "handshake step ok");
            if !self.interrupt.pause(self.step_delay).await {
                return Err(BootstrapError::Interrupted { step });
            }
        }

        session.mark_established();
        info!("portal session established");
        Ok(session)
    }

    async fn perform(
        &self,
        step: BootstrapStep,
        session: &mut SessionState,
    ) -> Result<PortalResponse, PortalError> {
        let endpoints = self.client.endpoints();
        let disclaimer: &Url = endpoints.disclaimer();
        match step {
            BootstrapStep::OpenDisclaimer => self.client.navigate(session, disclaimer).await,
            BootstrapStep::AcceptDisclaimer => {
                self.client
                    .ajax_post(session, disclaimer, disclaimer, JSON_ACCEPT)
                    .await
            }
            BootstrapStep::LoadWebRoot => {
                self.client
                    .ajax_get(session, endpoints.web_root(), disclaimer, FRAGMENT_ACCEPT, &[])
                    .await
            }
            BootstrapStep::HomeActions => {
                self.client
                    .ajax_post(session, endpoints.home_actions(), disclaimer, ANY_ACCEPT)
                    .await
            }
            BootstrapStep::LoadActionGroup => {
                self.client
                    .ajax_get(
                        session,
                        endpoints.action_group(),
                        endpoints.web_root(),
                        FRAGMENT_ACCEPT,
                        &[],
                    )
                    .await
            }
            BootstrapStep::LoadSearchPage => {
                self.client
                    .ajax_get(
                        session,
                        endpoints.search_page(),
                        endpoints.action_group(),
                        FRAGMENT_ACCEPT,
                        &[],
                    )
                    .await
            }
        }
    }
}
