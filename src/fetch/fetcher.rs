//! Page-at-a-time retrieval of search results.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use super::error::FetchError;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_status};
use crate::interrupt::InterruptFlag;
use crate::portal::PortalClient;
use crate::session::SessionState;
use crate::user_agent::ANY_ACCEPT;

/// Pages between keep-alive pings.
pub const DEFAULT_KEEPALIVE_EVERY: u32 = 5;

/// Timeout for the keep-alive ping; shorter than a page request.
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

const PAGE_PARAM: &str = "page";

/// Result of a single request for a result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFetchOutcome {
    /// Status below 400. The markup may be empty.
    Success {
        /// Response body.
        markup: String,
    },
    /// 5xx, timeout or connection failure.
    RetryableFailure {
        /// What went wrong.
        reason: String,
    },
    /// 4xx; repeating the request will not help.
    FatalFailure {
        /// What went wrong.
        reason: String,
    },
}

/// Result of a keep-alive ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepAlive {
    /// The server accepted the session.
    Alive,
    /// The server answered 401 or 403.
    Expired {
        /// The rejecting status.
        status: u16,
    },
    /// The ping failed for another reason; the session may still be valid.
    Inconclusive {
        /// What went wrong.
        reason: String,
    },
}

/// A successfully retrieved page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 1-based page number.
    pub page: u32,
    /// Raw result markup.
    pub markup: String,
    /// Attempts it took, including the successful one.
    pub attempts: u32,
}

/// Fetches result pages one at a time with bounded retries.
#[derive(Debug)]
pub struct PagedFetcher<'a> {
    client: &'a PortalClient,
    policy: RetryPolicy,
    keepalive_every: u32,
    interrupt: InterruptFlag,
}

impl<'a> PagedFetcher<'a> {
    #[must_use]
    pub fn new(client: &'a PortalClient) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
            keepalive_every: DEFAULT_KEEPALIVE_EVERY,
            interrupt: InterruptFlag::new(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the keep-alive interval in pages. Zero disables the ping.
    #[must_use]
    pub fn with_keepalive_every(mut self, pages: u32) -> Self {
        self.keepalive_every = pages;
        self
    }

    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Whether a keep-alive ping precedes `page`.
    #[must_use]
    pub fn pings_before(&self, page: u32) -> bool {
        self.keepalive_every > 0 && page % self.keepalive_every == 0
    }

    /// Issues one request for `page` and classifies the response.
    pub async fn attempt(&self, page: u32, session: &mut SessionState) -> PageFetchOutcome {
        let endpoints = self.client.endpoints();
        let page_value = page.to_string();
        let result = self
            .client
            .ajax_get(
                session,
                endpoints.search_results(),
                endpoints.search_page(),
                ANY_ACCEPT,
                &[(PAGE_PARAM, &page_value)],
            )
            .await;

        match result {
            Ok(response) if response.is_ok() => PageFetchOutcome::Success {
                markup: response.body,
            },
            Ok(response) => {
                let reason = describe_status(response.status);
                match classify_status(response.status.as_u16()) {
                    FailureType::Transient => PageFetchOutcome::RetryableFailure { reason },
                    FailureType::Permanent => PageFetchOutcome::FatalFailure { reason },
                }
            }
            Err(e) => PageFetchOutcome::RetryableFailure {
                reason: e.to_string(),
            },
        }
    }

    /// Pings the session endpoint.
    ///
    /// Marks `session` as no longer established when the server rejects it.
    #[instrument(level = "debug", skip(self, session))]
    pub async fn keep_alive(&self, session: &mut SessionState) -> KeepAlive {
        let endpoints = self.client.endpoints();
        let result = self
            .client
            .ajax_get_with_timeout(
                session,
                endpoints.ping_session(),
                endpoints.search_page(),
                ANY_ACCEPT,
                &[],
                Some(KEEPALIVE_TIMEOUT),
            )
            .await;

        match result {
            Ok(response)
                if matches!(
                    response.status,
                    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
                ) =>
            {
                session.mark_expired();
                KeepAlive::Expired {
                    status: response.status.as_u16(),
                }
            }
            Ok(response) if response.is_ok() => KeepAlive::Alive,
            Ok(response) => KeepAlive::Inconclusive {
                reason: describe_status(response.status),
            },
            Err(e) => KeepAlive::Inconclusive {
                reason: e.to_string(),
            },
        }
    }

    /// Retrieves `page`, retrying transient failures per the policy.
    ///
    /// Runs the keep-alive ping first when `page` falls on the interval.
    ///
    /// # Errors
    ///
    /// - [`FetchError::SessionExpired`] if the ping is rejected.
    /// - [`FetchError::Fatal`] on a 4xx response.
    /// - [`FetchError::Exhausted`] when every attempt failed.
    /// - [`FetchError::Interrupted`] if the interrupt flag is raised at any
    ///   point; an in-flight request is abandoned.
    #[instrument(level = "debug", skip(self, session), fields(max_attempts = self.policy.max_attempts()))]
    pub async fn fetch_page(
        &self,
        page: u32,
        session: &mut SessionState,
    ) -> Result<FetchedPage, FetchError> {
        if self.interrupt.is_triggered() {
            return Err(FetchError::Interrupted { page });
        }

        if self.pings_before(page) {
            let Some(ping) = self.interrupt.guard(self.keep_alive(session)).await else {
                return Err(FetchError::Interrupted { page });
            };
            match ping {
                KeepAlive::Alive => debug!(page, "session keep-alive ok"),
                KeepAlive::Expired { status } => {
                    warn!(page, status, "session rejected by keep-alive ping");
                    return Err(FetchError::SessionExpired { page, status });
                }
                KeepAlive::Inconclusive { reason } => {
                    warn!(page, %reason, "keep-alive ping failed; continuing");
                }
            }
        }

        let mut attempt = 1;
        loop {
            let Some(outcome) = self.interrupt.guard(self.attempt(page, session)).await else {
                debug!(page, attempt, "request abandoned on interrupt");
                return Err(FetchError::Interrupted { page });
            };

            match outcome {
                PageFetchOutcome::Success { markup } => {
                    info!(page, attempt, bytes = markup.len(), "page fetched");
                    return Ok(FetchedPage {
                        page,
                        markup,
                        attempts: attempt,
                    });
                }
                PageFetchOutcome::FatalFailure { reason } => {
                    warn!(page, attempt, %reason, "page rejected");
                    return Err(FetchError::Fatal {
                        page,
                        attempts: attempt,
                        reason,
                    });
                }
                PageFetchOutcome::RetryableFailure { reason } => {
                    match self.policy.should_retry(FailureType::Transient, attempt) {
                        RetryDecision::Retry {
                            delay,
                            attempt: next,
                        } => {
                            warn!(
                                page,
                                attempt,
                                delay_ms = delay.as_millis(),
                                %reason,
                                "page attempt failed, retrying"
                            );
                            if !self.interrupt.pause(delay).await {
                                return Err(FetchError::Interrupted { page });
                            }
                            attempt = next;
                        }
                        RetryDecision::DoNotRetry { .. } => {
                            warn!(page, attempts = attempt, %reason, "page failed");
                            return Err(FetchError::Exhausted {
                                page,
                                attempts: attempt,
                                reason,
                            });
                        }
                    }
                }
            }
        }
    }
}

fn describe_status(status: StatusCode) -> String {
    format!("HTTP {}", status.as_u16())
}
