//! Drives a whole run: handshake, search, then every page in order.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use super::error::ScrapeError;
use super::run::{RunStatus, ScrapeRun};
use super::writer::RunWriter;
use crate::extract::RecordExtractor;
use crate::fetch::{DEFAULT_KEEPALIVE_EVERY, FetchError, PagedFetcher, RetryPolicy};
use crate::interrupt::InterruptFlag;
use crate::portal::PortalClient;
use crate::search::{SearchCriteria, SearchSubmitter, SubmissionError};
use crate::session::{DEFAULT_STEP_DELAY, SessionBootstrapper};

/// Default pause between result pages.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);

/// Where a run currently is. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    SessionEstablished,
    SearchSubmitted,
    Paging {
        /// The page being processed.
        page: u32,
    },
    Finalized,
}

impl RunPhase {
    fn rank(self) -> (u8, u32) {
        match self {
            Self::Idle => (0, 0),
            Self::SessionEstablished => (1, 0),
            Self::SearchSubmitted => (2, 0),
            Self::Paging { page } => (3, page),
            Self::Finalized => (4, 0),
        }
    }

    /// Whether `next` comes strictly after `self`.
    #[must_use]
    pub fn precedes(self, next: Self) -> bool {
        self.rank() < next.rank()
    }
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// Retrieved and parsed.
    Extracted {
        /// Records appended from this page.
        records: usize,
    },
    /// Recorded as failed; the run moved on.
    Failed {
        /// Why the page failed.
        reason: String,
    },
}

/// Receives run progress. Every method defaults to doing nothing.
pub trait PageObserver {
    fn run_started(&mut self, _total_pages: u32) {}
    fn page_finished(&mut self, _page: u32, _event: &PageEvent) {}
    fn run_finished(&mut self, _run: &ScrapeRun) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PageObserver for NoopObserver {}

/// Pacing and retry settings for a run.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Pause after each handshake step and after the search.
    pub step_delay: Duration,
    /// Pause between result pages.
    pub page_delay: Duration,
    pub retry_policy: RetryPolicy,
    /// Pages between keep-alive pings; zero disables them.
    pub keepalive_every: u32,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
            page_delay: DEFAULT_PAGE_DELAY,
            retry_policy: RetryPolicy::default(),
            keepalive_every: DEFAULT_KEEPALIVE_EVERY,
        }
    }
}

impl ScrapeSettings {
    /// No pacing delays and no backoff; for tests against local servers.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            step_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            retry_policy: RetryPolicy::immediate(max_attempts),
            keepalive_every: DEFAULT_KEEPALIVE_EVERY,
        }
    }
}

/// Runs one scrape from handshake to saved output.
#[derive(Debug)]
pub struct ScrapeOrchestrator<'a> {
    client: &'a PortalClient,
    settings: ScrapeSettings,
    writer: RunWriter,
    interrupt: InterruptFlag,
    phase: RunPhase,
}

impl<'a> ScrapeOrchestrator<'a> {
    #[must_use]
    pub fn new(client: &'a PortalClient, settings: ScrapeSettings, writer: RunWriter) -> Self {
        Self {
            client,
            settings,
            writer,
            interrupt: InterruptFlag::new(),
            phase: RunPhase::Idle,
        }
    }

    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    #[must_use]
    pub fn writer(&self) -> &RunWriter {
        &self.writer
    }

    /// Runs without progress reporting.
    ///
    /// # Errors
    ///
    /// See [`run_with_observer`](Self::run_with_observer).
    pub async fn run(&mut self, criteria: &SearchCriteria) -> Result<ScrapeRun, ScrapeError> {
        self.run_with_observer(criteria, &mut NoopObserver).await
    }

    /// Establishes a session, submits `criteria`, fetches and extracts every
    /// page in order, then saves the run.
    ///
    /// Failed pages are recorded and skipped. An interrupt or an expired
    /// session stops the run early, abandoning any request in flight; what
    /// was gathered is still saved and the returned run carries the matching
    /// [`RunStatus`]. An interrupt before paging saves an empty run.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::Bootstrap`] / [`ScrapeError::Submission`] when the
    ///   handshake or search fails for a reason other than an interrupt;
    ///   nothing is written.
    /// - [`ScrapeError::Output`] if the results cannot be saved.
    #[instrument(skip(self, criteria, observer), fields(
        start = %criteria.start_date(),
        end = %criteria.end_date(),
    ))]
    pub async fn run_with_observer(
        &mut self,
        criteria: &SearchCriteria,
        observer: &mut dyn PageObserver,
    ) -> Result<ScrapeRun, ScrapeError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.phase = RunPhase::Idle;

        let bootstrapper = SessionBootstrapper::new(self.client, self.settings.step_delay)
            .with_interrupt(self.interrupt.clone());
        let mut session = match bootstrapper.establish().await {
            Ok(session) => session,
            Err(e) if e.is_interrupted() => {
                warn!(step = %e.step(), "interrupted during session handshake");
                let mut run = ScrapeRun::new(criteria, 0, started_at);
                self.finish(&mut run, RunStatus::Interrupted, clock, observer)?;
                return Ok(run);
            }
            Err(e) => return Err(e.into()),
        };
        self.advance(RunPhase::SessionEstablished);

        let submitter = SearchSubmitter::new(self.client, self.settings.step_delay)
            .with_interrupt(self.interrupt.clone());
        let submission = match submitter.submit(criteria, &mut session).await {
            Ok(submission) => submission,
            Err(SubmissionError::Interrupted) => {
                warn!("interrupted during search submission");
                let mut run = ScrapeRun::new(criteria, 0, started_at);
                self.finish(&mut run, RunStatus::Interrupted, clock, observer)?;
                return Ok(run);
            }
            Err(e) => return Err(e.into()),
        };
        self.advance(RunPhase::SearchSubmitted);

        let total_pages = submission.total_pages;
        let mut run = ScrapeRun::new(criteria, total_pages, started_at);
        observer.run_started(total_pages);
        info!(total_pages, "starting page scrape");

        let fetcher = PagedFetcher::new(self.client)
            .with_policy(self.settings.retry_policy.clone())
            .with_keepalive_every(self.settings.keepalive_every)
            .with_interrupt(self.interrupt.clone());
        let extractor = RecordExtractor::new(self.client.endpoints().base().clone());

        let mut stopped: Option<RunStatus> = None;
        for page in 1..=total_pages {
            if self.interrupt.is_triggered() {
                stopped = Some(RunStatus::Interrupted);
                break;
            }
            self.advance(RunPhase::Paging { page });
            debug!(page, total_pages, "processing page");

            let event = match fetcher.fetch_page(page, &mut session).await {
                Ok(fetched) => {
                    let extraction = extractor.extract(&fetched.markup);
                    if extraction.is_unrecognized() {
                        warn!(page, "no result rows found on page");
                        if let Err(e) = self.writer.write_snapshot(page, &fetched.markup) {
                            warn!(page, error = %e, "could not save page snapshot");
                        }
                    }
                    let records = extraction.records.len();
                    info!(
                        page,
                        records,
                        rows = extraction.rows_found,
                        skipped = extraction.skipped.len(),
                        "page complete"
                    );
                    run.record_page_success(extraction.records);
                    PageEvent::Extracted { records }
                }
                Err(e) if e.is_page_local() => {
                    warn!(page, error = %e, "page failed, continuing");
                    run.record_page_failure(page);
                    PageEvent::Failed {
                        reason: e.to_string(),
                    }
                }
                Err(FetchError::SessionExpired { status, .. }) => {
                    warn!(page, status, "session expired, stopping");
                    stopped = Some(RunStatus::SessionExpired);
                    break;
                }
                Err(e) => {
                    warn!(page, error = %e, "interrupted, stopping");
                    stopped = Some(RunStatus::Interrupted);
                    break;
                }
            };
            observer.page_finished(page, &event);

            if page < total_pages && !self.interrupt.pause(self.settings.page_delay).await {
                stopped = Some(RunStatus::Interrupted);
                break;
            }
        }

        let status = stopped.unwrap_or_else(|| run.paging_status());
        self.finish(&mut run, status, clock, observer)?;
        Ok(run)
    }

    /// Stamps `run` with `status`, saves it and notifies the observer.
    fn finish(
        &mut self,
        run: &mut ScrapeRun,
        status: RunStatus,
        clock: Instant,
        observer: &mut dyn PageObserver,
    ) -> Result<(), ScrapeError> {
        run.finalize(status, clock.elapsed());
        self.advance(RunPhase::Finalized);

        self.writer.write_run(run)?;
        info!(
            records = run.total_records,
            successful_pages = run.processing_stats.successful_pages,
            failed_pages = ?run.processing_stats.failed_pages,
            completion_rate = run.processing_stats.completion_rate,
            status = ?run.status,
            "scrape finished"
        );
        observer.run_finished(run);
        Ok(())
    }

    fn advance(&mut self, next: RunPhase) {
        debug_assert!(
            self.phase.precedes(next),
            "run phase cannot move from {:?} to {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, "run phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_is_linear() {
        assert!(RunPhase::Idle.precedes(RunPhase::SessionEstablished));
        assert!(RunPhase::SessionEstablished.precedes(RunPhase::SearchSubmitted));
        assert!(RunPhase::SearchSubmitted.precedes(RunPhase::Paging { page: 1 }));
        assert!(RunPhase::Paging { page: 1 }.precedes(RunPhase::Paging { page: 2 }));
        assert!(RunPhase::Paging { page: 9 }.precedes(RunPhase::Finalized));
        assert!(RunPhase::SearchSubmitted.precedes(RunPhase::Finalized));

        assert!(!RunPhase::Paging { page: 2 }.precedes(RunPhase::Paging { page: 2 }));
        assert!(!RunPhase::Paging { page: 2 }.precedes(RunPhase::Paging { page: 1 }));
        assert!(!RunPhase::Finalized.precedes(RunPhase::Idle));
    }

    #[test]
    fn test_default_settings() {
        let settings = ScrapeSettings::default();
        assert_eq!(settings.step_delay, Duration::from_millis(500));
        assert_eq!(settings.page_delay, Duration::from_secs(1));
        assert_eq!(settings.keepalive_every, 5);
        assert_eq!(settings.retry_policy.max_attempts(), 3);
    }
}
