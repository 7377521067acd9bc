//! Recorder Core Library
//!
//! This library scrapes a session-gated, paginated records search portal
//! into one structured dataset.
//!
//! # Architecture
//!
//! The library is organized into the following modules, leaves first:
//! - [`portal`] - HTTP client, fixed endpoints and the three request classes
//! - [`session`] - Session state and the disclaimer handshake
//! - [`search`] - Search criteria, form encoding and page-count discovery
//! - [`fetch`] - Result-page retrieval with retry, backoff and keep-alive
//! - [`extract`] - Result markup to [`DocumentRecord`]s
//! - [`scrape`] - Whole-run orchestration and JSON output
//! - [`config`] - Tunables, defaults and the config file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod extract;
pub mod fetch;
pub mod interrupt;
pub mod portal;
pub mod scrape;
pub mod search;
pub mod session;
pub mod user_agent;

// Re-export commonly used types
pub use config::{
    ConfigError, DEFAULT_DOCUMENT_TYPES, FileConfig, ScraperConfig, resolve_default_config_path,
    split_list,
};
pub use extract::{DocumentRecord, DocumentType, Extraction, PageLayout, RecordExtractor};
pub use fetch::{
    FailureType, FetchError, PageFetchOutcome, PagedFetcher, RetryDecision, RetryPolicy,
};
pub use interrupt::InterruptFlag;
pub use portal::{PortalClient, PortalEndpoints, PortalError};
pub use scrape::{
    NoopObserver, OutputError, PageEvent, PageObserver, ProcessingStats, RunPhase, RunStatus,
    RunWriter, ScrapeError, ScrapeOrchestrator, ScrapeRun, ScrapeSettings,
};
pub use search::{
    CriteriaError, DocumentTypeFilter, SearchCriteria, SearchSubmissionResult, SearchSubmitter,
    SubmissionError,
};
pub use session::{BootstrapError, SessionBootstrapper, SessionState};
