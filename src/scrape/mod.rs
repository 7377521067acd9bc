//! Whole-run orchestration and output.

mod error;
mod orchestrator;
mod run;
mod writer;

pub use error::ScrapeError;
pub use orchestrator::{
    DEFAULT_PAGE_DELAY, NoopObserver, PageEvent, PageObserver, RunPhase, ScrapeOrchestrator,
    ScrapeSettings,
};
pub use run::{ProcessingStats, RunStatus, ScrapeRun, SearchParameters};
pub use writer::{DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FILE, OutputError, RunWriter};
