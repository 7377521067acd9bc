//! Result-page retrieval with retry, backoff and session keep-alive.

mod error;
mod fetcher;
mod retry;

pub use error::FetchError;
pub use fetcher::{
    DEFAULT_KEEPALIVE_EVERY, FetchedPage, KEEPALIVE_TIMEOUT, KeepAlive, PageFetchOutcome,
    PagedFetcher,
};
pub use retry::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_JITTER,
    FailureType, RetryDecision, RetryPolicy, classify_status,
};
