//! Cooperative interrupt flag shared between the signal handler and the run.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::warn;

/// Exit status used when a second Ctrl-C forces the process down.
const FORCED_EXIT_CODE: i32 = 130;

/// Set once by an external abort (Ctrl-C); never cleared.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl InterruptFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the run stop at the next check point.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once the flag is triggered; immediately if it already is.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }

    /// Drives `future` to completion unless the flag is triggered first.
    ///
    /// Returns `None` when interrupted; the future is dropped, which aborts
    /// any request it had in flight.
    pub async fn guard<F: Future>(&self, future: F) -> Option<F::Output> {
        if self.is_triggered() {
            return None;
        }
        tokio::select! {
            biased;
            () = self.cancelled() => None,
            output = future => Some(output),
        }
    }

    /// Sleeps for `delay`, waking early if the flag is triggered.
    ///
    /// Returns `false` when the sleep was cut short (or the flag was already
    /// set), `true` when the full delay elapsed.
    pub async fn pause(&self, delay: Duration) -> bool {
        self.guard(tokio::time::sleep(delay)).await.is_some()
    }

    /// Spawns a task that triggers the flag on Ctrl-C.
    ///
    /// A second Ctrl-C exits the process without waiting for the run to
    /// finalize.
    pub fn listen_for_ctrl_c(&self) {
        let flag = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            flag.trigger();
            warn!("interrupt received; finishing up (press Ctrl-C again to force quit)");
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(FORCED_EXIT_CODE);
            }
        });
    }
}
