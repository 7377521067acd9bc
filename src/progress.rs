//! Progress bar for the paging phase.

use indicatif::{ProgressBar, ProgressStyle};
use recorder_core::{PageEvent, PageObserver, ScrapeRun};

/// Draws one tick per result page on stderr.
#[derive(Debug)]
pub(crate) struct PageProgress {
    bar: Option<ProgressBar>,
    records: usize,
    failed: usize,
}

impl PageProgress {
    /// Creates the observer; when `enabled` is false it draws nothing.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template("{bar:30} {pos}/{len} pages {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        Self {
            bar,
            records: 0,
            failed: 0,
        }
    }

    fn message(&self) -> String {
        if self.failed == 0 {
            format!("{} records", self.records)
        } else {
            format!("{} records, {} failed", self.records, self.failed)
        }
    }
}

impl PageObserver for PageProgress {
    fn run_started(&mut self, total_pages: u32) {
        if let Some(bar) = &self.bar {
            bar.set_length(u64::from(total_pages));
            bar.set_message(self.message());
        }
    }

    fn page_finished(&mut self, _page: u32, event: &PageEvent) {
        match event {
            PageEvent::Extracted { records } => self.records += records,
            PageEvent::Failed { .. } => self.failed += 1,
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
            bar.set_message(self.message());
        }
    }

    fn run_finished(&mut self, _run: &ScrapeRun) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_still_counts() {
        let mut progress = PageProgress::new(false);
        progress.run_started(3);
        progress.page_finished(1, &PageEvent::Extracted { records: 2 });
        progress.page_finished(
            2,
            &PageEvent::Failed {
                reason: "HTTP 503".to_string(),
            },
        );
        assert_eq!(progress.message(), "2 records, 1 failed");
    }

    #[test]
    fn test_enabled_progress_tracks_length() {
        let mut progress = PageProgress::new(true);
        progress.run_started(4);
        progress.page_finished(1, &PageEvent::Extracted { records: 1 });
        let bar = progress.bar.as_ref().unwrap();
        assert_eq!(bar.length(), Some(4));
        assert_eq!(bar.position(), 1);
    }
}
