//! The run aggregate: accumulated records, page bookkeeping and final stats.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extract::DocumentRecord;
use crate::search::{DocumentTypeFilter, MatchMode, SearchCriteria, format_portal_date};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Still paging; never written by a finished run.
    Running,
    /// Every page was retrieved.
    Complete,
    /// Some pages failed and were skipped.
    Partial,
    /// Stopped by an external abort.
    Interrupted,
    /// The server rejected the session mid-run.
    SessionExpired,
}

impl RunStatus {
    /// Whether the output covers every result page.
    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

/// Search criteria as echoed in the output.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParameters {
    /// Portal format, `MM/DD/YYYY`.
    pub start_date: String,
    pub end_date: String,
    pub document_types: Vec<DocumentTypeFilter>,
    pub match_mode: MatchMode,
    pub search_timestamp: DateTime<Utc>,
}

impl SearchParameters {
    fn new(criteria: &SearchCriteria, search_timestamp: DateTime<Utc>) -> Self {
        Self {
            start_date: format_portal_date(criteria.start_date()),
            end_date: format_portal_date(criteria.end_date()),
            document_types: criteria.document_types().to_vec(),
            match_mode: criteria.match_mode(),
            search_timestamp,
        }
    }
}

/// Page and timing statistics for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    /// Pages the search reported.
    pub total_pages_attempted: u32,
    /// Pages that reached a success or failure outcome.
    pub pages_attempted: u32,
    pub successful_pages: u32,
    /// Failed page numbers, ascending.
    pub failed_pages: Vec<u32>,
    pub total_documents_extracted: usize,
    pub processing_time_seconds: f64,
    pub average_time_per_page: f64,
    /// Successful pages as a percentage of reported pages.
    pub completion_rate: f64,
}

impl ProcessingStats {
    fn compute(
        total_pages: u32,
        successful_pages: u32,
        failed_pages: &[u32],
        documents: usize,
        elapsed: Duration,
    ) -> Self {
        let seconds = elapsed.as_secs_f64();
        let completion_rate = if total_pages == 0 {
            0.0
        } else {
            round_to(
                f64::from(successful_pages) / f64::from(total_pages) * 100.0,
                1,
            )
        };
        let pages_attempted = u32::try_from(failed_pages.len())
            .unwrap_or(u32::MAX)
            .saturating_add(successful_pages);

        Self {
            total_pages_attempted: total_pages,
            pages_attempted,
            successful_pages,
            failed_pages: failed_pages.to_vec(),
            total_documents_extracted: documents,
            processing_time_seconds: round_to(seconds, 2),
            average_time_per_page: round_to(seconds / f64::from(successful_pages.max(1)), 2),
            completion_rate,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Everything a run has accumulated. Serialises to the output document.
///
/// Records keep page order, then row order within a page.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRun {
    pub search_parameters: SearchParameters,
    pub total_pages: u32,
    pub total_records: usize,
    pub documents: Vec<DocumentRecord>,
    pub search_timestamp: DateTime<Utc>,
    pub processing_stats: ProcessingStats,
    pub status: RunStatus,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    successful_pages: u32,
    #[serde(skip)]
    failed_pages: Vec<u32>,
}

impl ScrapeRun {
    /// Starts a run for `criteria` that expects `total_pages` pages.
    #[must_use]
    pub fn new(criteria: &SearchCriteria, total_pages: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            search_parameters: SearchParameters::new(criteria, started_at),
            total_pages,
            total_records: 0,
            documents: Vec::new(),
            search_timestamp: started_at,
            processing_stats: ProcessingStats {
                total_pages_attempted: total_pages,
                ..ProcessingStats::default()
            },
            status: RunStatus::Running,
            finished_at: None,
            successful_pages: 0,
            failed_pages: Vec::new(),
        }
    }

    /// Appends the records of a retrieved page.
    pub fn record_page_success(&mut self, records: Vec<DocumentRecord>) {
        self.documents.extend(records);
        self.total_records = self.documents.len();
        self.successful_pages += 1;
    }

    /// Notes a page that could not be retrieved.
    pub fn record_page_failure(&mut self, page: u32) {
        self.failed_pages.push(page);
    }

    #[must_use]
    pub fn successful_pages(&self) -> u32 {
        self.successful_pages
    }

    #[must_use]
    pub fn failed_pages(&self) -> &[u32] {
        &self.failed_pages
    }

    /// Status implied by page outcomes alone.
    #[must_use]
    pub fn paging_status(&self) -> RunStatus {
        if self.failed_pages.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::Partial
        }
    }

    /// Recomputes statistics and stamps the run as finished.
    ///
    /// Safe to call more than once; the last call wins.
    pub fn finalize(&mut self, status: RunStatus, elapsed: Duration) {
        self.total_records = self.documents.len();
        self.processing_stats = ProcessingStats::compute(
            self.total_pages,
            self.successful_pages,
            &self.failed_pages,
            self.total_records,
            elapsed,
        );
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn criteria() -> SearchCriteria {
        SearchCriteria::parse("07/01/2025", "10/21/2025", &["NTSALE", "CNLNT"]).unwrap()
    }

    fn record(id: &str) -> DocumentRecord {
        DocumentRecord {
            document_id: id.to_string(),
            ..DocumentRecord::default()
        }
    }

    #[test]
    fn test_run_accumulates_in_order() {
        let mut run = ScrapeRun::new(&criteria(), 3, Utc::now());
        run.record_page_success(vec![record("a"), record("b")]);
        run.record_page_failure(2);
        run.record_page_success(vec![record("c")]);
        run.finalize(run.paging_status(), Duration::from_secs(3));

        let ids: Vec<&str> = run.documents.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(run.total_records, 3);
        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(run.processing_stats.successful_pages, 2);
        assert_eq!(run.processing_stats.failed_pages, vec![2]);
        assert_eq!(
            run.processing_stats.successful_pages as usize
                + run.processing_stats.failed_pages.len(),
            run.total_pages as usize
        );
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_stats_rounding_and_rates() {
        let stats = ProcessingStats::compute(3, 2, &[2], 6, Duration::from_millis(3004));
        assert!((stats.processing_time_seconds - 3.0).abs() < 1e-9);
        assert!((stats.average_time_per_page - 1.5).abs() < 1e-9);
        assert!((stats.completion_rate - 66.7).abs() < 1e-9);
        assert_eq!(stats.pages_attempted, 3);
    }

    #[test]
    fn test_stats_with_no_pages() {
        let stats = ProcessingStats::compute(0, 0, &[], 0, Duration::from_millis(10));
        assert!(stats.completion_rate.abs() < f64::EPSILON);
        assert!((stats.average_time_per_page - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_run_serializes_output_layout() {
        let mut run = ScrapeRun::new(&criteria(), 1, Utc::now());
        run.record_page_success(vec![record("a")]);
        run.finalize(RunStatus::Complete, Duration::from_secs(1));

        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["search_parameters"]["start_date"], "07/01/2025");
        assert_eq!(json["search_parameters"]["document_types"][0]["code"], "NTSALE");
        assert_eq!(json["search_parameters"]["match_mode"], "contains_any");
        assert_eq!(json["total_pages"], 1);
        assert_eq!(json["total_records"], 1);
        assert_eq!(json["status"], "complete");
        assert_eq!(json["processing_stats"]["failed_pages"], serde_json::json!([]));
        assert!(json.get("successful_pages").is_none());
    }
}
