//! Search submission and total-page discovery.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::criteria::{SearchCriteria, format_portal_date};
use super::error::SubmissionError;
use crate::interrupt::InterruptFlag;
use crate::portal::PortalClient;
use crate::session::SessionState;
use crate::user_agent::JSON_ACCEPT;

const START_DATE_FIELD: &str = "field_RecordingDateID_DOT_StartDate";
const END_DATE_FIELD: &str = "field_RecordingDateID_DOT_EndDate";
const TYPE_CODE_FIELD: &str = "field_selfservice_documentTypes-holderInput";
const TYPE_LABEL_FIELD: &str = "field_selfservice_documentTypes-holderValue";
const MATCH_MODE_FIELD: &str = "field_selfservice_documentTypes-containsInput";
const TYPES_FIELD: &str = "field_selfservice_documentTypes";

/// JSON key carrying the page count in the search response.
const TOTAL_PAGES_KEY: &str = "totalPages";

/// Page count assumed when the response does not state one.
pub const FALLBACK_TOTAL_PAGES: u32 = 1;

/// What the portal told us about the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchSubmissionResult {
    /// Number of result pages to fetch. Zero means no results.
    pub total_pages: u32,
}

/// Serialises criteria the way the portal's multi-select search form does.
///
/// Order: start date, end date, one (code, label) pair per document type,
/// the match-mode marker, then an empty type field.
#[must_use]
pub fn encode_criteria(criteria: &SearchCriteria) -> Vec<(String, String)> {
    let mut fields = Vec::with_capacity(4 + criteria.document_types().len() * 2);
    fields.push((
        START_DATE_FIELD.to_string(),
        format_portal_date(criteria.start_date()),
    ));
    fields.push((
        END_DATE_FIELD.to_string(),
        format_portal_date(criteria.end_date()),
    ));
    for filter in criteria.document_types() {
        fields.push((TYPE_CODE_FIELD.to_string(), filter.code().to_string()));
        fields.push((TYPE_LABEL_FIELD.to_string(), filter.label().to_string()));
    }
    fields.push((
        MATCH_MODE_FIELD.to_string(),
        criteria.match_mode().form_value().to_string(),
    ));
    fields.push((TYPES_FIELD.to_string(), String::new()));
    fields
}

/// Reads `totalPages` from a search response body.
///
/// Falls back to [`FALLBACK_TOTAL_PAGES`] when the body is not JSON, lacks the
/// key, or holds something other than a non-negative integer. The portal
/// sometimes answers with the first page inline instead of JSON.
#[must_use]
pub fn parse_total_pages(body: &str) -> u32 {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        debug!("search response is not JSON");
        return FALLBACK_TOTAL_PAGES;
    };

    let pages = match json.get(TOTAL_PAGES_KEY) {
        Some(serde_json::Value::Number(number)) => number.as_u64(),
        Some(serde_json::Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    match pages {
        Some(pages) => u32::try_from(pages).unwrap_or(u32::MAX),
        None => {
            debug!("search response has no usable {TOTAL_PAGES_KEY}");
            FALLBACK_TOTAL_PAGES
        }
    }
}

/// Submits search criteria over an established session.
#[derive(Debug)]
pub struct SearchSubmitter<'a> {
    client: &'a PortalClient,
    step_delay: Duration,
    interrupt: InterruptFlag,
}

impl<'a> SearchSubmitter<'a> {
    #[must_use]
    pub fn new(client: &'a PortalClient, step_delay: Duration) -> Self {
        Self {
            client,
            step_delay,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Abandons the submission when `interrupt` is triggered.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptFlag) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Posts the search form and learns how many result pages exist.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError`] if the session is not established, the
    /// request fails, the server answers with a status of 400 or above, or
    /// the interrupt flag is raised while the request is in flight.
    /// An unreadable body is not an error; see [`parse_total_pages`].
    #[instrument(skip(self, criteria, session), fields(
        start = %criteria.start_date(),
        end = %criteria.end_date(),
        types = criteria.document_types().len(),
    ))]
    pub async fn submit(
        &self,
        criteria: &SearchCriteria,
        session: &mut SessionState,
    ) -> Result<SearchSubmissionResult, SubmissionError> {
        if !session.is_established() {
            return Err(SubmissionError::SessionNotEstablished);
        }

        let endpoints = self.client.endpoints();
        let fields = encode_criteria(criteria);
        let request = self.client.form_post(
            session,
            endpoints.search_post(),
            endpoints.search_page(),
            JSON_ACCEPT,
            &fields,
        );
        let Some(result) = self.interrupt.guard(request).await else {
            return Err(SubmissionError::Interrupted);
        };
        let response = result.map_err(SubmissionError::Transport)?;

        if !response.is_ok() {
            return Err(SubmissionError::UnexpectedStatus {
                status: response.status.as_u16(),
            });
        }

        let total_pages = parse_total_pages(&response.body);
        if total_pages == FALLBACK_TOTAL_PAGES && !response.body.contains(TOTAL_PAGES_KEY) {
            warn!("could not read page count from search response, assuming 1 page");
        }
        info!(total_pages, "search submitted");

        if !self.interrupt.pause(self.step_delay).await {
            debug!("interrupted after search submission");
        }

        Ok(SearchSubmissionResult { total_pages })
    }
}
