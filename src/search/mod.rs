//! Search criteria and their submission to the portal.

mod criteria;
mod error;
mod submit;

pub use criteria::{
    CriteriaError, DocumentTypeFilter, MatchMode, PORTAL_DATE_FORMAT, SearchCriteria,
    format_portal_date, parse_date,
};
pub use error::SubmissionError;
pub use submit::{
    FALLBACK_TOTAL_PAGES, SearchSubmissionResult, SearchSubmitter, encode_criteria,
    parse_total_pages,
};
