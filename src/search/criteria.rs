//! Search criteria: recording-date range plus document-type filters.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Date format the portal uses in forms and result listings.
pub const PORTAL_DATE_FORMAT: &str = "%m/%d/%Y";

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Invalid search criteria.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    /// A date could not be parsed as `MM/DD/YYYY` or `YYYY-MM-DD`.
    #[error("invalid date '{value}': use MM/DD/YYYY or YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input.
        value: String,
    },

    /// The start date falls after the end date.
    #[error("start date {start} is after end date {end}")]
    InvertedRange {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// No document types were requested.
    #[error("at least one document type is required")]
    NoDocumentTypes,

    /// A document-type entry had an empty code.
    #[error("invalid document type '{entry}': code must not be empty")]
    EmptyTypeCode {
        /// The rejected entry.
        entry: String,
    },
}

/// Parses a calendar date in portal (`MM/DD/YYYY`) or ISO (`YYYY-MM-DD`) form.
///
/// # Errors
///
/// Returns [`CriteriaError::InvalidDate`] when neither format matches.
pub fn parse_date(value: &str) -> Result<NaiveDate, CriteriaError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, PORTAL_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT))
        .map_err(|_| CriteriaError::InvalidDate {
            value: value.to_string(),
        })
}

/// Formats a date the way the portal expects it in form fields.
#[must_use]
pub fn format_portal_date(date: NaiveDate) -> String {
    date.format(PORTAL_DATE_FORMAT).to_string()
}

/// One document-type filter: the code the server matches on and the label
/// its multi-select widget displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentTypeFilter {
    code: String,
    label: String,
}

impl DocumentTypeFilter {
    /// Creates a filter; an empty label falls back to the code.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::EmptyTypeCode`] when `code` is blank.
    pub fn new(code: &str, label: &str) -> Result<Self, CriteriaError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CriteriaError::EmptyTypeCode {
                entry: format!("{code}:{label}"),
            });
        }
        let label = label.trim();
        Ok(Self {
            code: code.to_string(),
            label: (if label.is_empty() { code } else { label }).to_string(),
        })
    }

    /// Parses `CODE` or `CODE:Label`.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::EmptyTypeCode`] when the code part is blank.
    pub fn parse(entry: &str) -> Result<Self, CriteriaError> {
        let (code, label) = entry.split_once(':').unwrap_or((entry, entry));
        Self::new(code, label).map_err(|_| CriteriaError::EmptyTypeCode {
            entry: entry.to_string(),
        })
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for DocumentTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code == self.label {
            f.write_str(&self.code)
        } else {
            write!(f, "{}:{}", self.code, self.label)
        }
    }
}

/// How the document-type filters combine. The portal UI only offers one mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    ContainsAny,
}

impl MatchMode {
    /// Value submitted in the form's match-mode field.
    #[must_use]
    pub fn form_value(self) -> &'static str {
        match self {
            Self::ContainsAny => "Contains Any",
        }
    }
}

/// Validated, immutable search criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    start_date: NaiveDate,
    end_date: NaiveDate,
    document_types: Vec<DocumentTypeFilter>,
    match_mode: MatchMode,
}

impl SearchCriteria {
    /// Builds criteria for an inclusive date range and document types.
    ///
    /// Duplicate codes are dropped, keeping the first occurrence, so the
    /// types form an ordered set.
    ///
    /// # Errors
    ///
    /// Returns [`CriteriaError::InvertedRange`] when `start_date > end_date`
    /// and [`CriteriaError::NoDocumentTypes`] when no types remain.
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        document_types: impl IntoIterator<Item = DocumentTypeFilter>,
    ) -> Result<Self, CriteriaError> {
        if start_date > end_date {
            return Err(CriteriaError::InvertedRange {
                start: start_date,
                end: end_date,
            });
        }

        let mut unique: Vec<DocumentTypeFilter> = Vec::new();
        for filter in document_types {
            if !unique.iter().any(|existing| existing.code == filter.code) {
                unique.push(filter);
            }
        }
        if unique.is_empty() {
            return Err(CriteriaError::NoDocumentTypes);
        }

        Ok(Self {
            start_date,
            end_date,
            document_types: unique,
            match_mode: MatchMode::ContainsAny,
        })
    }

    /// Parses dates and `CODE[:Label]` entries from configuration strings.
    ///
    /// # Errors
    ///
    /// Returns any [`CriteriaError`] raised by date or type parsing or by
    /// [`SearchCriteria::new`].
    pub fn parse<S: AsRef<str>>(
        start_date: &str,
        end_date: &str,
        document_types: &[S],
    ) -> Result<Self, CriteriaError> {
        let start = parse_date(start_date)?;
        let end = parse_date(end_date)?;
        let filters = document_types
            .iter()
            .map(|entry| DocumentTypeFilter::parse(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(start, end, filters)
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    #[must_use]
    pub fn document_types(&self) -> &[DocumentTypeFilter] {
        &self.document_types
    }

    #[must_use]
    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }
}
