//! The structured record produced for each result row.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

/// Coded document type derived from the row's description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    /// Notice of trustee's sale.
    Ntsale,
    /// Cancellation of notice.
    Cnlnt,
    /// Any other description.
    #[default]
    Unknown,
}

impl DocumentType {
    /// Maps a free-text description to its code.
    ///
    /// Matching is a case-insensitive substring test; "NOTICE SALE" wins over
    /// "CANCELLATION" when both appear.
    #[must_use]
    pub fn from_description(description: &str) -> Self {
        let upper = description.to_uppercase();
        if upper.contains("NOTICE SALE") {
            Self::Ntsale
        } else if upper.contains("CANCELLATION") {
            Self::Cnlnt
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Ntsale => "NTSALE",
            Self::Cnlnt => "CNLNT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Extension-bag key for a recording date that could not be read as a calendar date.
pub const RAW_RECORDING_DATE_KEY: &str = "recording_date_raw";

/// One document from the result list.
///
/// Multiple grantors or grantees are kept as a single `" | "`-joined string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub book_volume_page: String,
    pub document_type: DocumentType,
    pub document_type_description: String,
    pub recording_date: Option<NaiveDate>,
    pub grantor: String,
    pub grantee: String,
    pub consideration: String,
    pub legal_description: String,
    pub document_url: Option<Url>,
    /// Row `data-*` attributes and action-link metadata, keyed by normalised name.
    pub additional_info: BTreeMap<String, String>,
}

impl DocumentRecord {
    /// The recording date as printed, when it was not a real calendar date.
    #[must_use]
    pub fn raw_recording_date(&self) -> Option<&str> {
        self.additional_info
            .get(RAW_RECORDING_DATE_KEY)
            .map(String::as_str)
    }

    /// True when at least one identifying field carries a value.
    ///
    /// A recording date counts whether or not it parsed as a calendar date.
    /// Rows failing this check are headers, spacers or blanks and are dropped.
    #[must_use]
    pub fn is_identifiable(&self) -> bool {
        !self.document_id.is_empty()
            || self.recording_date.is_some()
            || self.raw_recording_date().is_some()
            || !self.grantor.is_empty()
            || !self.grantee.is_empty()
            || !self.document_type_description.is_empty()
            || !self.book_volume_page.is_empty()
    }
}
