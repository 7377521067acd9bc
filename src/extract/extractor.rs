//! Markup-to-record extraction for result pages.
//!
//! Never fails: a row that yields nothing identifiable is skipped, and a page
//! without any recognisable rows comes back as [`PageLayout::Unrecognized`]
//! so the caller can keep a snapshot of it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

use super::record::{DocumentRecord, DocumentType, RAW_RECORDING_DATE_KEY};

#[allow(clippy::expect_used)]
static RESULT_LIST: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("ul.selfServiceSearchResultList").expect("result list selector is valid") // Static selector, safe to panic
});

#[allow(clippy::expect_used)]
static RESULT_ROW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("li.ss-search-row").expect("result row selector is valid") // Static selector, safe to panic
});

#[allow(clippy::expect_used)]
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("heading selector is valid"));

#[allow(clippy::expect_used)]
static COLUMN: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.searchResultThreeColumn").expect("column selector is valid")
});

#[allow(clippy::expect_used)]
static COLUMN_ENTRY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("column entry selector is valid"));

#[allow(clippy::expect_used)]
static ACTION_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector is valid"));

#[allow(clippy::expect_used)]
static STATUS_AVATAR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="ss-facet-avatar"]"#).expect("avatar selector is valid")
});

/// First `M/D/YYYY`-shaped token in a recording-date entry.
#[allow(clippy::expect_used)]
static RECORDING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").expect("recording date regex is valid") // Static pattern, safe to panic
});

/// Row id prefix used when `data-documentid` is absent.
const ROW_ID_PREFIX: &str = "searchRow";

/// Separator between book/volume/page and the type description in headings.
const HEADING_SEPARATOR: char = '•';

/// Separator for multiple grantor/grantee names.
pub const PARTY_SEPARATOR: &str = " | ";

/// How the rows of a page were located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLayout {
    /// Rows found inside the result-list container.
    Container,
    /// No container, but tagged rows found elsewhere in the document.
    FallbackRows,
    /// Neither container nor rows; nothing to extract.
    Unrecognized,
}

/// A row that produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSkip {
    /// 1-based position of the row on the page.
    pub row: usize,
}

/// Records extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Records in row order.
    pub records: Vec<DocumentRecord>,
    /// Row elements found, including skipped ones.
    pub rows_found: usize,
    /// Rows dropped for lacking every identifying field.
    pub skipped: Vec<RowSkip>,
    pub layout: PageLayout,
}

impl Extraction {
    /// Whether the page structure was not recognised at all.
    #[must_use]
    pub fn is_unrecognized(&self) -> bool {
        self.layout == PageLayout::Unrecognized
    }
}

/// Column kinds, chosen by the column's header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    RecordingDate,
    Grantor,
    Grantee,
    Consideration,
    LegalDescription,
}

impl ColumnKind {
    fn from_header(header: &str) -> Option<Self> {
        let header = header.to_lowercase();
        if header.contains("recording date") {
            Some(Self::RecordingDate)
        } else if header.contains("grantor") {
            Some(Self::Grantor)
        } else if header.contains("grantee") {
            Some(Self::Grantee)
        } else if header.contains("consideration") {
            Some(Self::Consideration)
        } else if header.contains("legal") || header.contains("description") {
            Some(Self::LegalDescription)
        } else {
            None
        }
    }
}

/// Turns result-page markup into [`DocumentRecord`]s.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    base: Url,
}

impl RecordExtractor {
    /// Creates an extractor resolving relative links against `base`.
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// Extracts every identifiable record from `markup`, in document order.
    #[must_use]
    pub fn extract(&self, markup: &str) -> Extraction {
        let document = Html::parse_document(markup);

        let (rows, layout) = if let Some(container) = document.select(&RESULT_LIST).next() {
            (
                container.select(&RESULT_ROW).collect::<Vec<_>>(),
                PageLayout::Container,
            )
        } else {
            let rows: Vec<_> = document.select(&RESULT_ROW).collect();
            let layout = if rows.is_empty() {
                PageLayout::Unrecognized
            } else {
                PageLayout::FallbackRows
            };
            (rows, layout)
        };

        debug!(rows = rows.len(), ?layout, "located result rows");

        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let record = self.extract_row(*row);
            if record.is_identifiable() {
                trace!(
                    row = index + 1,
                    document_id = %record.document_id,
                    description = %record.document_type_description,
                    "parsed row"
                );
                records.push(record);
            } else {
                debug!(row = index + 1, "row has no identifying fields, skipped");
                skipped.push(RowSkip { row: index + 1 });
            }
        }

        Extraction {
            records,
            rows_found: rows.len(),
            skipped,
            layout,
        }
    }

    fn extract_row(&self, row: ElementRef<'_>) -> DocumentRecord {
        let mut record = DocumentRecord {
            document_id: document_id(row),
            ..DocumentRecord::default()
        };

        if let Some(heading) = row.select(&HEADING).next() {
            let text = element_text(heading);
            let mut parts = text.split(HEADING_SEPARATOR);
            record.book_volume_page = parts.next().unwrap_or_default().trim().to_string();
            if let Some(description) = parts.next() {
                record.document_type_description = description.trim().to_string();
                record.document_type =
                    DocumentType::from_description(&record.document_type_description);
            }
        }

        record.document_url = row
            .value()
            .attr("data-href")
            .filter(|href| !href.is_empty())
            .and_then(|href| self.base.join(href).ok());

        let mut additional_info = BTreeMap::new();
        for column in row.select(&COLUMN) {
            self.apply_column(column, &mut record, &mut additional_info);
        }

        for (name, value) in row.value().attrs() {
            if value.is_empty() {
                continue;
            }
            if let Some(key) = name.strip_prefix("data-") {
                additional_info.insert(key.replace('-', "_"), value.to_string());
            }
        }

        self.collect_action_links(row, &mut additional_info);

        if let Some(avatar) = row.select(&STATUS_AVATAR).next() {
            additional_info.insert("status_indicator".to_string(), element_text(avatar));
            let classes = avatar
                .value()
                .attr("class")
                .unwrap_or_default()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            additional_info.insert("status_class".to_string(), classes);
        }

        record.additional_info = additional_info;
        record
    }

    fn apply_column(
        &self,
        column: ElementRef<'_>,
        record: &mut DocumentRecord,
        additional_info: &mut BTreeMap<String, String>,
    ) {
        let mut entries = column.select(&COLUMN_ENTRY);
        let Some(header) = entries.next() else {
            return;
        };
        let Some(kind) = ColumnKind::from_header(&element_text(header)) else {
            return;
        };
        let mut values = entries.map(element_text).filter(|text| !text.is_empty());

        match kind {
            ColumnKind::RecordingDate => {
                for value in values {
                    if let Some(captures) = RECORDING_DATE.captures(&value) {
                        record.recording_date = parse_recording_date(&captures);
                        if record.recording_date.is_none() {
                            additional_info
                                .insert(RAW_RECORDING_DATE_KEY.to_string(), captures[0].to_string());
                        }
                        break;
                    }
                }
            }
            ColumnKind::Grantor => {
                record.grantor = values.collect::<Vec<_>>().join(PARTY_SEPARATOR);
            }
            ColumnKind::Grantee => {
                record.grantee = values.collect::<Vec<_>>().join(PARTY_SEPARATOR);
            }
            ColumnKind::Consideration => {
                if let Some(first) = values.next() {
                    record.consideration = first;
                }
            }
            ColumnKind::LegalDescription => {
                if let Some(first) = values.next() {
                    record.legal_description = first;
                }
            }
        }
    }

    fn collect_action_links(&self, row: ElementRef<'_>, additional_info: &mut BTreeMap<String, String>) {
        for link in row.select(&ACTION_LINK) {
            let element = link.value();
            let Some(title) = element.attr("title").filter(|t| !t.is_empty()) else {
                continue;
            };
            let title = title.to_lowercase();
            let function = || element.attr("data-function").unwrap_or_default().to_string();

            if title.contains("view") {
                if let Some(url) = element.attr("href").and_then(|h| self.base.join(h).ok()) {
                    additional_info.insert("view_url".to_string(), url.to_string());
                }
            } else if title.contains("print") {
                additional_info.insert("print_function".to_string(), function());
            } else if title.contains("cart") {
                additional_info.insert("cart_function".to_string(), function());
            }
        }
    }
}

fn document_id(row: ElementRef<'_>) -> String {
    let element = row.value();
    if let Some(id) = element.attr("data-documentid").filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    element
        .attr("id")
        .and_then(|id| id.strip_prefix(ROW_ID_PREFIX))
        .unwrap_or_default()
        .to_string()
}

fn parse_recording_date(captures: &regex::Captures<'_>) -> Option<NaiveDate> {
    let month = captures[1].parse().ok()?;
    let day = captures[2].parse().ok()?;
    let year = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Text content of `element` with whitespace runs collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
