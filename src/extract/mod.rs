//! Structured records from result-page markup.

mod extractor;
mod record;

pub use extractor::{Extraction, PARTY_SEPARATOR, PageLayout, RecordExtractor, RowSkip};
pub use record::{DocumentRecord, DocumentType, RAW_RECORDING_DATE_KEY};
