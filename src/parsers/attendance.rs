use crate::markup::{ATTENDANCE_FRAGMENT, RowField, RowSchema};
use crate::models::{AttendanceTally, SubjectRecord};
use crate::parsers::profile::element_text;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single attendance fragment could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowParseError {
    #[error("row has no {0:?} field")]
    MissingField(RowField),

    #[error("{field:?} field is not a count: {value:?}")]
    InvalidCount { field: RowField, value: String },

    #[error("invalid row selector: {0}")]
    Selector(String),
}

/// One successfully parsed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub subject_code: String,
    pub record: SubjectRecord,
}

/// Number of attendance fragments in the page snapshot.
pub fn count_fragments(html: &str) -> usize {
    let document = Html::parse_document(html);
    match Selector::parse(ATTENDANCE_FRAGMENT) {
        Ok(selector) => document.select(&selector).count(),
        Err(_) => 0,
    }
}

/// Parses every attendance fragment in the page into a tally.
///
/// Rows that fail to parse are logged and left out; they never abort the
/// remaining rows.
pub fn parse_attendance_from_html(html: &str, schema: &RowSchema) -> AttendanceTally {
    let document = Html::parse_document(html);
    let mut tally = AttendanceTally::new();

    let Ok(fragment_selector) = Selector::parse(ATTENDANCE_FRAGMENT) else {
        return tally;
    };

    for (index, fragment) in document.select(&fragment_selector).enumerate() {
        match parse_row(fragment, schema) {
            Ok(row) => {
                debug!(subject = %row.subject_code, present = row.record.present,
                    conducted = row.record.conducted, "Parsed attendance row");
                tally.record(row.subject_code, row.record);
            }
            Err(e) => warn!(row = index, "Skipping attendance row: {}", e),
        }
    }

    tally
}

/// Reads one fragment by the structural positions in `schema`.
pub fn parse_row(fragment: ElementRef<'_>, schema: &RowSchema) -> Result<ParsedRow, RowParseError> {
    let subject_code = field_text(fragment, schema, RowField::SubjectCode)?;
    let present = parse_count(fragment, schema, RowField::Present)?;
    let conducted = parse_count(fragment, schema, RowField::Conducted)?;

    Ok(ParsedRow {
        subject_code,
        record: SubjectRecord::new(present, conducted),
    })
}

fn field_text(
    fragment: ElementRef<'_>,
    schema: &RowSchema,
    field: RowField,
) -> Result<String, RowParseError> {
    let selector = Selector::parse(&schema.selector(field))
        .map_err(|e| RowParseError::Selector(e.to_string()))?;
    fragment
        .select(&selector)
        .next()
        .map(element_text)
        .ok_or(RowParseError::MissingField(field))
}

/// Blank counts read as zero. Signed values are kept as printed.
fn parse_count(
    fragment: ElementRef<'_>,
    schema: &RowSchema,
    field: RowField,
) -> Result<i64, RowParseError> {
    let text = field_text(fragment, schema, field)?;
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<i64>().map_err(|_| RowParseError::InvalidCount { field, value: text })
}
