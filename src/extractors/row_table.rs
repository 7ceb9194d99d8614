// Row-Table Extractor - one table from a page-oriented document
//
// Header cells become column names (trimmed). For each data row:
//   - any placeholder drops the row
//   - Year must parse as an integer, else the row is dropped
//   - "Revenue (in $)" drops its thousands separators and must parse as a float
//   - "Memberships Sold" drops its thousands separators and must parse as an int
// Any field-level failure drops the whole row silently.

use super::{Extractor, SourceKind};
use crate::cleaner::{find_placeholder, parse_grouped_f64, parse_grouped_i64, CleaningStats, Record};
use crate::error::Result;
use crate::formats::{PageTable, PageTableReader};
use serde_json::Value;
use tracing::debug;

pub const YEAR_FIELD: &str = "Year";
pub const REVENUE_FIELD: &str = "Revenue (in $)";
pub const MEMBERSHIPS_FIELD: &str = "Memberships Sold";

pub struct RowTableExtractor<R: PageTableReader> {
    reader: R,
}

impl<R: PageTableReader> RowTableExtractor<R> {
    pub fn new(reader: R) -> Self {
        RowTableExtractor { reader }
    }
}

impl<R: PageTableReader> Extractor for RowTableExtractor<R> {
    type Output = Vec<Record>;

    fn ingest(&self) -> Result<Vec<Record>> {
        let table = self.reader.first_page_table()?;
        debug!(origin = %self.reader.origin(), rows = table.len(), "read page table");

        let (records, stats) = clean_table(&table);
        stats.log();

        Ok(records)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Pdf
    }
}

/// Zip each data row with the header and keep the rows that survive cleaning
pub fn clean_table(table: &PageTable) -> (Vec<Record>, CleaningStats) {
    let mut stats = CleaningStats::new(SourceKind::Pdf.code());
    let mut records = Vec::new();

    let Some((header, rows)) = table.split_first() else {
        return (records, stats);
    };

    let columns: Vec<String> = header
        .iter()
        .map(|cell| cell.as_deref().unwrap_or("").trim().to_string())
        .collect();

    for (index, row) in rows.iter().enumerate() {
        let record: Record = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = row
                    .get(i)
                    .cloned()
                    .flatten()
                    .map(Value::String)
                    .unwrap_or(Value::Null);
                (column.clone(), value)
            })
            .collect();

        match clean_row(record) {
            Ok(record) => {
                stats.record_kept();
                records.push(record);
            }
            Err(reason) => {
                debug!(row = index + 1, reason = %reason, "dropped table row");
                stats.record_rejected();
            }
        }
    }

    (records, stats)
}

/// Why a row was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum RowRejection {
    Placeholder(String),
    MissingYear,
    InvalidNumber { field: &'static str, value: String },
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowRejection::Placeholder(field) => write!(f, "placeholder in {}", field),
            RowRejection::MissingYear => write!(f, "missing {}", YEAR_FIELD),
            RowRejection::InvalidNumber { field, value } => {
                write!(f, "invalid {} value {:?}", field, value)
            }
        }
    }
}

pub fn clean_row(mut record: Record) -> std::result::Result<Record, RowRejection> {
    if let Some(field) = find_placeholder(&record) {
        return Err(RowRejection::Placeholder(field.to_string()));
    }

    let year = record.get(YEAR_FIELD).ok_or(RowRejection::MissingYear)?;
    let year = value_text(year)
        .trim()
        .parse::<i64>()
        .map_err(|_| invalid(YEAR_FIELD, year))?;
    record.insert(YEAR_FIELD.to_string(), Value::from(year));

    if let Some(revenue) = record.get(REVENUE_FIELD) {
        let parsed = parse_grouped_f64(&value_text(revenue)).ok_or_else(|| invalid(REVENUE_FIELD, revenue))?;
        record.insert(REVENUE_FIELD.to_string(), Value::from(parsed));
    }

    if let Some(memberships) = record.get(MEMBERSHIPS_FIELD) {
        let parsed = parse_grouped_i64(&value_text(memberships))
            .ok_or_else(|| invalid(MEMBERSHIPS_FIELD, memberships))?;
        record.insert(MEMBERSHIPS_FIELD.to_string(), Value::from(parsed));
    }

    Ok(record)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid(field: &'static str, value: &Value) -> RowRejection {
    RowRejection::InvalidNumber {
        field,
        value: value_text(value),
    }
}

// ============================================================================
// TESTS
// ============================================================================
