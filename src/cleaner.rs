// 🧹 Record Cleaner - shared data-quality policy for every extractor
//
// Two rules, applied in this order:
//   1. Reject: any null / placeholder value drops the whole record (no repair)
//   2. Coerce: designated amount fields are parsed to floats, defaulting to 0.0
//
// A bad amount string is replaced. A placeholder anywhere in the row is not.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A flat record: column/field name → scalar value
pub type Record = BTreeMap<String, Value>;

/// String values treated as missing data (matched exactly, no case folding)
pub const PLACEHOLDERS: [&str; 4] = ["null", "none", "unknown", ""];

// ============================================================================
// VALUE HELPERS
// ============================================================================

/// True for `null` and for the placeholder strings
pub fn is_placeholder(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => PLACEHOLDERS.contains(&s.as_str()),
        _ => false,
    }
}

/// Name of the first field holding a placeholder, if any
pub fn find_placeholder(record: &Record) -> Option<&str> {
    record
        .iter()
        .find(|(_, value)| is_placeholder(value))
        .map(|(field, _)| field.as_str())
}

/// Infer a scalar from raw cell text: integer, then float, then string.
/// Empty cells become `null`.
pub fn infer_scalar(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(float) = parse_finite_f64(trimmed) {
        return Value::from(float);
    }
    Value::String(cell.to_string())
}

fn parse_finite_f64(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce an amount-like value to a float.
///
/// Numbers are widened to `f64`; strings are parsed and fall back to `0.0`
/// when they are not numeric. Other values are returned unchanged.
pub fn coerce_amount(value: &Value) -> Value {
    match value {
        Value::Number(n) => n.as_f64().map(Value::from).unwrap_or_else(|| value.clone()),
        Value::String(s) => Value::from(parse_finite_f64(s).unwrap_or(0.0)),
        other => other.clone(),
    }
}

/// Parse a number that may carry thousands separators: "2,100,000" → 2100000.0
pub fn parse_grouped_f64(text: &str) -> Option<f64> {
    let stripped: String = text.trim().chars().filter(|c| *c != ',').collect();
    parse_finite_f64(&stripped)
}

/// Parse an integer that may carry thousands separators: "1,520" → 1520
pub fn parse_grouped_i64(text: &str) -> Option<i64> {
    let stripped: String = text.trim().chars().filter(|c| *c != ',').collect();
    stripped.parse::<i64>().ok()
}

/// Reconcile alternate key spellings across sources.
///
/// Returns the value of the first key that is present and not `null`.
///
/// # Example:
/// ```
/// use company_reports::cleaner::{first_present, Record};
/// use serde_json::json;
///
/// let mut row = Record::new();
/// row.insert("Memberships Sold".to_string(), json!(300));
/// let sold = first_present(&row, &["memberships_sold", "Memberships Sold"]);
/// assert_eq!(sold, Some(&json!(300)));
/// ```
pub fn first_present<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Round to one decimal place.
///
/// Works from the exact binary value and sends ties to the even digit, so
/// 12.25 → 12.2 and 0.35 (stored just below) → 0.3.
pub fn round1(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

// ============================================================================
// RECORD CLEANER
// ============================================================================

/// Outcome of cleaning one record
#[derive(Debug, Clone, PartialEq)]
pub enum CleanOutcome {
    Kept(Record),
    Rejected { field: String },
}

pub struct RecordCleaner {
    /// Fields coerced with `coerce_amount` after rejection passes
    amount_fields: Vec<String>,
}

impl RecordCleaner {
    pub fn new() -> Self {
        RecordCleaner {
            amount_fields: Vec::new(),
        }
    }

    /// Builder pattern: designate an amount-like field
    pub fn with_amount_field(mut self, field: &str) -> Self {
        self.amount_fields.push(field.to_string());
        self
    }

    pub fn clean(&self, mut record: Record) -> CleanOutcome {
        if let Some(field) = find_placeholder(&record) {
            return CleanOutcome::Rejected {
                field: field.to_string(),
            };
        }

        for field in &self.amount_fields {
            if let Some(value) = record.get_mut(field) {
                *value = coerce_amount(value);
            }
        }

        CleanOutcome::Kept(record)
    }

    /// Clean a batch, keeping order and collecting stats
    pub fn clean_all(
        &self,
        source: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> (Vec<Record>, CleaningStats) {
        let mut stats = CleaningStats::new(source);
        let mut kept = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            match self.clean(record) {
                CleanOutcome::Kept(record) => {
                    stats.record_kept();
                    kept.push(record);
                }
                CleanOutcome::Rejected { field } => {
                    debug!(source, row = index, field = %field, "rejected record with placeholder value");
                    stats.record_rejected();
                }
            }
        }

        (kept, stats)
    }
}

impl Default for RecordCleaner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// CLEANING STATS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub source: String,
    pub total: usize,
    pub kept: usize,
    pub rejected: usize,
}

impl CleaningStats {
    pub fn new(source: &str) -> Self {
        CleaningStats {
            source: source.to_string(),
            ..Default::default()
        }
    }

    pub fn record_kept(&mut self) {
        self.total += 1;
        self.kept += 1;
    }

    pub fn record_rejected(&mut self) {
        self.total += 1;
        self.rejected += 1;
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows read, {} kept, {} rejected",
            self.source, self.total, self.kept, self.rejected
        )
    }

    pub fn log(&self) {
        info!(
            source = %self.source,
            total = self.total,
            kept = self.kept,
            rejected = self.rejected,
            "cleaned source"
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
