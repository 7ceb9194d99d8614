// 📦 Data Model - source shapes and the unified companies dataset
//
// Wire names keep the spellings each source uses ("Date", "cashmoneh", ...).
// Fields the pipeline does not interpret are carried through `extra`.

use crate::cleaner::Record;
use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// Company-level fields dropped when a company enters the unified dataset
pub const DISCARDED_COMPANY_FIELDS: [&str; 2] = ["revenue", "calculated_revenue"];

// ============================================================================
// STRUCTURED-RECORD SOURCE (companies → employees / performance)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: Value,
    pub name: Value,
    pub role: Value,

    /// Compensation, `0` when the source held null. Kept as the source's
    /// number so integers stay integers in the raw view.
    #[serde(rename = "cashmoneh")]
    pub compensation: Number,

    /// Hire date, `"Unknown"` when the source held null
    pub hired_date: String,
}

impl Employee {
    pub fn compensation_amount(&self) -> f64 {
        self.compensation.as_f64().unwrap_or(0.0)
    }
}

/// One quarter of a company's performance as reported by the structured source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterReport {
    /// `0` when the source held null, zero or nothing
    pub revenue: Number,

    /// Always recomputed from revenue and payroll, never taken from input
    pub profit_margin: f64,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl QuarterReport {
    pub fn revenue_amount(&self) -> f64 {
        self.revenue.as_f64().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: i64,

    /// Company-level revenue, `0` when the source held null or omitted it.
    /// Any other value is carried as-is; the merge drops it.
    pub revenue: Value,

    pub employees: Vec<Employee>,

    pub performance: BTreeMap<String, QuarterReport>,

    /// name, industry, location, ...
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CompanyRecord {
    pub fn total_payroll(&self) -> f64 {
        self.employees.iter().map(Employee::compensation_amount).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredSource {
    pub companies: Vec<CompanyRecord>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StructuredSource {
    pub fn company(&self, id: i64) -> Option<&CompanyRecord> {
        self.companies.iter().find(|c| c.id == id)
    }
}

// ============================================================================
// SLIDE-DECK SOURCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyMetric {
    /// Quarter label as printed in the table ("Q1", "1", ...)
    pub quarter: String,
    pub revenue: f64,
    pub memberships_sold: i64,
    pub avg_duration_minutes: i64,
}

impl QuarterlyMetric {
    /// Quarter label without a leading "Q"
    pub fn quarter_number(&self) -> &str {
        let label = self.quarter.trim();
        label
            .strip_prefix('Q')
            .or_else(|| label.strip_prefix('q'))
            .unwrap_or(label)
    }
}

/// A declared narrative total replaced by the sum over the itemized table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalsCorrection {
    pub field: String,
    pub declared: Option<f64>,
    pub computed: f64,
}

/// Aggregate record parsed from the slide deck
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarterly_metrics: Option<Vec<QuarterlyMetric>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_revenue: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_memberships: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_distribution: Option<BTreeMap<String, f64>>,

    /// Corrections applied by the totals self-check
    #[serde(skip)]
    pub corrections: Vec<TotalsCorrection>,
}

// ============================================================================
// UNIFIED DATASET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "Date")]
    pub date: String,

    #[serde(rename = "Activity")]
    pub activity: String,

    #[serde(rename = "Location")]
    pub location: String,

    #[serde(rename = "Revenue")]
    pub revenue: f64,

    /// Membership_ID, Membership_Type, Duration (Minutes), ...
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Transaction {
    /// Build from a cleaned tabular record
    pub fn from_record(mut record: Record) -> Result<Self> {
        let context = "transaction record";
        let date = take_text(&mut record, "Date", context)?;
        let activity = take_text(&mut record, "Activity", context)?;
        let location = take_text(&mut record, "Location", context)?;
        let revenue = record
            .remove("Revenue")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| IngestError::missing_field("Revenue", context))?;

        Ok(Transaction {
            date,
            activity,
            location,
            revenue,
            extra: record,
        })
    }

    pub fn in_year(&self, year: i64) -> bool {
        self.date.starts_with(&year.to_string())
    }
}

fn take_text(record: &mut Record, field: &str, context: &str) -> Result<String> {
    match record.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(IngestError::missing_field(field, context)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_duration_minutes: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub memberships_sold: Option<i64>,

    pub revenue: f64,
    pub profit_margin: f64,

    /// Other quarter fields (expenses, ...) and any count that is not an integer
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl From<&QuarterReport> for Performance {
    /// Integer counts are lifted into typed fields; everything else stays in `extra`
    fn from(report: &QuarterReport) -> Self {
        let mut extra = report.extra.clone();
        let mut take_count = |key: &str| {
            let count = extra.get(key).and_then(Value::as_i64)?;
            extra.remove(key);
            Some(count)
        };

        Performance {
            avg_duration_minutes: take_count("avg_duration_minutes"),
            memberships_sold: take_count("memberships_sold"),
            revenue: report.revenue_amount(),
            profit_margin: report.profit_margin,
            extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualSummary {
    pub year: i64,
    pub total_memberships: i64,
    pub total_revenue: f64,

    /// Activity → percentage of that year's transaction revenue
    pub revenue_distribution: BTreeMap<String, f64>,

    pub top_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub employees: Vec<Employee>,
    pub performance: BTreeMap<String, Performance>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_summary: Option<Vec<AnnualSummary>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<Transaction>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDataset {
    pub companies: Vec<Company>,
}

impl UnifiedDataset {
    pub fn company(&self, id: i64) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }
}

// ============================================================================
// COMPANY BUILDER
// ============================================================================

/// Builds an output `Company` field-by-field from a read-only source company.
///
/// The source record is never mutated; discarded fields are simply not copied.
pub struct CompanyBuilder {
    company: Company,
}

impl CompanyBuilder {
    pub fn from_source(source: &CompanyRecord) -> Self {
        let extra = source
            .extra
            .iter()
            .filter(|(key, _)| !DISCARDED_COMPANY_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        CompanyBuilder {
            company: Company {
                id: source.id,
                employees: source.employees.clone(),
                performance: source
                    .performance
                    .iter()
                    .map(|(period, report)| (period.clone(), Performance::from(report)))
                    .collect(),
                annual_summary: None,
                transactions: None,
                extra,
            },
        }
    }

    pub fn performance(mut self, performance: BTreeMap<String, Performance>) -> Self {
        self.company.performance = performance;
        self
    }

    pub fn annual_summary(mut self, summaries: Vec<AnnualSummary>) -> Self {
        self.company.annual_summary = Some(summaries);
        self
    }

    pub fn transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.company.transactions = Some(transactions);
        self
    }

    /// Current performance map, for computing summaries before `build`
    pub fn current_performance(&self) -> &BTreeMap<String, Performance> {
        &self.company.performance
    }

    pub fn build(self) -> Company {
        self.company
    }
}

// ============================================================================
// TESTS
// ============================================================================
