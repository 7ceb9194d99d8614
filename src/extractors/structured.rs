// Structured-Record Extractor - companies → employees / quarterly performance
//
// Per company:
//   - keep only employees carrying every required key (values may be null)
//   - null compensation → 0, null hire date → "Unknown"
//   - null / missing company revenue → 0
//   - every quarter's profit_margin is recomputed from revenue and payroll

use super::{Extractor, SourceKind};
use crate::cleaner::round1;
use crate::error::{IngestError, Result};
use crate::model::{CompanyRecord, Employee, QuarterReport, StructuredSource};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keys an employee record must carry to be kept
pub const REQUIRED_EMPLOYEE_KEYS: [&str; 5] = ["cashmoneh", "hired_date", "id", "name", "role"];

pub const UNKNOWN_HIRE_DATE: &str = "Unknown";

pub struct StructuredExtractor {
    path: PathBuf,
}

impl StructuredExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        StructuredExtractor {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Extractor for StructuredExtractor {
    type Output = StructuredSource;

    fn ingest(&self) -> Result<StructuredSource> {
        let text = fs::read_to_string(&self.path).map_err(|e| IngestError::io(&self.path, e))?;
        let document: Value = serde_json::from_str(&text)?;
        clean_document(document)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Json
    }
}

/// Profit margin in percent, one decimal.
///
/// `quarterly_payroll = total_payroll / 4`; a quarter without revenue has a
/// margin of exactly 0.0.
pub fn profit_margin(revenue: f64, total_payroll: f64) -> f64 {
    if revenue > 0.0 {
        let quarterly_payroll = total_payroll / 4.0;
        round1((revenue - quarterly_payroll) / revenue * 100.0)
    } else {
        0.0
    }
}

pub fn clean_document(document: Value) -> Result<StructuredSource> {
    let Value::Object(mut root) = document else {
        return Err(IngestError::missing_field("companies", "structured document root"));
    };

    let companies = match root.remove("companies") {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            return Err(IngestError::missing_field("companies", "structured document root"))
        }
    };

    let companies = companies
        .into_iter()
        .enumerate()
        .map(|(index, company)| clean_company(index, company))
        .collect::<Result<Vec<_>>>()?;

    info!(
        source = SourceKind::Json.code(),
        companies = companies.len(),
        employees = companies.iter().map(|c| c.employees.len()).sum::<usize>(),
        "cleaned source"
    );

    Ok(StructuredSource {
        companies,
        extra: root.into_iter().collect(),
    })
}

fn clean_company(index: usize, company: Value) -> Result<CompanyRecord> {
    let context = format!("company #{}", index);
    let Value::Object(mut fields) = company else {
        return Err(IngestError::missing_field("id", context));
    };

    let id = fields
        .remove("id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| IngestError::missing_field("id", context.clone()))?;

    let revenue = match fields.remove("revenue") {
        None | Some(Value::Null) => Value::from(0),
        Some(other) => other,
    };

    let employees = match fields.remove("employees") {
        Some(Value::Array(items)) => clean_employees(items, &context)?,
        _ => Vec::new(),
    };
    let total_payroll: f64 = employees.iter().map(Employee::compensation_amount).sum();

    let performance = match fields.remove("performance") {
        Some(Value::Object(quarters)) => quarters
            .into_iter()
            .map(|(period, data)| -> Result<(String, QuarterReport)> {
                let report = recompute_quarter(data, total_payroll, &context)?;
                Ok((period, report))
            })
            .collect::<Result<BTreeMap<_, _>>>()?,
        _ => BTreeMap::new(),
    };

    Ok(CompanyRecord {
        id,
        revenue,
        employees,
        performance,
        extra: fields.into_iter().collect(),
    })
}

fn clean_employees(items: Vec<Value>, context: &str) -> Result<Vec<Employee>> {
    let mut employees = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(mut fields) = item else {
            debug!(context, employee = index, "dropped non-object employee");
            continue;
        };

        if let Some(missing) = REQUIRED_EMPLOYEE_KEYS.iter().find(|k| !fields.contains_key(**k)) {
            debug!(context, employee = index, missing = *missing, "dropped incomplete employee");
            continue;
        }

        let compensation = number_or_zero(fields.remove("cashmoneh"), "cashmoneh", context)?;
        let hired_date = match take(&mut fields, "hired_date") {
            Value::Null => UNKNOWN_HIRE_DATE.to_string(),
            Value::String(s) => s,
            other => other.to_string(),
        };

        employees.push(Employee {
            id: take(&mut fields, "id"),
            name: take(&mut fields, "name"),
            role: take(&mut fields, "role"),
            compensation,
            hired_date,
        });
    }

    Ok(employees)
}

fn recompute_quarter(data: Value, total_payroll: f64, context: &str) -> Result<QuarterReport> {
    let mut fields = match data {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };

    // A zero revenue counts as missing
    let revenue = number_or_zero(fields.remove("revenue"), "revenue", context)?;
    let revenue = if revenue.as_f64() == Some(0.0) {
        Number::from(0)
    } else {
        revenue
    };
    fields.remove("profit_margin");

    Ok(QuarterReport {
        profit_margin: profit_margin(revenue.as_f64().unwrap_or(0.0), total_payroll),
        revenue,
        extra: fields.into_iter().collect(),
    })
}

fn take(fields: &mut Map<String, Value>, key: &str) -> Value {
    fields.remove(key).unwrap_or(Value::Null)
}

/// Missing or null → 0; numbers pass unchanged; anything else is structurally wrong
fn number_or_zero(value: Option<Value>, field: &str, context: &str) -> Result<Number> {
    match value {
        None | Some(Value::Null) => Ok(Number::from(0)),
        Some(Value::Number(n)) => Ok(n),
        Some(other) => Err(IngestError::InvalidCell {
            source_kind: SourceKind::Json.code(),
            row: 0,
            column: format!("{} ({})", field, context),
            value: other.to_string(),
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
