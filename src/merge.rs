// 🔀 Merge Engine - four cleaned sources → one unified companies dataset
//
// Company 1: performance from the slide deck, transactions for its activities,
//            annual summaries overridden by the deck's narrative values
// Company 2: performance from the row table, all other transactions,
//            annual summaries purely computed
// Other ids: passed through with revenue fields dropped
//
// The loaded sources are read-only here. Output companies are assembled by
// `CompanyBuilder`; nothing is cloned-then-mutated.

use crate::cleaner::{first_present, round1, Record};
use crate::error::Result;
use crate::extractors::SourceData;
use crate::model::{
    AnnualSummary, CompanyBuilder, DeckSummary, Performance, Transaction, UnifiedDataset,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Activities whose transactions belong to company 1
pub const COMPANY_ONE_ACTIVITIES: [&str; 3] = ["Gym", "Pool", "Personal Training"];

pub const COMPANY_ONE_ID: i64 = 1;
pub const COMPANY_TWO_ID: i64 = 2;

/// The slide deck reports a single year
pub const DECK_YEAR: i64 = 2023;

pub const DEFAULT_DURATION_MINUTES: i64 = 90;
pub const DEFAULT_DECK_PROFIT_MARGIN: f64 = 99.1;
pub const DEFAULT_TABLE_PROFIT_MARGIN: f64 = 98.5;
pub const DEFAULT_TOP_LOCATION: &str = "Downtown";
pub const DEFAULT_TABLE_YEAR: i64 = 2022;
pub const DEFAULT_TABLE_QUARTER: &str = "Q1";

const MEMBERSHIP_KEYS: [&str; 2] = ["Memberships Sold", "memberships_sold"];
const REVENUE_KEYS: [&str; 2] = ["Revenue (in $)", "revenue"];
const DURATION_KEYS: [&str; 2] = ["Avg Duration (Minutes)", "avg_duration_minutes"];
const PROFIT_MARGIN_KEYS: [&str; 1] = ["profit_margin"];

// ============================================================================
// TRANSACTION PARTITION
// ============================================================================

/// Split tabular records into (company 1, company 2) by activity
pub fn partition_transactions(records: &[Record]) -> Result<(Vec<Transaction>, Vec<Transaction>)> {
    let mut company_one = Vec::new();
    let mut company_two = Vec::new();

    for record in records {
        let transaction = Transaction::from_record(record.clone())?;
        if COMPANY_ONE_ACTIVITIES.contains(&transaction.activity.as_str()) {
            company_one.push(transaction);
        } else {
            company_two.push(transaction);
        }
    }

    Ok((company_one, company_two))
}

// ============================================================================
// PERFORMANCE MAPS
// ============================================================================

/// Company 1 performance, keyed `"2023_Q{n}"`
pub fn deck_performance(deck: &DeckSummary) -> BTreeMap<String, Performance> {
    deck.quarterly_metrics
        .iter()
        .flatten()
        .map(|metric| {
            let key = format!("{}_Q{}", DECK_YEAR, metric.quarter_number());
            let performance = Performance {
                avg_duration_minutes: Some(metric.avg_duration_minutes),
                memberships_sold: Some(metric.memberships_sold),
                revenue: metric.revenue,
                profit_margin: DEFAULT_DECK_PROFIT_MARGIN,
                extra: BTreeMap::new(),
            };
            (key, performance)
        })
        .collect()
}

/// Company 2 performance, keyed `"{Year}_{Quarter}"`
pub fn table_performance(rows: &[Record]) -> BTreeMap<String, Performance> {
    rows.iter()
        .map(|row| {
            let year = row
                .get("Year")
                .and_then(Value::as_i64)
                .unwrap_or(DEFAULT_TABLE_YEAR);
            let quarter = match row.get("Quarter") {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => DEFAULT_TABLE_QUARTER.to_string(),
            };

            let performance = Performance {
                avg_duration_minutes: Some(
                    first_present(row, &DURATION_KEYS)
                        .and_then(integer_value)
                        .unwrap_or(DEFAULT_DURATION_MINUTES),
                ),
                memberships_sold: Some(
                    first_present(row, &MEMBERSHIP_KEYS)
                        .and_then(integer_value)
                        .unwrap_or(0),
                ),
                revenue: first_present(row, &REVENUE_KEYS)
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
                profit_margin: first_present(row, &PROFIT_MARGIN_KEYS)
                    .and_then(Value::as_f64)
                    .unwrap_or(DEFAULT_TABLE_PROFIT_MARGIN),
                extra: BTreeMap::new(),
            };

            (format!("{}_{}", year, quarter), performance)
        })
        .collect()
}

/// Integers pass, integral floats truncate, digit strings parse
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================================================
// ANNUAL SUMMARIES
// ============================================================================

/// Year component of a period key (`"2023_Q1"` → 2023)
pub fn period_year(key: &str) -> Option<i64> {
    key.split('_').next()?.trim().parse().ok()
}

/// One summary per distinct year in the performance keys, ascending
pub fn annual_summaries(
    performance: &BTreeMap<String, Performance>,
    transactions: &[Transaction],
) -> Vec<AnnualSummary> {
    let years: BTreeSet<i64> = performance
        .keys()
        .filter_map(|key| {
            let year = period_year(key);
            if year.is_none() {
                debug!(period = %key, "period key without a year");
            }
            year
        })
        .collect();

    years
        .into_iter()
        .map(|year| {
            let periods = performance
                .iter()
                .filter(|(key, _)| period_year(key) == Some(year))
                .map(|(_, p)| p);

            let mut total_memberships = 0;
            let mut total_revenue = 0.0;
            for period in periods {
                total_memberships += period.memberships_sold.unwrap_or(0);
                total_revenue += period.revenue;
            }

            let yearly: Vec<&Transaction> =
                transactions.iter().filter(|t| t.in_year(year)).collect();

            AnnualSummary {
                year,
                total_memberships,
                total_revenue,
                revenue_distribution: revenue_distribution(&yearly),
                top_location: top_location(&yearly),
            }
        })
        .collect()
}

/// Share of revenue per activity, in percent with one decimal.
///
/// Activity names are lower-cased with spaces replaced by underscores. When the
/// activities sum to zero every share is 0.0.
pub fn revenue_distribution(transactions: &[&Transaction]) -> BTreeMap<String, f64> {
    // First-seen order, so the total is summed in the same order every run
    let mut by_activity: Vec<(String, f64)> = Vec::new();
    for transaction in transactions {
        let activity = transaction.activity.to_lowercase().replace(' ', "_");
        match by_activity.iter_mut().find(|(seen, _)| *seen == activity) {
            Some((_, revenue)) => *revenue += transaction.revenue,
            None => by_activity.push((activity, transaction.revenue)),
        }
    }

    let total: f64 = by_activity.iter().map(|(_, revenue)| revenue).sum();
    by_activity
        .into_iter()
        .map(|(activity, revenue)| {
            let share = if total != 0.0 {
                round1(revenue / total * 100.0)
            } else {
                0.0
            };
            (activity, share)
        })
        .collect()
}

/// Most frequent location; ties go to the one seen first
pub fn top_location(transactions: &[&Transaction]) -> Option<String> {
    // Insertion-ordered counts
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for transaction in transactions {
        let location = transaction.location.as_str();
        match counts.iter_mut().find(|(seen, _)| *seen == location) {
            Some((_, count)) => *count += 1,
            None => counts.push((location, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (location, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((location, count));
        }
    }

    best.map(|(location, _)| location.to_string())
}

// ============================================================================
// MERGE ENGINE
// ============================================================================

pub struct MergeEngine<'a> {
    sources: &'a SourceData,
}

impl<'a> MergeEngine<'a> {
    pub fn new(sources: &'a SourceData) -> Self {
        MergeEngine { sources }
    }

    pub fn merge(&self) -> Result<UnifiedDataset> {
        let (company_one_txs, company_two_txs) =
            partition_transactions(&self.sources.transactions)?;

        info!(
            company_one = company_one_txs.len(),
            company_two = company_two_txs.len(),
            "partitioned transactions"
        );

        let mut companies = Vec::with_capacity(self.sources.structured.companies.len());
        for source in &self.sources.structured.companies {
            let builder = CompanyBuilder::from_source(source);

            let company = match source.id {
                COMPANY_ONE_ID => {
                    let performance = deck_performance(&self.sources.deck);
                    let summaries = self.with_deck_override(annual_summaries(&performance, &company_one_txs));
                    builder
                        .performance(performance)
                        .annual_summary(summaries)
                        .transactions(company_one_txs.clone())
                        .build()
                }
                COMPANY_TWO_ID => {
                    let performance = table_performance(&self.sources.quarterly_table);
                    let summaries = annual_summaries(&performance, &company_two_txs);
                    builder
                        .performance(performance)
                        .annual_summary(summaries)
                        .transactions(company_two_txs.clone())
                        .build()
                }
                other => {
                    debug!(company = other, "passing company through unchanged");
                    builder.build()
                }
            };

            companies.push(company);
        }

        info!(companies = companies.len(), "merged unified dataset");
        Ok(UnifiedDataset { companies })
    }

    /// Replace computed distribution and top location with the deck's narrative
    fn with_deck_override(&self, summaries: Vec<AnnualSummary>) -> Vec<AnnualSummary> {
        let deck = &self.sources.deck;
        let distribution = deck.revenue_distribution.clone().unwrap_or_default();
        let location = deck
            .top_location
            .clone()
            .unwrap_or_else(|| DEFAULT_TOP_LOCATION.to_string());

        summaries
            .into_iter()
            .map(|summary| AnnualSummary {
                revenue_distribution: distribution.clone(),
                top_location: Some(location.clone()),
                ..summary
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompanyRecord, QuarterReport, QuarterlyMetric, StructuredSource};
    use serde_json::json;

    fn tx(date: &str, activity: &str, location: &str, revenue: f64) -> Record {
        let mut record = Record::new();
        record.insert("Date".to_string(), json!(date));
        record.insert("Activity".to_string(), json!(activity));
        record.insert("Location".to_string(), json!(location));
        record.insert("Revenue".to_string(), json!(revenue));
        record
    }

    fn transactions() -> Vec<Record> {
        vec![
            tx("2023-01-02", "Gym", "Downtown", 100.0),
            tx("2023-01-03", "Yoga", "Uptown", 40.0),
            tx("2023-02-10", "Personal Training", "Eastside", 200.0),
            tx("2022-11-20", "Tennis", "Uptown", 60.0),
            tx("2023-03-15", "Pool", "Eastside", 100.0),
            tx("2022-12-01", "Spa", "Westside", 30.0),
            tx("2023-04-01", "Gym", "Downtown", 100.0),
        ]
    }

    fn company(id: i64) -> CompanyRecord {
        let mut extra = BTreeMap::new();
        extra.insert("name".to_string(), json!(format!("Company {}", id)));
        extra.insert("calculated_revenue".to_string(), json!(1.0));

        let mut performance = BTreeMap::new();
        performance.insert(
            "2021_Q4".to_string(),
            QuarterReport {
                revenue: serde_json::Number::from(10),
                profit_margin: 5.0,
                extra: BTreeMap::new(),
            },
        );

        CompanyRecord {
            id,
            revenue: json!(0),
            employees: Vec::new(),
            performance,
            extra,
        }
    }

    fn deck() -> DeckSummary {
        let metric = |quarter: &str, revenue: f64, sold: i64| QuarterlyMetric {
            quarter: quarter.to_string(),
            revenue,
            memberships_sold: sold,
            avg_duration_minutes: 60,
        };

        let mut distribution = BTreeMap::new();
        distribution.insert("gym".to_string(), 50.0);
        distribution.insert("pool".to_string(), 50.0);

        DeckSummary {
            quarterly_metrics: Some(vec![
                metric("Q1", 2500000.0, 350),
                metric("Q2", 2600000.0, 370),
            ]),
            total_revenue: Some(5100000.0),
            total_memberships: Some(720),
            top_location: Some("Riverside".to_string()),
            revenue_distribution: Some(distribution),
            corrections: Vec::new(),
        }
    }

    fn table_row(year: i64, quarter: &str, revenue: f64, sold: i64) -> Record {
        let mut record = Record::new();
        record.insert("Year".to_string(), json!(year));
        record.insert("Quarter".to_string(), json!(quarter));
        record.insert("Revenue (in $)".to_string(), json!(revenue));
        record.insert("Memberships Sold".to_string(), json!(sold));
        record.insert("Avg Duration (Minutes)".to_string(), json!("85"));
        record
    }

    fn sources() -> SourceData {
        SourceData {
            structured: StructuredSource {
                companies: vec![company(1), company(2), company(3)],
                extra: BTreeMap::new(),
            },
            transactions: transactions(),
            quarterly_table: vec![
                table_row(2022, "Q1", 2100000.0, 1200),
                table_row(2022, "Q2", 2200000.0, 1250),
                table_row(2023, "Q1", 2500000.0, 1400),
            ],
            deck: deck(),
        }
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let records = transactions();
        let (one, two) = partition_transactions(&records).unwrap();

        assert_eq!(one.len() + two.len(), records.len());
        assert!(one
            .iter()
            .all(|t| COMPANY_ONE_ACTIVITIES.contains(&t.activity.as_str())));
        assert!(two
            .iter()
            .all(|t| !COMPANY_ONE_ACTIVITIES.contains(&t.activity.as_str())));
    }

    #[test]
    fn test_deck_performance_keys() {
        let performance = deck_performance(&deck());

        let keys: Vec<&String> = performance.keys().collect();
        assert_eq!(keys, vec!["2023_Q1", "2023_Q2"]);
        assert_eq!(performance["2023_Q1"].profit_margin, 99.1);
        assert_eq!(performance["2023_Q2"].memberships_sold, Some(370));
    }

    #[test]
    fn test_table_performance_defaults() {
        let mut row = Record::new();
        row.insert("Year".to_string(), json!(2022));
        row.insert("Quarter".to_string(), json!("Q3"));
        row.insert("revenue".to_string(), json!(5.0));
        row.insert("Avg Duration (Minutes)".to_string(), json!("n/a"));

        let performance = table_performance(&[row]);
        let q3 = &performance["2022_Q3"];

        assert_eq!(q3.revenue, 5.0);
        assert_eq!(q3.memberships_sold, Some(0));
        assert_eq!(q3.avg_duration_minutes, Some(90));
        assert_eq!(q3.profit_margin, 98.5);
    }

    #[test]
    fn test_distribution_sums_to_hundred() {
        let (one, _) = partition_transactions(&transactions()).unwrap();
        let yearly: Vec<&Transaction> = one.iter().filter(|t| t.in_year(2023)).collect();
        let distribution = revenue_distribution(&yearly);

        let total: f64 = distribution.values().sum();
        assert!((total - 100.0).abs() < 0.2);
        assert_eq!(distribution["personal_training"], 40.0);
    }

    #[test]
    fn test_distribution_rounds_half_to_even() {
        let records = vec![
            tx("2023-01-01", "Gym", "Downtown", 49.0),
            tx("2023-01-02", "Pool", "Downtown", 351.0),
        ];
        let (one, _) = partition_transactions(&records).unwrap();
        let yearly: Vec<&Transaction> = one.iter().collect();
        let distribution = revenue_distribution(&yearly);

        // 49 / 400 * 100 = 12.25
        assert_eq!(distribution["gym"], 12.2);
        assert_eq!(distribution["pool"], 87.8);
    }

    #[test]
    fn test_zero_revenue_distribution() {
        let (_, two) = partition_transactions(&[tx("2023-01-01", "Spa", "Uptown", 0.0)]).unwrap();
        let yearly: Vec<&Transaction> = two.iter().collect();

        assert_eq!(revenue_distribution(&yearly)["spa"], 0.0);
    }

    #[test]
    fn test_top_location_tie_goes_to_first_seen() {
        let records = vec![
            tx("2023-01-01", "Spa", "Westside", 1.0),
            tx("2023-01-02", "Spa", "Uptown", 1.0),
            tx("2023-01-03", "Spa", "Uptown", 1.0),
            tx("2023-01-04", "Spa", "Westside", 1.0),
        ];
        let (_, two) = partition_transactions(&records).unwrap();
        let refs: Vec<&Transaction> = two.iter().collect();

        assert_eq!(top_location(&refs).as_deref(), Some("Westside"));
        assert_eq!(top_location(&[]), None);
    }

    #[test]
    fn test_company_two_summaries_are_computed() {
        let sources = sources();
        let unified = MergeEngine::new(&sources).merge().unwrap();
        let company = unified.company(2).unwrap();
        let summaries = company.annual_summary.as_ref().unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].year, 2022);
        assert_eq!(summaries[0].total_memberships, 2450);
        assert_eq!(summaries[0].total_revenue, 4300000.0);
        assert_eq!(summaries[0].top_location.as_deref(), Some("Uptown"));
        assert_eq!(summaries[1].revenue_distribution["yoga"], 100.0);
        assert_eq!(company.transactions.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn test_company_one_uses_deck_narrative() {
        let sources = sources();
        let unified = MergeEngine::new(&sources).merge().unwrap();
        let company = unified.company(1).unwrap();
        let summary = &company.annual_summary.as_ref().unwrap()[0];

        // Source performance is replaced, not extended
        assert!(!company.performance.contains_key("2021_Q4"));
        assert_eq!(summary.year, 2023);
        assert_eq!(summary.total_memberships, 720);
        assert_eq!(summary.top_location.as_deref(), Some("Riverside"));
        assert_eq!(summary.revenue_distribution["pool"], 50.0);
        assert!(!summary.revenue_distribution.contains_key("personal_training"));
    }

    #[test]
    fn test_company_one_defaults_without_narrative() {
        let mut sources = sources();
        sources.deck.top_location = None;
        sources.deck.revenue_distribution = None;

        let unified = MergeEngine::new(&sources).merge().unwrap();
        let summary = &unified.company(1).unwrap().annual_summary.as_ref().unwrap()[0];

        assert_eq!(summary.top_location.as_deref(), Some("Downtown"));
        assert!(summary.revenue_distribution.is_empty());
    }

    #[test]
    fn test_other_companies_pass_through() {
        let sources = sources();
        let unified = MergeEngine::new(&sources).merge().unwrap();
        let third = unified.company(3).unwrap();

        assert!(third.annual_summary.is_none());
        assert!(third.transactions.is_none());
        assert!(third.performance.contains_key("2021_Q4"));
        assert!(!third.extra.contains_key("calculated_revenue"));
    }

    #[test]
    fn test_sources_are_not_mutated() {
        let sources = sources();
        let before = sources.clone();
        MergeEngine::new(&sources).merge().unwrap();

        assert_eq!(sources, before);
    }

    #[test]
    fn test_period_year() {
        assert_eq!(period_year("2023_Q1"), Some(2023));
        assert_eq!(period_year("Q1"), None);
    }
}
