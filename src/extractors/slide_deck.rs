// Slide-Deck Extractor - quarterly metrics table + narrative summary text
//
// A table's rows 1..=4 (after the header) are per-quarter metrics; when the
// deck holds several tables the last one wins.
// Text shapes are read line by line through a two-state classifier:
//
//   SCANNING ──"Revenue Distribution:"──▶ IN_REVENUE_DISTRIBUTION
//       ▲                                        │
//       └──────────── end of text block ─────────┘
//
// After parsing, the declared totals are reconciled against the table sums.
// The itemized table wins; every correction is logged.

use super::{Extractor, SourceKind};
use crate::cleaner::{parse_grouped_f64, parse_grouped_i64};
use crate::error::{IngestError, Result};
use crate::formats::{load_deck, Deck, Shape};
use crate::model::{DeckSummary, QuarterlyMetric, TotalsCorrection};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TOTAL_REVENUE_LABEL: &str = "Total Revenue:";
pub const TOTAL_MEMBERSHIPS_LABEL: &str = "Total Memberships Sold:";
pub const TOP_LOCATION_LABEL: &str = "Top Location:";
pub const DISTRIBUTION_HEADER: &str = "Revenue Distribution:";

/// Number of quarter rows read after the table header
const QUARTER_ROWS: usize = 4;

static DOLLAR_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([\d,]+)").expect("valid regex"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

pub struct SlideDeckExtractor {
    path: PathBuf,
}

impl SlideDeckExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        SlideDeckExtractor {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Extractor for SlideDeckExtractor {
    type Output = DeckSummary;

    fn ingest(&self) -> Result<DeckSummary> {
        let deck = load_deck(&self.path)?;
        summarize_deck(&deck)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Pptx
    }
}

/// Parse every shape of the deck, then reconcile totals
pub fn summarize_deck(deck: &Deck) -> Result<DeckSummary> {
    let mut summary = DeckSummary::default();

    for shape in deck.shapes() {
        match shape {
            Shape::Table(rows) => summary.quarterly_metrics = Some(parse_metrics_table(rows)?),
            Shape::Text(text) => apply_text_block(&mut summary, text),
        }
    }

    reconcile_totals(&mut summary);
    Ok(summary)
}

// ============================================================================
// METRICS TABLE
// ============================================================================

pub fn parse_metrics_table(rows: &[Vec<String>]) -> Result<Vec<QuarterlyMetric>> {
    rows.iter()
        .enumerate()
        .skip(1)
        .take(QUARTER_ROWS)
        .map(|(index, cells)| parse_metric_row(index, cells))
        .collect()
}

fn parse_metric_row(index: usize, cells: &[String]) -> Result<QuarterlyMetric> {
    let cell = |column: usize, name: &str| -> Result<&str> {
        cells
            .get(column)
            .map(|c| c.trim())
            .ok_or_else(|| IngestError::missing_field(name, format!("slide table row {}", index)))
    };
    let invalid = |column: &str, value: &str| IngestError::InvalidCell {
        source_kind: SourceKind::Pptx.code(),
        row: index,
        column: column.to_string(),
        value: value.to_string(),
    };

    let quarter = cell(0, "quarter")?;
    let revenue = cell(1, "revenue")?;
    let memberships = cell(2, "memberships_sold")?;
    let duration = cell(3, "avg_duration_minutes")?;

    Ok(QuarterlyMetric {
        quarter: quarter.to_string(),
        revenue: parse_grouped_f64(&revenue.replace('$', "")).ok_or_else(|| invalid("revenue", revenue))?,
        memberships_sold: parse_grouped_i64(memberships)
            .ok_or_else(|| invalid("memberships_sold", memberships))?,
        avg_duration_minutes: duration
            .parse::<i64>()
            .map_err(|_| invalid("avg_duration_minutes", duration))?,
    })
}

// ============================================================================
// LINE CLASSIFIER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Scanning,
    InRevenueDistribution,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    TotalRevenue(Option<f64>),
    TotalMemberships(Option<i64>),
    TopLocation(Option<String>),
    DistributionHeader,
    DistributionEntry { key: String, percent: Option<f64> },
    Other,
}

/// Classify one trimmed, non-empty line. Label prefixes win over section
/// entries, so a "Top Location:" line inside the distribution is still a
/// top location.
pub fn classify_line(line: &str, state: LineState) -> LineKind {
    if line.starts_with(TOTAL_REVENUE_LABEL) {
        let amount = DOLLAR_AMOUNT
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_grouped_f64(m.as_str()));
        return LineKind::TotalRevenue(amount);
    }

    if line.starts_with(TOTAL_MEMBERSHIPS_LABEL) {
        let count = DIGITS.find(line).and_then(|m| m.as_str().parse().ok());
        return LineKind::TotalMemberships(count);
    }

    if line.starts_with(TOP_LOCATION_LABEL) {
        let location = line.split(": ").nth(1).map(|s| s.trim().to_string());
        return LineKind::TopLocation(location);
    }

    if line == DISTRIBUTION_HEADER {
        return LineKind::DistributionHeader;
    }

    if state == LineState::InRevenueDistribution {
        if let Some((label, value)) = line.split_once(": ") {
            let key = label.trim().to_lowercase().replace(' ', "_");
            let percent = value.replace('%', "").trim().parse::<f64>().ok();
            return LineKind::DistributionEntry { key, percent };
        }
    }

    LineKind::Other
}

/// Feed one text shape through the classifier. The section state does not
/// carry over into the next text block.
pub fn apply_text_block(summary: &mut DeckSummary, text: &str) {
    let mut state = LineState::Scanning;

    for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
        match classify_line(line, state) {
            LineKind::TotalRevenue(Some(amount)) => summary.total_revenue = Some(amount),
            LineKind::TotalMemberships(Some(count)) => summary.total_memberships = Some(count),
            LineKind::TopLocation(Some(location)) => summary.top_location = Some(location),
            LineKind::DistributionHeader => {
                summary.revenue_distribution = Some(BTreeMap::new());
                state = LineState::InRevenueDistribution;
            }
            LineKind::DistributionEntry {
                key,
                percent: Some(percent),
            } => {
                summary
                    .revenue_distribution
                    .get_or_insert_with(BTreeMap::new)
                    .insert(key, percent);
            }
            LineKind::Other => {}
            unreadable => debug!(line, kind = ?unreadable, "skipped unreadable summary line"),
        }
    }
}

// ============================================================================
// TOTALS RECONCILIATION
// ============================================================================

/// Overwrite declared totals that disagree with the table sums
pub fn reconcile_totals(summary: &mut DeckSummary) {
    let Some(metrics) = summary.quarterly_metrics.as_ref() else {
        return;
    };

    let computed_memberships: i64 = metrics.iter().map(|q| q.memberships_sold).sum();
    let computed_revenue: f64 = metrics.iter().map(|q| q.revenue).sum();

    if summary.total_memberships != Some(computed_memberships) {
        warn!(
            declared = ?summary.total_memberships,
            computed = computed_memberships,
            "correcting total_memberships from quarterly table"
        );
        summary.corrections.push(TotalsCorrection {
            field: "total_memberships".to_string(),
            declared: summary.total_memberships.map(|v| v as f64),
            computed: computed_memberships as f64,
        });
        summary.total_memberships = Some(computed_memberships);
    }

    if summary.total_revenue != Some(computed_revenue) {
        warn!(
            declared = ?summary.total_revenue,
            computed = computed_revenue,
            "correcting total_revenue from quarterly table"
        );
        summary.corrections.push(TotalsCorrection {
            field: "total_revenue".to_string(),
            declared: summary.total_revenue,
            computed: computed_revenue,
        });
        summary.total_revenue = Some(computed_revenue);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::Slide;

    fn metrics_table() -> Vec<Vec<String>> {
        [
            ["Quarter", "Revenue", "Memberships Sold", "Avg Duration (Minutes)"],
            ["Q1", "$2,500,000", "350", "60"],
            ["Q2", "$2,600,000", "370", "62"],
            ["Q3", "$2,700,000", "390", "58"],
            ["Q4", "$2,600,000", "410", "61"],
            ["Total", "$10,400,000", "1,520", "60"],
        ]
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
    }

    const SUMMARY_TEXT: &str = "Annual Summary\n\
        Total Revenue: $9,000,000\n\
        Total Memberships Sold: 1400\n\
        Top Location: Downtown\n\
        Revenue Distribution:\n\
        Gym: 40%\n\
        Personal Training: 35.5%\n\
        Pool: 24.5%";

    fn deck(text: &str) -> Deck {
        Deck {
            slides: vec![
                Slide {
                    shapes: vec![Shape::Table(metrics_table())],
                },
                Slide {
                    shapes: vec![Shape::Text(text.to_string())],
                },
            ],
        }
    }

    #[test]
    fn test_table_rows_after_header_only_four() {
        let metrics = parse_metrics_table(&metrics_table()).unwrap();

        assert_eq!(metrics.len(), 4);
        assert_eq!(metrics[0].quarter, "Q1");
        assert_eq!(metrics[0].revenue, 2500000.0);
        assert_eq!(metrics[3].memberships_sold, 410);
        assert_eq!(metrics[1].avg_duration_minutes, 62);
    }

    #[test]
    fn test_table_totals_override_narrative() {
        let summary = summarize_deck(&deck(SUMMARY_TEXT)).unwrap();

        assert_eq!(summary.total_revenue, Some(10400000.0));
        assert_eq!(summary.total_memberships, Some(1520));
        assert_eq!(summary.corrections.len(), 2);
        assert_eq!(summary.corrections[1].declared, Some(9000000.0));
    }

    #[test]
    fn test_matching_totals_are_not_corrected() {
        let text = "Total Revenue: $10,400,000\nTotal Memberships Sold: 1520";
        let summary = summarize_deck(&deck(text)).unwrap();

        assert!(summary.corrections.is_empty());
        assert_eq!(summary.total_memberships, Some(1520));
    }

    #[test]
    fn test_missing_totals_are_filled() {
        let summary = summarize_deck(&deck("Quarterly review")).unwrap();

        assert_eq!(summary.total_revenue, Some(10400000.0));
        assert_eq!(summary.corrections[0].declared, None);
    }

    #[test]
    fn test_narrative_fields() {
        let summary = summarize_deck(&deck(SUMMARY_TEXT)).unwrap();
        let distribution = summary.revenue_distribution.unwrap();

        assert_eq!(summary.top_location.as_deref(), Some("Downtown"));
        assert_eq!(distribution["gym"], 40.0);
        assert_eq!(distribution["personal_training"], 35.5);
        assert_eq!(distribution["pool"], 24.5);
    }

    #[test]
    fn test_classifier_states() {
        assert_eq!(
            classify_line("Gym: 40%", LineState::Scanning),
            LineKind::Other
        );
        assert_eq!(
            classify_line("Gym: 40%", LineState::InRevenueDistribution),
            LineKind::DistributionEntry {
                key: "gym".to_string(),
                percent: Some(40.0)
            }
        );
        assert_eq!(
            classify_line("Top Location: Uptown", LineState::InRevenueDistribution),
            LineKind::TopLocation(Some("Uptown".to_string()))
        );
        assert_eq!(
            classify_line("Revenue Distribution:", LineState::Scanning),
            LineKind::DistributionHeader
        );
    }

    #[test]
    fn test_distribution_section_ends_with_text_block() {
        let mut summary = DeckSummary::default();
        apply_text_block(&mut summary, "Revenue Distribution:\nGym: 60%");
        apply_text_block(&mut summary, "Presenter: Jordan");

        let distribution = summary.revenue_distribution.unwrap();
        assert_eq!(distribution.len(), 1);
        assert!(!distribution.contains_key("presenter"));
    }

    #[test]
    fn test_total_revenue_digits_only() {
        assert_eq!(
            classify_line("Total Revenue: $10,400,000", LineState::Scanning),
            LineKind::TotalRevenue(Some(10400000.0))
        );
        assert_eq!(
            classify_line("Total Revenue: TBD", LineState::Scanning),
            LineKind::TotalRevenue(None)
        );
        assert_eq!(
            classify_line("Total Memberships Sold: 1520 members", LineState::Scanning),
            LineKind::TotalMemberships(Some(1520))
        );
    }

    #[test]
    fn test_last_table_wins() {
        let mut later = metrics_table();
        later[1][2] = "500".to_string();
        let deck = Deck {
            slides: vec![
                Slide {
                    shapes: vec![Shape::Table(metrics_table())],
                },
                Slide {
                    shapes: vec![Shape::Table(later)],
                },
            ],
        };

        let summary = summarize_deck(&deck).unwrap();
        let metrics = summary.quarterly_metrics.unwrap();

        assert_eq!(metrics[0].memberships_sold, 500);
        assert_eq!(summary.total_memberships, Some(1670));
    }

    #[test]
    fn test_bad_table_cell_is_fatal() {
        let mut rows = metrics_table();
        rows[2][2] = "many".to_string();

        let result = parse_metrics_table(&rows);
        assert!(matches!(result, Err(IngestError::InvalidCell { row: 2, .. })));
    }

    #[test]
    fn test_short_table_row_is_fatal() {
        let rows = vec![
            vec!["Quarter".to_string()],
            vec!["Q1".to_string(), "$1".to_string()],
        ];
        assert!(parse_metrics_table(&rows).is_err());
    }

    #[test]
    fn test_deck_without_table_keeps_declared_totals() {
        let deck = Deck {
            slides: vec![Slide {
                shapes: vec![Shape::Text(SUMMARY_TEXT.to_string())],
            }],
        };
        let summary = summarize_deck(&deck).unwrap();

        assert!(summary.quarterly_metrics.is_none());
        assert_eq!(summary.total_revenue, Some(9000000.0));
        assert!(summary.corrections.is_empty());
    }
}
