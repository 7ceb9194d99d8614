// 🏗️ Extractor Framework - one extractor per raw source format
//
// Every extractor honours the same minimal contract: `ingest()` returns the
// cleaned data for its source or fails on I/O / structural problems.

pub mod row_table;
pub mod slide_deck;
pub mod structured;
pub mod tabular;

pub use row_table::RowTableExtractor;
pub use slide_deck::{LineKind, LineState, SlideDeckExtractor};
pub use structured::StructuredExtractor;
pub use tabular::TabularExtractor;

use crate::cleaner::Record;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::formats::PdfTableReader;
use crate::model::{DeckSummary, StructuredSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

// ============================================================================
// SOURCE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Json,
    Csv,
    Pdf,
    Pptx,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Json,
        SourceKind::Csv,
        SourceKind::Pdf,
        SourceKind::Pptx,
    ];

    /// Short code used by the query interface
    pub fn code(&self) -> &'static str {
        match self {
            SourceKind::Json => "json",
            SourceKind::Csv => "csv",
            SourceKind::Pdf => "pdf",
            SourceKind::Pptx => "pptx",
        }
    }

    /// Human-readable name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Json => "structured records",
            SourceKind::Csv => "tabular transactions",
            SourceKind::Pdf => "document table",
            SourceKind::Pptx => "slide deck",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSourceKind(pub String);

impl fmt::Display for UnknownSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source type {:?} (expected json, csv, pdf or pptx)", self.0)
    }
}

impl std::error::Error for UnknownSourceKind {}

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    /// Case-insensitive
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSourceKind(s.to_string()))
    }
}

// ============================================================================
// EXTRACTOR TRAIT
// ============================================================================

pub trait Extractor {
    type Output;

    /// Load and clean the source
    fn ingest(&self) -> Result<Self::Output>;

    /// Which source this extractor handles
    fn source_kind(&self) -> SourceKind;
}

// ============================================================================
// LOADED SOURCES
// ============================================================================

/// The four cleaned sources, as handed to the merge engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceData {
    pub structured: StructuredSource,
    pub transactions: Vec<Record>,
    pub quarterly_table: Vec<Record>,
    pub deck: DeckSummary,
}

impl SourceData {
    /// Run every extractor once, in order. Any failure is fatal.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let structured = StructuredExtractor::new(&config.json_path).ingest()?;
        let transactions = TabularExtractor::new(&config.csv_path).ingest()?;
        let quarterly_table =
            RowTableExtractor::new(PdfTableReader::new(&config.pdf_path)).ingest()?;
        let deck = SlideDeckExtractor::new(&config.pptx_path).ingest()?;

        info!(
            companies = structured.companies.len(),
            transactions = transactions.len(),
            quarterly_rows = quarterly_table.len(),
            "loaded all sources"
        );

        Ok(SourceData {
            structured,
            transactions,
            quarterly_table,
            deck,
        })
    }
}
