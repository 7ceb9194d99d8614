// Company Reports - Core Library
// Four raw sources → cleaned records → one unified companies dataset.
// Exposes all modules for use in the CLI, the API server, and tests.

pub mod cleaner;
pub mod config;
pub mod error;
pub mod extractors;
pub mod formats;
pub mod merge;
pub mod model;
pub mod processor;

// Re-export commonly used types
pub use cleaner::{first_present, CleanOutcome, CleaningStats, Record, RecordCleaner};
pub use config::PipelineConfig;
pub use error::{IngestError, Result};
pub use extractors::{
    Extractor, RowTableExtractor, SlideDeckExtractor, SourceData, SourceKind,
    StructuredExtractor, TabularExtractor, UnknownSourceKind,
};
pub use formats::{Deck, PageTableReader, PdfTableReader, Shape, Slide};
pub use merge::MergeEngine;
pub use model::{
    AnnualSummary, Company, CompanyRecord, DeckSummary, Employee, Performance,
    QuarterlyMetric, StructuredSource, Transaction, UnifiedDataset,
};
pub use processor::DataProcessor;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
