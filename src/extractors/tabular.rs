// Tabular Extractor - row-oriented CSV with a header row
//
// Cells are inferred to int / float / string, then each row goes through the
// shared cleaner with `Revenue` as the amount field. Nothing else is changed.

use super::{Extractor, SourceKind};
use crate::cleaner::{infer_scalar, Record, RecordCleaner};
use crate::error::{IngestError, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const AMOUNT_FIELD: &str = "Revenue";

pub struct TabularExtractor {
    path: PathBuf,
}

impl TabularExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        TabularExtractor {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read and clean CSV from any reader
    pub fn ingest_reader<R: Read>(reader: R) -> Result<Vec<Record>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();

        for result in reader.records() {
            let row = result?;
            let record: Record = headers
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let value = row.get(i).map(infer_scalar).unwrap_or_default();
                    (column.to_string(), value)
                })
                .collect();
            rows.push(record);
        }

        let cleaner = RecordCleaner::new().with_amount_field(AMOUNT_FIELD);
        let (cleaned, stats) = cleaner.clean_all(SourceKind::Csv.code(), rows);
        stats.log();

        Ok(cleaned)
    }
}

impl Extractor for TabularExtractor {
    type Output = Vec<Record>;

    fn ingest(&self) -> Result<Vec<Record>> {
        let file = File::open(&self.path).map_err(|e| IngestError::io(&self.path, e))?;
        Self::ingest_reader(file)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Csv
    }
}
