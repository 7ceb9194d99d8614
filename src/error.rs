// Error taxonomy for the ingestion pipeline
//
// Only structural failures surface here. Row-level rejections and field-parse
// defaults are counted by the cleaner and never become errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF parse failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("presentation archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("presentation XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("no extractable table on the first page of {}", path.display())]
    MissingTable { path: PathBuf },

    #[error("{source_kind}: invalid value {value:?} in row {row}, column {column}")]
    InvalidCell {
        source_kind: &'static str,
        row: usize,
        column: String,
        value: String,
    },

    #[error("missing field {field:?} in {context}")]
    MissingField { field: String, context: String },
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing_field(field: &str, context: impl Into<String>) -> Self {
        IngestError::MissingField {
            field: field.to_string(),
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
