// Pipeline configuration - where the four sources live and where the API binds

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_JSON_PATH: &str = "datasets/dataset1.json";
pub const DEFAULT_CSV_PATH: &str = "datasets/dataset2.csv";
pub const DEFAULT_PDF_PATH: &str = "datasets/dataset3.pdf";
pub const DEFAULT_PPTX_PATH: &str = "datasets/dataset4.pptx";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Structured-record source (companies → employees/performance)
    pub json_path: PathBuf,

    /// Tabular transaction source
    pub csv_path: PathBuf,

    /// Page-oriented document holding the quarterly table
    pub pdf_path: PathBuf,

    /// Slide deck with the quarterly metrics table and narrative summary
    pub pptx_path: PathBuf,

    /// Address the read API listens on
    pub bind_addr: String,
}

impl PipelineConfig {
    /// All four sources under one directory, using the default file names
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let file = |default: &str| {
            let name = PathBuf::from(default);
            dir.join(name.file_name().unwrap_or(name.as_os_str()))
        };

        PipelineConfig {
            json_path: file(DEFAULT_JSON_PATH),
            csv_path: file(DEFAULT_CSV_PATH),
            pdf_path: file(DEFAULT_PDF_PATH),
            pptx_path: file(DEFAULT_PPTX_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            json_path: PathBuf::from(DEFAULT_JSON_PATH),
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            pdf_path: PathBuf::from(DEFAULT_PDF_PATH),
            pptx_path: PathBuf::from(DEFAULT_PPTX_PATH),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}
