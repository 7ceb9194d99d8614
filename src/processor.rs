// 🗂️ Data Processor - load once, merge once, serve read-only views
//
// Built at startup: all four extractors run in order, the merge engine builds
// the unified dataset, and each raw source is rendered to JSON once. Nothing is
// mutated afterwards, so the processor can be shared freely across readers.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::extractors::{SourceData, SourceKind};
use crate::merge::MergeEngine;
use crate::model::UnifiedDataset;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone)]
pub struct DataProcessor {
    sources: SourceData,
    raw_views: BTreeMap<SourceKind, Value>,
    unified: UnifiedDataset,
}

impl DataProcessor {
    /// Run the whole pipeline. Any load failure aborts construction.
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        info!(
            json = %config.json_path.display(),
            csv = %config.csv_path.display(),
            pdf = %config.pdf_path.display(),
            pptx = %config.pptx_path.display(),
            "loading sources"
        );

        let sources = SourceData::load(config)?;
        Self::from_sources(sources)
    }

    /// Merge already-loaded sources
    pub fn from_sources(sources: SourceData) -> Result<Self> {
        let unified = MergeEngine::new(&sources).merge()?;

        let mut raw_views = BTreeMap::new();
        raw_views.insert(SourceKind::Json, serde_json::to_value(&sources.structured)?);
        raw_views.insert(SourceKind::Csv, serde_json::to_value(&sources.transactions)?);
        raw_views.insert(SourceKind::Pdf, serde_json::to_value(&sources.quarterly_table)?);
        raw_views.insert(SourceKind::Pptx, serde_json::to_value(&sources.deck)?);

        Ok(DataProcessor {
            sources,
            raw_views,
            unified,
        })
    }

    /// The merged `{companies: [...]}` dataset
    pub fn unified_data(&self) -> &UnifiedDataset {
        &self.unified
    }

    /// Raw cleaned source by name (`json`, `csv`, `pdf`, `pptx`; any case).
    /// Unknown names yield an empty object.
    pub fn get_data_by_type(&self, name: &str) -> Value {
        name.parse::<SourceKind>()
            .ok()
            .and_then(|kind| self.raw_view(kind).cloned())
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    pub fn raw_view(&self, kind: SourceKind) -> Option<&Value> {
        self.raw_views.get(&kind)
    }

    pub fn sources(&self) -> &SourceData {
        &self.sources
    }
}

// ============================================================================
// TESTS
// ============================================================================
