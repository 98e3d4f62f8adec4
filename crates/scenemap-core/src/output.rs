//! JSON rendering of the model and writing of output files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::FileKind;
use crate::error::ScanError;
use crate::model::ProjectModel;
use crate::pipeline::ScanResult;

/// Headline numbers printed after a scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanSummary {
    pub files: usize,
    pub scenes: usize,
    pub scripts: usize,
    pub resource_definitions: usize,
    pub resources: usize,
    pub unused_resources: usize,
    pub edges: usize,
    pub warnings: usize,
    pub total_ms: f64,
}

impl ScanSummary {
    pub fn from_result(result: &ScanResult) -> Self {
        let model = &result.model;
        Self {
            files: model.files.len(),
            scenes: model.count_of(FileKind::Scene),
            scripts: model.count_of(FileKind::Script),
            resource_definitions: model.count_of(FileKind::ResourceDefinition),
            resources: model.resources.len(),
            unused_resources: model.unused_resources.len(),
            edges: model.edges.len(),
            warnings: model.warnings.len(),
            total_ms: (result.total_ms * 10.0).round() / 10.0,
        }
    }
}

/// Pretty JSON for the model. Carries no timestamps, so it is byte-stable.
pub fn to_json(model: &ProjectModel) -> Result<String, ScanError> {
    Ok(serde_json::to_string_pretty(model)?)
}

fn write_text(path: &Path, text: &str) -> Result<(), ScanError> {
    let wrap = |source| ScanError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }
    std::fs::write(path, text).map_err(wrap)
}

/// Write the model as JSON, creating parent directories as needed.
pub fn write_json(model: &ProjectModel, output_path: impl AsRef<Path>) -> Result<(), ScanError> {
    write_text(output_path.as_ref(), &to_json(model)?)
}

/// Write a rendered Markdown report.
pub fn write_report(markdown: &str, output_path: impl AsRef<Path>) -> Result<(), ScanError> {
    write_text(output_path.as_ref(), markdown)
}
