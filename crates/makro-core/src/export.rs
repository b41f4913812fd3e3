//! JSON export format.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::types::TechnicalDescriptorSet;
use crate::error::ExportError;

/// Everything one analysis produced, in the shape handed to downstream tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisExport {
    /// Path of the analyzed file as given by the caller
    pub file: String,
    /// Descriptor set
    pub technical_analysis: TechnicalDescriptorSet,
    /// Production brief, six newline-separated segments
    pub ace_step_description: String,
}

impl AnalysisExport {
    pub fn new(
        file: impl Into<String>,
        technical_analysis: TechnicalDescriptorSet,
        ace_step_description: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            technical_analysis,
            ace_step_description: ace_step_description.into(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the pretty-printed export to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
