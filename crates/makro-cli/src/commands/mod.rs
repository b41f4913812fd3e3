//! CLI command implementations

pub mod analyze;
pub mod doctor;
pub mod json_output;

use anyhow::{Context, Result};
use makro_core::PipelineConfig;
use std::path::Path;

/// Config from `path`, or the defaults when no file was given.
pub(crate) fn load_config(path: Option<&str>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config: {}", path)),
        None => Ok(PipelineConfig::default()),
    }
}
