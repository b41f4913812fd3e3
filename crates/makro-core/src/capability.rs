//! Startup capability check.
//!
//! Verifies, before any analysis, that the linked decoders and tag readers
//! cover the configured upload formats and that uploads can be staged. The
//! check never touches the analysis path; callers decide what to do with a
//! [`CapabilityStatus::Missing`] result.

use serde::Serialize;
use std::path::Path;

use lofty::file::FileType;
use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_AAC, CODEC_TYPE_FLAC, CODEC_TYPE_MP3, CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_VORBIS,
};

use crate::config::PipelineConfig;

/// Codecs the pipeline expects to decode.
const REQUIRED_CODECS: &[(&str, CodecType)] = &[
    ("MP3", CODEC_TYPE_MP3),
    ("PCM", CODEC_TYPE_PCM_S16LE),
    ("FLAC", CODEC_TYPE_FLAC),
    ("Vorbis", CODEC_TYPE_VORBIS),
    ("AAC", CODEC_TYPE_AAC),
];

/// Area a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Codec,
    Container,
    Staging,
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityCheck {
    pub kind: CheckKind,
    pub name: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Overall verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CapabilityStatus {
    Available,
    Missing { names: Vec<String> },
}

/// Every check that was run, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapabilityReport {
    pub checks: Vec<CapabilityCheck>,
}

impl CapabilityReport {
    pub fn status(&self) -> CapabilityStatus {
        let names: Vec<String> = self
            .checks
            .iter()
            .filter(|c| !c.available)
            .map(|c| c.name.clone())
            .collect();
        if names.is_empty() {
            CapabilityStatus::Available
        } else {
            CapabilityStatus::Missing { names }
        }
    }

    pub fn is_available(&self) -> bool {
        self.checks.iter().all(|c| c.available)
    }
}

/// Run every check against `config`.
pub fn probe(config: &PipelineConfig) -> CapabilityReport {
    let mut checks = Vec::new();

    let codecs = symphonia::default::get_codecs();
    for &(name, codec) in REQUIRED_CODECS {
        let available = codecs.get_codec(codec).is_some();
        checks.push(CapabilityCheck {
            kind: CheckKind::Codec,
            name: format!("{name} decoder"),
            available,
            detail: None,
        });
    }

    for extension in &config.upload.allowed_extensions {
        let file_type = FileType::from_ext(extension);
        checks.push(CapabilityCheck {
            kind: CheckKind::Container,
            name: format!(".{extension} container"),
            available: file_type.is_some(),
            detail: file_type.map(|t| format!("{t:?}")),
        });
    }

    checks.push(staging_check(&config.upload.staging_dir()));

    CapabilityReport { checks }
}

fn staging_check(dir: &Path) -> CapabilityCheck {
    let result = tempfile::Builder::new()
        .prefix(".makro-probe")
        .tempfile_in(dir);
    CapabilityCheck {
        kind: CheckKind::Staging,
        name: format!("writable staging directory {}", dir.display()),
        available: result.is_ok(),
        detail: result.err().map(|e| e.to_string()),
    }
}
