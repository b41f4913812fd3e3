//! JSON output types for machine-readable CLI output.
//!
//! These are the envelopes printed by `--json`. Field names are stable so
//! other tools can parse the output programmatically.

use makro_core::{AnalysisExport, CapabilityReport, CapabilityStatus};
use serde::{Deserialize, Serialize};

/// Error codes for CLI operations.
///
/// These codes are stable and can be used for programmatic error handling.
pub mod error_codes {
    /// File could not be read
    pub const FILE_READ: &str = "MAKRO_001";
    /// Extension not on the allow-list
    pub const UNSUPPORTED_FORMAT: &str = "MAKRO_002";
    /// Upload larger than the configured limit
    pub const FILE_TOO_LARGE: &str = "MAKRO_003";
    /// Config file unreadable or malformed
    pub const CONFIG: &str = "MAKRO_004";
    /// Audio could not be decoded
    pub const DECODE: &str = "MAKRO_005";
    /// An analyzer failed
    pub const ANALYSIS: &str = "MAKRO_006";
    /// Export could not be written
    pub const EXPORT_WRITE: &str = "MAKRO_007";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g., "MAKRO_001")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Source file path (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Suggestion for fixing the error (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl JsonError {
    /// Creates a new error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            file: None,
            suggestion: None,
        }
    }

    /// Sets the file path for this error.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets a suggestion for fixing this error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// JSON output for the `analyze` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeOutput {
    /// Whether analysis succeeded
    pub success: bool,
    /// Errors encountered during analysis
    pub errors: Vec<JsonError>,
    /// Analysis result (on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalyzeResult>,
}

/// Analysis result details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResult {
    /// Input file path
    pub file: String,
    /// BLAKE3 hash of the input file
    pub input_hash: String,
    /// Wall time of the pipeline call
    pub processing_time_seconds: f64,
    /// Descriptors and production brief
    pub export: AnalysisExport,
}

impl AnalyzeOutput {
    /// Creates a successful analyze output.
    pub fn success(result: AnalyzeResult) -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            result: Some(result),
        }
    }

    /// Creates a failed analyze output.
    pub fn failure(errors: Vec<JsonError>) -> Self {
        Self {
            success: false,
            errors,
            result: None,
        }
    }
}

/// JSON output for the `doctor` command.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorOutput {
    /// Whether every check passed
    pub success: bool,
    /// Errors that prevented the checks from running
    pub errors: Vec<JsonError>,
    /// Overall verdict (when the checks ran)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CapabilityStatus>,
    /// Individual checks (when the checks ran)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CapabilityReport>,
}

impl DoctorOutput {
    pub fn new(report: CapabilityReport) -> Self {
        Self {
            success: report.is_available(),
            errors: Vec::new(),
            status: Some(report.status()),
            report: Some(report),
        }
    }

    /// Creates a doctor output for checks that could not run.
    pub fn failure(errors: Vec<JsonError>) -> Self {
        Self {
            success: false,
            errors,
            status: None,
            report: None,
        }
    }
}
