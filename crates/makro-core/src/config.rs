//! Pipeline configuration.
//!
//! All tunables are carried in an explicit [`PipelineConfig`] value handed to
//! the pipeline entry point. Nothing is read from ambient global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::describe::DescriptionRules;
use crate::error::{AnalysisError, AnalysisResult, ConfigError};
use crate::waveform::Waveform;

/// Complete configuration for one pipeline instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Analyzer parameters
    pub analysis: AnalysisConfig,
    /// Upload validation and staging
    pub upload: UploadPolicy,
    /// Thresholds of the description rule table
    pub rules: DescriptionRules,
}

impl PipelineConfig {
    /// Parse a configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Frame and algorithm parameters shared by the analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// STFT / frame length in samples
    pub n_fft: usize,
    /// Hop between frames in samples
    pub hop_length: usize,
    /// Energy fraction below the spectral rolloff frequency
    pub rolloff_percent: f64,
    /// Mel bands for onset strength and MFCC
    pub n_mels: usize,
    /// Retained cepstral coefficients
    pub n_mfcc: usize,
    /// Octave bands above the lowest contrast band
    pub n_contrast_bands: usize,
    /// Upper edge of the lowest contrast band in Hz
    pub contrast_fmin: f64,
    /// Share of each band used for peak/valley estimates
    pub contrast_quantile: f64,
    /// Median filter length for harmonic-percussive separation
    pub hpss_kernel: usize,
    /// Soft mask exponent for harmonic-percussive separation
    pub hpss_power: f64,
    /// Lags in the autocorrelation tempogram
    pub tempogram_win_length: usize,
    /// Centre of the tempo prior in BPM
    pub start_bpm: f64,
    /// Upper bound of tempo estimates in BPM
    pub max_tempo: f64,
    /// Penalty on deviation from the tempo period in beat tracking
    pub tightness: f64,
    /// Longest waveform accepted for analysis, in seconds
    pub max_duration_seconds: f64,
    /// Run the five analyzers on the rayon pool
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            rolloff_percent: 0.85,
            n_mels: 128,
            n_mfcc: 13,
            n_contrast_bands: 6,
            contrast_fmin: 200.0,
            contrast_quantile: 0.02,
            hpss_kernel: 31,
            hpss_power: 2.0,
            tempogram_win_length: 384,
            start_bpm: 120.0,
            max_tempo: 320.0,
            tightness: 100.0,
            max_duration_seconds: 1200.0,
            parallel: true,
        }
    }
}

impl AnalysisConfig {
    /// Reject parameter combinations the analyzers cannot run with.
    pub fn validate(&self) -> AnalysisResult<()> {
        fn invalid(name: &'static str, message: impl Into<String>) -> AnalysisError {
            AnalysisError::InvalidParameter {
                name,
                message: message.into(),
            }
        }

        if self.n_fft < 16 || self.n_fft % 2 != 0 {
            return Err(invalid("n_fft", "must be an even number of at least 16"));
        }
        if self.hop_length == 0 {
            return Err(invalid("hop_length", "must be positive"));
        }
        if !(self.rolloff_percent > 0.0 && self.rolloff_percent < 1.0) {
            return Err(invalid("rolloff_percent", "must lie strictly between 0 and 1"));
        }
        if self.n_mels == 0 {
            return Err(invalid("n_mels", "must be positive"));
        }
        if self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            return Err(invalid("n_mfcc", "must be between 1 and n_mels"));
        }
        if !(self.contrast_fmin > 0.0) {
            return Err(invalid("contrast_fmin", "must be positive"));
        }
        if !(self.contrast_quantile > 0.0 && self.contrast_quantile < 1.0) {
            return Err(invalid("contrast_quantile", "must lie strictly between 0 and 1"));
        }
        if self.hpss_kernel == 0 {
            return Err(invalid("hpss_kernel", "must be positive"));
        }
        if !(self.hpss_power > 0.0) {
            return Err(invalid("hpss_power", "must be positive"));
        }
        if self.tempogram_win_length < 2 {
            return Err(invalid("tempogram_win_length", "must be at least 2"));
        }
        if !(self.start_bpm > 0.0) || !self.start_bpm.is_finite() {
            return Err(invalid("start_bpm", "must be a positive number"));
        }
        if !(self.max_tempo > 0.0) || !self.max_tempo.is_finite() {
            return Err(invalid("max_tempo", "must be a positive number"));
        }
        if !(self.tightness >= 0.0) || !self.tightness.is_finite() {
            return Err(invalid("tightness", "must be a non-negative number"));
        }
        if !(self.max_duration_seconds > 0.0) {
            return Err(invalid("max_duration_seconds", "must be positive"));
        }
        Ok(())
    }

    /// Reject waveforms longer than `max_duration_seconds`.
    ///
    /// Working memory grows with the number of STFT cells, so this bounds
    /// the cost of one analysis independently of the upload size limit.
    pub fn ensure_duration(&self, waveform: &Waveform) -> AnalysisResult<()> {
        let duration_seconds = waveform.duration_seconds();
        if duration_seconds > self.max_duration_seconds {
            return Err(AnalysisError::TooLong {
                duration_seconds,
                limit_seconds: self.max_duration_seconds,
            });
        }
        Ok(())
    }
}

/// Caller-side acceptance rules for audio uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    /// Lowercase file extensions accepted (without the dot)
    pub allowed_extensions: Vec<String>,
    /// Maximum payload size in bytes
    pub max_upload_bytes: u64,
    /// Directory for staged uploads (system temp dir when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: ["mp3", "wav", "flac", "ogg", "m4a"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_upload_bytes: 50 * 1024 * 1024,
            temp_dir: None,
        }
    }
}

impl UploadPolicy {
    /// Directory used for staged files.
    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Whether `extension` (any case, no dot) is accepted.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}
