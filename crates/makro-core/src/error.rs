//! Error types for the analysis pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for analyzer operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors raised while turning a file into a waveform.
///
/// Decoding failures are fatal for an invocation; there is no partial result.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file could not be opened.
    #[error("failed to open audio file {path}: {source}")]
    Open {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The container or codec is not recognised.
    #[error("unsupported audio format: {message}")]
    Unsupported {
        /// Decoder message.
        message: String,
    },

    /// No decodable audio track in the container.
    #[error("no decodable audio track found")]
    NoAudioTrack,

    /// The selected track does not declare a sample rate.
    #[error("audio track does not declare a sample rate")]
    MissingSampleRate,

    /// The codec failed in a way that cannot be skipped.
    #[error("decoder failed: {message}")]
    Codec {
        /// Decoder message.
        message: String,
    },

    /// Decoding finished without producing a single sample.
    #[error("audio stream contains no samples")]
    EmptyStream,
}

/// Numerical or parameter failures inside an analyzer stage.
///
/// The synthesizer needs every descriptor, so these are fatal as well.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// The waveform has no samples.
    #[error("waveform contains no samples")]
    EmptyWaveform,

    /// The waveform sample rate is unusable.
    #[error("invalid sample rate: {rate}")]
    InvalidSampleRate {
        /// The invalid sample rate.
        rate: u32,
    },

    /// An analysis parameter is out of range.
    #[error("invalid analysis parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// The waveform is longer than the configured analysis limit.
    #[error("waveform lasts {duration_seconds:.1}s, longer than the {limit_seconds:.1}s analysis limit")]
    TooLong {
        /// Waveform duration in seconds.
        duration_seconds: f64,
        /// Configured `max_duration_seconds`.
        limit_seconds: f64,
    },

    /// A descriptor came out as NaN or infinity.
    #[error("descriptor '{field}' is not finite")]
    NonFinite {
        /// Dotted descriptor path, e.g. `spectral.centroid_mean`.
        field: String,
    },
}

/// Caller-side rejection of an upload. Never reaches the pipeline.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The file extension is not on the allow-list.
    #[error("file extension '{extension}' is not allowed (expected one of: {allowed})")]
    ExtensionNotAllowed {
        /// Offending extension (lowercased, may be empty).
        extension: String,
        /// Comma-separated allow-list.
        allowed: String,
    },

    /// The payload exceeds the configured size limit.
    #[error("file is too large: {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge {
        /// Payload size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The upload could not be read or staged.
    #[error("failed to stage upload {path}: {source}")]
    Io {
        /// Path of the upload.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Failures loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Config path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

/// Failures writing or parsing the export format.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Serialization or parsing failed.
    #[error("export JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the export file failed.
    #[error("failed to write export {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Any fatal failure of a full pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The file could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// An analyzer failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
