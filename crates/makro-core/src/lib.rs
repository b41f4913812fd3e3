//! Music-Makro core library.
//!
//! Turns a single audio recording into a set of quantitative descriptors and
//! a short natural-language production brief for a generative music model.
//!
//! # Overview
//!
//! The pipeline is a strict sequence: decode the file into a mono
//! [`Waveform`], run five independent analyzers over it, merge their output
//! with the file's tag metadata into a [`TechnicalDescriptorSet`], then map
//! that set through a fixed rule table into a [`DescriptionText`].
//!
//! - [`decode`] - compressed audio to PCM (symphonia)
//! - [`metadata`] - container and tag facts (lofty)
//! - [`analysis`] - temporal, spectral, rhythmic, harmonic and energy analyzers
//! - [`aggregate`] - orchestrates the analyzers into one descriptor set
//! - [`describe`] - rule-based production brief
//! - [`export`] - JSON export format
//! - [`capability`] - startup dependency check
//! - [`upload`] - extension/size validation and temp-file staging
//!
//! # Determinism
//!
//! Every analyzer is a pure function of the waveform and configuration.
//! Analyzing the same file twice yields bit-identical descriptors, whether
//! the analyzers run in parallel or sequentially.
//!
//! # Example
//!
//! ```no_run
//! use makro_core::{FeatureAggregator, PipelineConfig};
//!
//! let aggregator = FeatureAggregator::new(PipelineConfig::default());
//! let export = aggregator.run("track.mp3")?;
//! println!("{}", export.ace_step_description);
//! # Ok::<(), makro_core::PipelineError>(())
//! ```

pub mod aggregate;
pub mod analysis;
pub mod capability;
pub mod config;
pub mod decode;
pub mod describe;
pub mod error;
pub mod export;
pub mod metadata;
pub mod upload;
pub mod waveform;

pub use aggregate::FeatureAggregator;
pub use analysis::types::{
    DescriptorGroup, EnergyDescriptors, HarmonicDescriptors, Metadata, MetadataRecord,
    RhythmicDescriptors, SpectralDescriptors, TechnicalDescriptorSet, TemporalDescriptors,
};
pub use capability::{CapabilityReport, CapabilityStatus};
pub use config::{AnalysisConfig, PipelineConfig, UploadPolicy};
pub use decode::{AudioDecoder, SymphoniaDecoder};
pub use describe::{DescriptionRules, DescriptionSynthesizer, DescriptionText};
pub use error::{
    AnalysisError, ConfigError, DecodeError, ExportError, PipelineError, ValidationError,
};
pub use export::AnalysisExport;
pub use metadata::{LoftyReader, MetadataOutcome, MetadataReader};
pub use waveform::Waveform;
