//! Pipeline orchestration.
//!
//! [`FeatureAggregator`] owns one [`PipelineConfig`] and runs the strict
//! sequence decode, analyze, synthesize. The samples are transformed once;
//! the five analyzers only read the shared sample buffer and spectrogram, so
//! they can run on the rayon pool without locking. The assembled descriptor
//! set is identical either way.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, debug_span, info, warn};

use crate::analysis::types::{
    EnergyDescriptors, HarmonicDescriptors, Metadata, RhythmicDescriptors, SpectralDescriptors,
    TechnicalDescriptorSet, TemporalDescriptors,
};
use crate::analysis::raw::{self, Spectrogram};
use crate::analysis::{self, widen};
use crate::config::{AnalysisConfig, PipelineConfig};
use crate::decode::{AudioDecoder, SymphoniaDecoder};
use crate::describe::{DescriptionSynthesizer, DescriptionText};
use crate::error::{AnalysisError, AnalysisResult, PipelineError};
use crate::export::AnalysisExport;
use crate::metadata::{LoftyReader, MetadataOutcome, MetadataReader};
use crate::waveform::Waveform;

/// The five descriptor groups of one waveform.
type Groups = (
    TemporalDescriptors,
    SpectralDescriptors,
    RhythmicDescriptors,
    HarmonicDescriptors,
    EnergyDescriptors,
);

/// Runs a stage inside a span named after it and logs its wall time.
fn stage<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let _span = debug_span!("analyzer", stage = name).entered();
    let start = Instant::now();
    let out = f();
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "stage finished");
    out
}

fn run_sequential(
    samples: &[f64],
    spectrogram: &Spectrogram,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Groups {
    (
        stage("temporal", || raw::temporal(samples, config)),
        stage("spectral", || raw::spectral(spectrogram, sample_rate, config)),
        stage("rhythmic", || raw::rhythmic(spectrogram, sample_rate, config)),
        stage("harmonic", || raw::harmonic(samples, spectrogram, sample_rate, config)),
        stage("energy", || raw::energy(samples, spectrogram, config)),
    )
}

fn run_parallel(
    samples: &[f64],
    spectrogram: &Spectrogram,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Groups {
    // HPSS and beat tracking dominate, so they get their own branches.
    let ((temporal, spectral), (rhythmic, (harmonic, energy))) = rayon::join(
        || {
            rayon::join(
                || stage("temporal", || raw::temporal(samples, config)),
                || stage("spectral", || raw::spectral(spectrogram, sample_rate, config)),
            )
        },
        || {
            rayon::join(
                || stage("rhythmic", || raw::rhythmic(spectrogram, sample_rate, config)),
                || {
                    rayon::join(
                        || {
                            stage("harmonic", || {
                                raw::harmonic(samples, spectrogram, sample_rate, config)
                            })
                        },
                        || stage("energy", || raw::energy(samples, spectrogram, config)),
                    )
                },
            )
        },
    );
    (temporal, spectral, rhythmic, harmonic, energy)
}

/// Orchestrates decoding, metadata, the analyzers and the synthesizer.
pub struct FeatureAggregator {
    config: PipelineConfig,
    decoder: Arc<dyn AudioDecoder>,
    reader: Arc<dyn MetadataReader>,
    synthesizer: DescriptionSynthesizer,
}

impl FeatureAggregator {
    /// Aggregator with the symphonia decoder and the lofty reader.
    pub fn new(config: PipelineConfig) -> Self {
        let synthesizer = DescriptionSynthesizer::new(config.rules.clone());
        Self {
            config,
            decoder: Arc::new(SymphoniaDecoder::new()),
            reader: Arc::new(LoftyReader::new()),
            synthesizer,
        }
    }

    pub fn with_decoder(mut self, decoder: impl AudioDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn with_reader(mut self, reader: impl MetadataReader + 'static) -> Self {
        self.reader = Arc::new(reader);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Decode `path`, read its metadata and run every analyzer.
    ///
    /// Decode and analyzer failures are fatal. Metadata problems are not:
    /// they show up as `"Unknown"` tag fields or an error placeholder.
    pub fn analyze_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<TechnicalDescriptorSet, PipelineError> {
        let path = path.as_ref();
        let start = Instant::now();
        info!(path = %path.display(), "analysis started");

        let waveform = self.decoder.decode(path)?;
        let metadata = self.read_metadata(path);
        let set = self.analyze_waveform(&waveform, metadata)?;

        info!(
            path = %path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis finished"
        );
        Ok(set)
    }

    fn read_metadata(&self, path: &Path) -> Metadata {
        let outcome = self.reader.read(path);
        if let MetadataOutcome::Degraded { reason, .. } = &outcome {
            warn!(path = %path.display(), reason = %reason, "tag fields degraded to Unknown");
        }
        outcome.into_metadata()
    }

    /// Run every analyzer over an already decoded waveform.
    pub fn analyze_waveform(
        &self,
        waveform: &Waveform,
        metadata: Metadata,
    ) -> AnalysisResult<TechnicalDescriptorSet> {
        waveform.ensure_analyzable()?;
        let config = &self.config.analysis;
        config.validate()?;
        config.ensure_duration(waveform)?;

        let samples = widen(waveform);
        let sample_rate = waveform.sample_rate();
        let spectrogram = stage("stft", || analysis::spectrogram(&samples, config));
        let (temporal, spectral, rhythmic, harmonic, energy) = if config.parallel {
            run_parallel(&samples, &spectrogram, sample_rate, config)
        } else {
            run_sequential(&samples, &spectrogram, sample_rate, config)
        };
        drop(spectrogram);

        let set = TechnicalDescriptorSet {
            metadata,
            temporal,
            spectral,
            rhythmic,
            harmonic,
            energy,
        };
        if let Some(field) = set.first_non_finite() {
            return Err(AnalysisError::NonFinite { field });
        }
        Ok(set)
    }

    pub fn describe(&self, set: &TechnicalDescriptorSet) -> DescriptionText {
        self.synthesizer.describe(set)
    }

    /// Analyze `path` and pair the descriptors with their production brief.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<AnalysisExport, PipelineError> {
        let path = path.as_ref();
        let set = self.analyze_file(path)?;
        let description = self.describe(&set);
        Ok(AnalysisExport::new(
            path.display().to_string(),
            set,
            description.as_string(),
        ))
    }
}
