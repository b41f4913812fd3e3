//! Descriptor extraction from a mono waveform.
//!
//! Five independent analyzers each turn the same immutable waveform into one
//! descriptor group. They share one centered STFT from [`stft`] and
//! are deterministic: the same samples and configuration always produce
//! bit-identical output.
//!
//! | Analyzer | Group | Inputs |
//! |----------|-------|--------|
//! | [`analyze_temporal`] | [`TemporalDescriptors`] | framed samples |
//! | [`analyze_spectral`] | [`SpectralDescriptors`] | magnitude spectrogram |
//! | [`analyze_rhythmic`] | [`RhythmicDescriptors`] | mel onset envelope |
//! | [`analyze_harmonic`] | [`HarmonicDescriptors`] | HPSS, chroma, mel cepstrum |
//! | [`analyze_energy`] | [`EnergyDescriptors`] | samples, magnitude spectrogram |

mod energy;
mod harmonic;
mod mel;
mod rhythmic;
mod spectral;
mod stats;
mod stft;
mod temporal;
pub mod types;

#[cfg(test)]
mod tests;

pub use types::{
    DescriptorGroup, EnergyDescriptors, HarmonicDescriptors, Metadata, MetadataRecord,
    RhythmicDescriptors, SpectralDescriptors, TechnicalDescriptorSet, TemporalDescriptors,
    UNKNOWN,
};

use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::waveform::Waveform;

/// Waveform samples widened for analysis.
pub(crate) fn widen(waveform: &Waveform) -> Vec<f64> {
    waveform.samples().iter().map(|&s| s as f64).collect()
}

/// Centered STFT shared by every frequency-domain analyzer.
pub(crate) fn spectrogram(samples: &[f64], config: &AnalysisConfig) -> stft::Spectrogram {
    stft::Spectrogram::compute(samples, config.n_fft, config.hop_length)
}

/// Shared precondition of every analyzer entry point.
fn prepare(waveform: &Waveform, config: &AnalysisConfig) -> AnalysisResult<Vec<f64>> {
    waveform.ensure_analyzable()?;
    config.validate()?;
    config.ensure_duration(waveform)?;
    Ok(widen(waveform))
}

/// RMS and zero-crossing statistics.
pub fn analyze_temporal(
    waveform: &Waveform,
    config: &AnalysisConfig,
) -> AnalysisResult<TemporalDescriptors> {
    let samples = prepare(waveform, config)?;
    Ok(temporal::analyze(&samples, config))
}

/// Centroid, bandwidth, rolloff, contrast and flatness statistics.
pub fn analyze_spectral(
    waveform: &Waveform,
    config: &AnalysisConfig,
) -> AnalysisResult<SpectralDescriptors> {
    let samples = prepare(waveform, config)?;
    let spectrogram = spectrogram(&samples, config);
    Ok(spectral::analyze(&spectrogram, waveform.sample_rate(), config))
}

/// Tempo, beat count, onset and tempogram statistics.
pub fn analyze_rhythmic(
    waveform: &Waveform,
    config: &AnalysisConfig,
) -> AnalysisResult<RhythmicDescriptors> {
    let samples = prepare(waveform, config)?;
    let spectrogram = spectrogram(&samples, config);
    Ok(rhythmic::analyze(&spectrogram, waveform.sample_rate(), config))
}

/// Harmonic/percussive ratios plus chroma, MFCC and tonnetz statistics.
pub fn analyze_harmonic(
    waveform: &Waveform,
    config: &AnalysisConfig,
) -> AnalysisResult<HarmonicDescriptors> {
    let samples = prepare(waveform, config)?;
    let spectrogram = spectrogram(&samples, config);
    Ok(harmonic::analyze(&samples, &spectrogram, waveform.sample_rate(), config))
}

/// Total energy, relative loudness and dynamic range.
pub fn analyze_energy(
    waveform: &Waveform,
    config: &AnalysisConfig,
) -> AnalysisResult<EnergyDescriptors> {
    let samples = prepare(waveform, config)?;
    let spectrogram = spectrogram(&samples, config);
    Ok(energy::analyze(&samples, &spectrogram, config))
}

/// Unchecked analyzer calls over pre-widened samples, for the aggregator.
pub(crate) mod raw {
    pub(crate) use super::energy::analyze as energy;
    pub(crate) use super::harmonic::analyze as harmonic;
    pub(crate) use super::rhythmic::analyze as rhythmic;
    pub(crate) use super::spectral::analyze as spectral;
    pub(crate) use super::stft::Spectrogram;
    pub(crate) use super::temporal::analyze as temporal;
}
