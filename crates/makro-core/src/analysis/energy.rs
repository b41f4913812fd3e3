//! Signal energy, relative loudness and dynamic range.

use super::stats;
use super::stft::Spectrogram;
use super::temporal::frame_rms;
use super::types::EnergyDescriptors;
use crate::config::AnalysisConfig;

/// Floor applied to magnitudes before converting to dB.
const AMPLITUDE_FLOOR: f64 = 1e-5;

/// Loudness values are clipped this far below the peak.
const LOUDNESS_RANGE_DB: f64 = 80.0;

/// Level of one magnitude in dB relative to `reference_db`.
fn level_db(magnitude: f64, reference_db: f64) -> f64 {
    20.0 * magnitude.max(AMPLITUDE_FLOOR).log10() - reference_db
}

pub(crate) fn analyze(
    samples: &[f64],
    spectrogram: &Spectrogram,
    config: &AnalysisConfig,
) -> EnergyDescriptors {
    let total_energy = samples.iter().map(|s| s * s).sum();

    let peak = spectrogram
        .magnitude_frames()
        .flatten()
        .fold(0.0f64, f64::max);
    let reference_db = 20.0 * peak.max(AMPLITUDE_FLOOR).log10();

    // The loudest cell sets both the maximum and the clipping floor.
    let loudness_max = level_db(peak, reference_db);
    let floor = loudness_max - LOUDNESS_RANGE_DB;
    let mut sum = 0.0;
    let mut cells = 0usize;
    let mut loudness_min = f64::INFINITY;
    for frame in spectrogram.magnitude_frames() {
        for m in frame {
            let value = level_db(m, reference_db).max(floor);
            sum += value;
            cells += 1;
            loudness_min = loudness_min.min(value);
        }
    }

    let rms = frame_rms(samples, config);

    EnergyDescriptors {
        total_energy,
        loudness_mean: sum / cells.max(1) as f64,
        loudness_max,
        loudness_min: loudness_min.min(loudness_max),
        dynamic_range: stats::max(&rms) - stats::min(&rms),
    }
}
