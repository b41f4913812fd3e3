//! Frame-level RMS and zero-crossing rate.

use super::stats;
use super::stft::{frame_count, frames, pad_edge, pad_zero};
use super::types::TemporalDescriptors;
use crate::config::AnalysisConfig;

/// Samples at or below this magnitude count as zero when detecting crossings.
const ZERO_THRESHOLD: f64 = 1e-10;

/// RMS of each centered frame (zero padded).
pub(crate) fn frame_rms(samples: &[f64], config: &AnalysisConfig) -> Vec<f64> {
    let n_frames = frame_count(samples.len(), config.hop_length);
    let padded = pad_zero(samples, config.n_fft / 2);
    frames(&padded, config.n_fft, config.hop_length, n_frames)
        .map(|frame| (frame.iter().map(|s| s * s).sum::<f64>() / frame.len() as f64).sqrt())
        .collect()
}

/// Fraction of sign changes in each centered frame (edge padded).
pub(crate) fn frame_zcr(samples: &[f64], config: &AnalysisConfig) -> Vec<f64> {
    let n_frames = frame_count(samples.len(), config.hop_length);
    let padded = pad_edge(samples, config.n_fft / 2);
    frames(&padded, config.n_fft, config.hop_length, n_frames)
        .map(|frame| {
            let negative = |s: f64| s.abs() > ZERO_THRESHOLD && s < 0.0;
            let crossings = frame
                .windows(2)
                .filter(|w| negative(w[0]) != negative(w[1]))
                .count();
            crossings as f64 / frame.len() as f64
        })
        .collect()
}

pub(crate) fn analyze(samples: &[f64], config: &AnalysisConfig) -> TemporalDescriptors {
    let rms = frame_rms(samples, config);
    let zcr = frame_zcr(samples, config);

    TemporalDescriptors {
        rms_mean: stats::mean(&rms),
        rms_std: stats::std_dev(&rms),
        rms_max: stats::max(&rms),
        zcr_mean: stats::mean(&zcr),
        zcr_std: stats::std_dev(&zcr),
    }
}
