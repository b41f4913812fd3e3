//! Spectral shape descriptors: centroid, bandwidth, rolloff, contrast, flatness.

use super::mel::{power_to_db_matrix, AMIN};
use super::stats;
use super::stft::{fft_frequencies, Spectrogram, TINY};
use super::types::SpectralDescriptors;
use crate::config::AnalysisConfig;

/// Magnitude-weighted mean frequency of one frame.
fn centroid(magnitude: &[f64], freqs: &[f64]) -> f64 {
    let total: f64 = magnitude.iter().sum();
    if total < TINY {
        return 0.0;
    }
    magnitude
        .iter()
        .zip(freqs)
        .map(|(m, f)| m * f)
        .sum::<f64>()
        / total
}

/// Magnitude-weighted spread around the centroid (second moment).
fn bandwidth(magnitude: &[f64], freqs: &[f64], centroid: f64) -> f64 {
    let total: f64 = magnitude.iter().sum();
    if total < TINY {
        return 0.0;
    }
    let spread: f64 = magnitude
        .iter()
        .zip(freqs)
        .map(|(m, f)| m / total * (f - centroid).powi(2))
        .sum();
    spread.sqrt()
}

/// Lowest frequency at which the cumulative magnitude reaches `percent` of the total.
fn rolloff(magnitude: &[f64], freqs: &[f64], percent: f64) -> f64 {
    let threshold = percent * magnitude.iter().sum::<f64>();
    let mut cumulative = 0.0;
    for (m, f) in magnitude.iter().zip(freqs) {
        cumulative += m;
        if cumulative >= threshold {
            return *f;
        }
    }
    freqs.last().copied().unwrap_or(0.0)
}

/// Geometric over arithmetic mean of the floored power spectrum.
///
/// A frame whose power never rises above the floor counts as silent and
/// scores 0.
fn flatness(magnitude: &[f64]) -> f64 {
    let power: Vec<f64> = magnitude.iter().map(|m| (m * m).max(AMIN)).collect();
    if power.iter().all(|&p| p <= AMIN) {
        return 0.0;
    }
    let n = power.len() as f64;
    let log_mean = power.iter().map(|p| p.ln()).sum::<f64>() / n;
    let arithmetic = power.iter().sum::<f64>() / n;
    (log_mean.exp() / arithmetic).clamp(0.0, 1.0)
}

/// Bin indices of each octave band used for spectral contrast.
///
/// Band edges are `[0, fmin, 2 fmin, ..., fmin * 2^n_bands]`. Every band above
/// the first borrows the bin just below its lower edge, the top band extends
/// to Nyquist and the other bands drop their highest bin. Bands with no bins
/// at this sample rate are left out.
fn contrast_bands(freqs: &[f64], config: &AnalysisConfig) -> Vec<(Vec<usize>, usize)> {
    let n_bands = config.n_contrast_bands;
    let mut edges = vec![0.0];
    edges.extend((0..=n_bands).map(|i| config.contrast_fmin * 2f64.powi(i as i32)));

    let mut bands = Vec::new();
    for (k, edge) in edges.windows(2).enumerate() {
        let (low, high) = (edge[0], edge[1]);
        let mut bins: Vec<usize> = (0..freqs.len())
            .filter(|&i| freqs[i] >= low && freqs[i] <= high)
            .collect();
        let (Some(&first), Some(&last)) = (bins.first(), bins.last()) else {
            continue;
        };
        if k > 0 && first > 0 {
            bins.insert(0, first - 1);
        }
        if k == n_bands {
            bins.extend(last + 1..freqs.len());
        }
        let count = bins.len();
        if k < n_bands {
            bins.pop();
        }
        if !bins.is_empty() {
            bands.push((bins, count));
        }
    }
    bands
}

/// Mean of the lowest and highest quantile of each band in one frame, as
/// `(peaks, valleys)`.
fn band_extremes(
    frame: &[f64],
    bands: &[(Vec<usize>, usize)],
    quantile: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut peaks = Vec::with_capacity(bands.len());
    let mut valleys = Vec::with_capacity(bands.len());
    for (bins, count) in bands {
        let mut values: Vec<f64> = bins.iter().map(|&i| frame[i]).collect();
        values.sort_by(f64::total_cmp);
        let take = ((quantile * *count as f64).round_ties_even() as usize)
            .max(1)
            .min(values.len());
        valleys.push(stats::mean(&values[..take]));
        peaks.push(stats::mean(&values[values.len() - take..]));
    }
    (peaks, valleys)
}

/// Peak-minus-valley contrast in dB from per-frame band extremes, as
/// `[frame][band]`.
fn contrast(peaks: &[Vec<f64>], valleys: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let peaks_db = power_to_db_matrix(peaks);
    let valleys_db = power_to_db_matrix(valleys);
    peaks_db
        .iter()
        .zip(&valleys_db)
        .map(|(p, v)| p.iter().zip(v).map(|(p, v)| p - v).collect())
        .collect()
}

pub(crate) fn analyze(
    spectrogram: &Spectrogram,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> SpectralDescriptors {
    let freqs = fft_frequencies(sample_rate, config.n_fft);
    let bands = contrast_bands(&freqs, config);
    let n_frames = spectrogram.n_frames();

    let mut centroids = Vec::with_capacity(n_frames);
    let mut bandwidths = Vec::with_capacity(n_frames);
    let mut rolloffs = Vec::with_capacity(n_frames);
    let mut flatnesses = Vec::with_capacity(n_frames);
    let mut peaks = Vec::with_capacity(n_frames);
    let mut valleys = Vec::with_capacity(n_frames);
    for frame in spectrogram.magnitude_frames() {
        let c = centroid(&frame, &freqs);
        centroids.push(c);
        bandwidths.push(bandwidth(&frame, &freqs, c));
        rolloffs.push(rolloff(&frame, &freqs, config.rolloff_percent));
        flatnesses.push(flatness(&frame));
        let (frame_peaks, frame_valleys) = band_extremes(&frame, &bands, config.contrast_quantile);
        peaks.push(frame_peaks);
        valleys.push(frame_valleys);
    }

    let contrast: Vec<f64> = contrast(&peaks, &valleys)
        .into_iter()
        .flatten()
        .collect();

    let (centroid_mean, centroid_std) = stats::mean_std(&centroids);
    let (bandwidth_mean, bandwidth_std) = stats::mean_std(&bandwidths);
    let (rolloff_mean, rolloff_std) = stats::mean_std(&rolloffs);
    let (contrast_mean, contrast_std) = stats::mean_std(&contrast);
    let (flatness_mean, flatness_std) = stats::mean_std(&flatnesses);

    SpectralDescriptors {
        centroid_mean,
        centroid_std,
        bandwidth_mean,
        bandwidth_std,
        rolloff_mean,
        rolloff_std,
        contrast_mean,
        contrast_std,
        flatness_mean,
        flatness_std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_of_single_bin() {
        let freqs = [0.0, 100.0, 200.0, 300.0];
        assert_eq!(centroid(&[0.0, 0.0, 2.0, 0.0], &freqs), 200.0);
        assert_eq!(bandwidth(&[0.0, 0.0, 2.0, 0.0], &freqs, 200.0), 0.0);
        assert_eq!(centroid(&[0.0; 4], &freqs), 0.0);
    }

    #[test]
    fn test_rolloff() {
        let freqs = [0.0, 100.0, 200.0, 300.0];
        assert_eq!(rolloff(&[1.0, 1.0, 1.0, 1.0], &freqs, 0.85), 300.0);
        assert_eq!(rolloff(&[10.0, 1.0, 0.0, 0.0], &freqs, 0.85), 0.0);
        assert_eq!(rolloff(&[0.0; 4], &freqs, 0.85), 0.0);
    }

    #[test]
    fn test_flatness_extremes() {
        assert_eq!(flatness(&[0.0; 16]), 0.0);
        assert!((flatness(&[0.5; 16]) - 1.0).abs() < 1e-12);
        let mut peaky = vec![0.0; 16];
        peaky[3] = 1.0;
        assert!(flatness(&peaky) < 1e-6);
    }

    #[test]
    fn test_contrast_bands_cover_spectrum() {
        let config = AnalysisConfig::default();
        let freqs = fft_frequencies(22050, config.n_fft);
        let bands = contrast_bands(&freqs, &config);
        assert_eq!(bands.len(), 7);
        // Top band runs to Nyquist.
        assert_eq!(bands[6].0.last(), Some(&(freqs.len() - 1)));
        // Lowest band starts at DC.
        assert_eq!(bands[0].0.first(), Some(&0));
    }

    #[test]
    fn test_contrast_skips_bands_above_nyquist() {
        let config = AnalysisConfig::default();
        let freqs = fft_frequencies(8000, config.n_fft);
        assert_eq!(contrast_bands(&freqs, &config).len(), 6);
    }
}
