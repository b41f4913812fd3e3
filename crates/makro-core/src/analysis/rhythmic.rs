//! Onset strength, tempo estimation, beat tracking and tempogram statistics.
//!
//! Two onset envelopes are derived from the same log-power mel spectrogram:
//! the mean over mel bands feeds the reported onset and tempogram statistics,
//! the median over mel bands drives tempo estimation and beat tracking.

use rustfft::{num_complex::Complex, FftPlanner};

use super::mel::{mel_filterbank, mel_spectrogram, power_to_db_matrix};
use super::stats;
use super::stft::{hann_window, Spectrogram, TINY};
use super::types::RhythmicDescriptors;
use crate::config::AnalysisConfig;

/// Length of the autocorrelation window used for the global tempo, in seconds.
const TEMPO_WINDOW_SECONDS: f64 = 8.0;

/// Width of the log2-normal tempo prior, in octaves.
const TEMPO_PRIOR_STD: f64 = 1.0;

/// Symmetric 5-point Hann kernel used to smooth beat strengths before trimming.
const TRIM_KERNEL: [f64; 5] = [0.0, 0.5, 1.0, 0.5, 0.0];

/// Onset strength envelopes, one value per STFT frame.
pub(crate) struct OnsetEnvelopes {
    pub mean: Vec<f64>,
    pub median: Vec<f64>,
}

/// Positive spectral flux of the dB mel spectrogram, aggregated over bands.
///
/// The envelope is delayed by `1 + n_fft / (2 * hop_length)` frames so each
/// onset lines up with the frame centred on it, and cut to the frame count.
pub(crate) fn onset_envelopes(
    spectrogram: &Spectrogram,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> OnsetEnvelopes {
    let filterbank = mel_filterbank(sample_rate, config.n_fft, config.n_mels);
    let db = power_to_db_matrix(&mel_spectrogram(spectrogram.power_frames(), &filterbank));

    let n_frames = db.len();
    let delay = 1 + config.n_fft / (2 * config.hop_length);
    let mut mean = vec![0.0; n_frames];
    let mut median = vec![0.0; n_frames];

    for t in 1..n_frames {
        let target = t - 1 + delay;
        if target >= n_frames {
            break;
        }
        let flux: Vec<f64> = db[t]
            .iter()
            .zip(&db[t - 1])
            .map(|(current, previous)| (current - previous).max(0.0))
            .collect();
        mean[target] = stats::mean(&flux);
        median[target] = stats::median(&flux);
    }

    OnsetEnvelopes { mean, median }
}

/// Pads with a linear ramp from 0 at the outer ends to the edge values.
fn pad_linear_ramp(values: &[f64], pad: usize) -> Vec<f64> {
    let first = values.first().copied().unwrap_or(0.0);
    let last = values.last().copied().unwrap_or(0.0);
    let mut padded = Vec::with_capacity(values.len() + 2 * pad);
    padded.extend((0..pad).map(|i| first * i as f64 / pad as f64));
    padded.extend_from_slice(values);
    padded.extend((0..pad).map(|j| last * (pad - 1 - j) as f64 / pad as f64));
    padded
}

/// Autocorrelation tempogram of `onset`, one column per onset frame.
///
/// Each column holds lags `0..win_length` of the Hann-windowed local
/// autocorrelation, scaled so its largest magnitude is 1. Columns are handed
/// to `visit` one at a time.
pub(crate) fn tempogram_columns(onset: &[f64], win_length: usize, mut visit: impl FnMut(&[f64])) {
    let padded = pad_linear_ramp(onset, win_length / 2);
    let window = hann_window(win_length);
    let fft_len = (2 * win_length - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);
    let mut buffer = vec![Complex::new(0.0, 0.0); fft_len];
    let mut column = vec![0.0; win_length];

    for t in 0..onset.len() {
        for (i, slot) in buffer.iter_mut().enumerate() {
            *slot = if i < win_length {
                Complex::new(padded[t + i] * window[i], 0.0)
            } else {
                Complex::new(0.0, 0.0)
            };
        }
        forward.process(&mut buffer);
        for c in buffer.iter_mut() {
            *c = Complex::new(c.norm_sqr(), 0.0);
        }
        inverse.process(&mut buffer);

        for (lag, value) in column.iter_mut().enumerate() {
            *value = buffer[lag].re / fft_len as f64;
        }
        let peak = column.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        if peak > TINY {
            for value in column.iter_mut() {
                *value /= peak;
            }
        }
        visit(&column);
    }
}

/// Global tempo in BPM from the time-averaged tempogram and a tempo prior.
///
/// Each lag is scored by `log1p(1e6 * strength)` plus a log2-normal prior
/// centred on `start_bpm`; lags faster than `max_tempo` are excluded. A silent
/// envelope therefore lands on the lag closest to `start_bpm`.
pub(crate) fn estimate_tempo(onset: &[f64], sample_rate: u32, config: &AnalysisConfig) -> f64 {
    let win_length = ((TEMPO_WINDOW_SECONDS * sample_rate as f64) as usize / config.hop_length).max(2);
    let mut sums = vec![0.0; win_length];
    let mut count = 0usize;
    tempogram_columns(onset, win_length, |column| {
        for (sum, value) in sums.iter_mut().zip(column) {
            *sum += value;
        }
        count += 1;
    });

    let frame_rate = sample_rate as f64 / config.hop_length as f64;
    let mut best_bpm = config.start_bpm;
    let mut best_score = f64::NEG_INFINITY;
    for (lag, sum) in sums.iter().enumerate().skip(1) {
        let bpm = 60.0 * frame_rate / lag as f64;
        if bpm >= config.max_tempo {
            continue;
        }
        let strength = sum / count.max(1) as f64;
        let prior =
            -0.5 * ((bpm.log2() - config.start_bpm.log2()) / TEMPO_PRIOR_STD).powi(2);
        let score = (1e6 * strength).ln_1p() + prior;
        if score > best_score {
            best_score = score;
            best_bpm = bpm;
        }
    }
    best_bpm
}

/// Onset envelope normalized by its sample standard deviation, smoothed by a
/// Gaussian spanning one beat period either side.
fn local_score(onset: &[f64], period: usize) -> Vec<f64> {
    let norm = stats::sample_std_dev(onset) + f64::MIN_POSITIVE;
    let p = period as i64;
    let kernel: Vec<f64> = (-p..=p)
        .map(|k| (-0.5 * (k as f64 * 32.0 / period as f64).powi(2)).exp())
        .collect();

    let n = onset.len() as i64;
    (0..n)
        .map(|i| {
            (-p..=p)
                .filter(|d| (0..n).contains(&(i + d)))
                .map(|d| onset[(i + d) as usize] / norm * kernel[(d + p) as usize])
                .sum()
        })
        .collect()
}

/// Dynamic programming pass: best cumulative score ending on each frame and
/// the predecessor it came from (`-1` for a chain start).
fn beat_dp(local: &[f64], period: usize, tightness: f64) -> (Vec<i64>, Vec<f64>) {
    let p = period as f64;
    let nearest = ((p / 2.0).round_ties_even() as i64).max(1);
    let offsets: Vec<i64> = (-2 * period as i64..=-nearest).collect();
    let transition: Vec<f64> = offsets
        .iter()
        .map(|&d| -tightness * (-d as f64 / p).ln().powi(2))
        .collect();

    let local_max = stats::max(local);
    let mut backlink = vec![-1i64; local.len()];
    let mut cumscore = vec![0.0; local.len()];
    let mut first_beat = true;

    for (i, &score) in local.iter().enumerate() {
        let mut best_offset = offsets[0];
        let mut best = f64::NEG_INFINITY;
        for (&d, &weight) in offsets.iter().zip(&transition) {
            let previous = i as i64 + d;
            let candidate = if previous >= 0 {
                weight + cumscore[previous as usize]
            } else {
                weight
            };
            if candidate > best {
                best = candidate;
                best_offset = d;
            }
        }
        cumscore[i] = score + best;

        if first_beat && score < 0.01 * local_max {
            backlink[i] = -1;
        } else {
            backlink[i] = i as i64 + best_offset;
            first_beat = false;
        }
    }

    (backlink, cumscore)
}

/// Frame of the final beat: the last local maximum of the cumulative score
/// that clears half the median peak score.
fn last_beat(cumscore: &[f64]) -> usize {
    let n = cumscore.len();
    let is_peak = |i: usize| {
        i > 0 && cumscore[i] > cumscore[i - 1] && (i + 1 == n || cumscore[i] >= cumscore[i + 1])
    };
    let peaks: Vec<f64> = (0..n).filter(|&i| is_peak(i)).map(|i| cumscore[i]).collect();
    if peaks.is_empty() {
        return n.saturating_sub(1);
    }
    let median = stats::median(&peaks);
    (0..n)
        .rev()
        .find(|&i| {
            let value = if is_peak(i) { cumscore[i] * 2.0 } else { 0.0 };
            value > median
        })
        .unwrap_or(n.saturating_sub(1))
}

/// Drops weak beats at the start and end of the sequence.
fn trim_beats(local: &[f64], beats: &[usize]) -> Vec<usize> {
    let strengths: Vec<f64> = beats.iter().map(|&b| local[b]).collect();
    let n = strengths.len() as i64;
    let smooth: Vec<f64> = (0..n)
        .map(|i| {
            (-2i64..=2)
                .filter(|d| (0..n).contains(&(i + d)))
                .map(|d| strengths[(i + d) as usize] * TRIM_KERNEL[(d + 2) as usize])
                .sum()
        })
        .collect();

    let threshold = 0.5 * stats::mean(&smooth.iter().map(|s| s * s).collect::<Vec<_>>()).sqrt();
    let valid: Vec<usize> = (0..smooth.len()).filter(|&i| smooth[i] > threshold).collect();
    match (valid.first(), valid.last()) {
        (Some(&first), Some(&last)) => beats[first..last].to_vec(),
        _ => Vec::new(),
    }
}

/// Beat frames aligned to `onset` at the given tempo.
pub(crate) fn track_beats(onset: &[f64], bpm: f64, frame_rate: f64, tightness: f64) -> Vec<usize> {
    if onset.iter().all(|&v| v == 0.0) || !(bpm > 0.0) {
        return Vec::new();
    }

    let period = ((60.0 * frame_rate / bpm).round_ties_even() as usize).max(1);
    let local = local_score(onset, period);
    let (backlink, cumscore) = beat_dp(&local, period, tightness);

    let mut beats = vec![last_beat(&cumscore)];
    while let Some(&previous) = beats.last().and_then(|&b| backlink.get(b)) {
        if previous < 0 {
            break;
        }
        beats.push(previous as usize);
    }
    beats.reverse();

    trim_beats(&local, &beats)
}

pub(crate) fn analyze(
    spectrogram: &Spectrogram,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> RhythmicDescriptors {
    let envelopes = onset_envelopes(spectrogram, sample_rate, config);

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut cells = 0usize;
    tempogram_columns(&envelopes.mean, config.tempogram_win_length, |column| {
        for &value in column {
            sum += value;
            sum_sq += value * value;
        }
        cells += column.len();
    });
    let tempogram_mean = if cells > 0 { sum / cells as f64 } else { 0.0 };
    let tempogram_std = if cells > 0 {
        (sum_sq / cells as f64 - tempogram_mean * tempogram_mean)
            .max(0.0)
            .sqrt()
    } else {
        0.0
    };

    let tempo_bpm = estimate_tempo(&envelopes.median, sample_rate, config);
    let frame_rate = sample_rate as f64 / config.hop_length as f64;
    let beats = track_beats(&envelopes.median, tempo_bpm, frame_rate, config.tightness);
    tracing::debug!(tempo_bpm, beats = beats.len(), "beat tracking finished");

    RhythmicDescriptors {
        tempo_bpm,
        beats_count: beats.len() as u64,
        onset_strength_mean: stats::mean(&envelopes.mean),
        onset_strength_max: stats::max(&envelopes.mean),
        tempogram_mean,
        tempogram_std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ramp_padding() {
        assert_eq!(
            pad_linear_ramp(&[4.0, 2.0], 2),
            vec![0.0, 2.0, 4.0, 2.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_silent_envelope_gives_prior_peak() {
        let config = AnalysisConfig::default();
        let tempo = estimate_tempo(&[0.0; 200], 22050, &config);
        let expected = 60.0 * 22050.0 / 512.0 / 22.0;
        assert!((tempo - expected).abs() < 1e-9, "tempo {tempo}");
    }

    #[test]
    fn test_no_beats_without_onsets() {
        assert!(track_beats(&[0.0; 300], 120.0, 43.0, 100.0).is_empty());
    }

    #[test]
    fn test_impulse_envelope_tracks_regular_beats() {
        let mut onset = vec![0.0; 600];
        for t in (10..590).step_by(20) {
            onset[t] = 1.0;
        }
        let frame_rate = 22050.0 / 512.0;
        let bpm = 60.0 * frame_rate / 20.0;
        let beats = track_beats(&onset, bpm, frame_rate, 100.0);

        assert!(beats.len() >= 20, "got {} beats", beats.len());
        for pair in beats.windows(2) {
            assert_eq!(pair[1] - pair[0], 20);
        }
        assert!(beats.iter().all(|b| (b - 10) % 20 == 0));
    }

    #[test]
    fn test_tempogram_columns_are_normalized() {
        let mut onset = vec![0.0; 100];
        for t in (0..100).step_by(10) {
            onset[t] = 1.0;
        }
        let mut count = 0;
        tempogram_columns(&onset, 32, |column| {
            assert_eq!(column.len(), 32);
            assert!((column[0] - 1.0).abs() < 1e-9);
            assert!(column.iter().all(|v| v.abs() <= 1.0 + 1e-9));
            count += 1;
        });
        assert_eq!(count, 100);
    }
}
