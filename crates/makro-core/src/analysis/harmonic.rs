//! Harmonic-percussive separation, chroma, MFCC and tonnetz.

use rustfft::num_complex::Complex;

use super::mel::{dct_ortho, mel_filterbank, mel_spectrogram, power_to_db_matrix};
use super::stats;
use super::stft::{fft_frequencies, OverlapAdd, Spectrogram, TINY};
use super::types::HarmonicDescriptors;
use crate::config::AnalysisConfig;

/// Lowest frequency folded into chroma (C1).
const CHROMA_FMIN: f64 = 32.703;

/// Tuning reference for pitch classes.
const A4_HZ: f64 = 440.0;

/// Interval scale and radius of the six tonnetz axes: fifths, minor thirds,
/// major thirds, each as a (sin, cos) pair.
const TONNETZ_SCALE: [f64; 6] = [7.0 / 6.0, 7.0 / 6.0, 1.5, 1.5, 2.0 / 3.0, 2.0 / 3.0];
const TONNETZ_RADIUS: [f64; 6] = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5];

/// Maps `i` into `0..n` by mirroring about the edges (`d c b a | a b c d | d c b a`).
fn reflect_index(i: i64, n: i64) -> usize {
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m >= n { period - 1 - m } else { m }) as usize
}

/// Running median of `values` with an odd or even `kernel`, reflect-padded.
pub(crate) fn median_filter(values: &[f64], kernel: usize) -> Vec<f64> {
    let n = values.len() as i64;
    let half = (kernel / 2) as i64;
    let mut window = Vec::with_capacity(kernel);
    (0..n)
        .map(|i| {
            window.clear();
            window.extend((0..kernel as i64).map(|j| values[reflect_index(i + j - half, n)]));
            let mid = kernel / 2;
            *window.select_nth_unstable_by(mid, f64::total_cmp).1
        })
        .collect()
}

/// `x^p / (x^p + r^p)`, or 0 where both are effectively zero.
fn soft_mask(x: f64, reference: f64, power: f64) -> f64 {
    let z = x.max(reference);
    if z < TINY {
        return 0.0;
    }
    let mask = (x / z).powf(power);
    let reference_mask = (reference / z).powf(power);
    mask / (mask + reference_mask)
}

/// Magnitude of every bin median-filtered along time, as `[frame][bin]`.
///
/// This is the sustained-energy estimate of harmonic-percussive separation.
fn time_medians(spectrogram: &Spectrogram, kernel: usize) -> Vec<Vec<f64>> {
    let n_frames = spectrogram.n_frames();
    let n_bins = spectrogram.n_bins();
    let mut medians = vec![vec![0.0; n_bins]; n_frames];
    let mut track = vec![0.0; n_frames];
    for k in 0..n_bins {
        for (slot, frame) in track.iter_mut().zip(&spectrogram.frames) {
            *slot = frame[k].norm();
        }
        for (row, value) in medians.iter_mut().zip(median_filter(&track, kernel)) {
            row[k] = value;
        }
    }
    medians
}

/// Outcome of harmonic-percussive separation.
struct Separation {
    harmonic_ratio: f64,
    percussive_ratio: f64,
    /// Pitch-class power of the harmonic component, per frame
    harmonic_chroma: Vec<[f64; 12]>,
}

/// Splits the spectrogram into harmonic and percussive parts with soft
/// masks built from a time-wise and a frequency-wise median filter.
///
/// Masked frames are resynthesized and folded into chroma as they are
/// produced; only the time-wise medians are held for the whole signal.
fn separate(
    samples: &[f64],
    spectrogram: &Spectrogram,
    classes: &[Option<usize>],
    config: &AnalysisConfig,
) -> Separation {
    let sustained = time_medians(spectrogram, config.hpss_kernel);

    let n_bins = spectrogram.n_bins();
    let mut harmonic_synth = OverlapAdd::for_spectrogram(spectrogram);
    let mut percussive_synth = OverlapAdd::for_spectrogram(spectrogram);
    let mut harmonic_frame = vec![Complex::new(0.0, 0.0); n_bins];
    let mut percussive_frame = vec![Complex::new(0.0, 0.0); n_bins];
    let mut harmonic_chroma = Vec::with_capacity(spectrogram.n_frames());

    for (frame, held) in spectrogram.frames.iter().zip(&sustained) {
        let magnitude: Vec<f64> = frame.iter().map(|c| c.norm()).collect();
        let transient = median_filter(&magnitude, config.hpss_kernel);
        for k in 0..n_bins {
            harmonic_frame[k] = frame[k] * soft_mask(held[k], transient[k], config.hpss_power);
            percussive_frame[k] =
                frame[k] * soft_mask(transient[k], held[k], config.hpss_power);
        }
        harmonic_synth.push(&harmonic_frame);
        percussive_synth.push(&percussive_frame);
        harmonic_chroma.push(fold_chroma(
            harmonic_frame.iter().map(|c| c.norm_sqr()),
            classes,
        ));
    }
    drop(sustained);

    let total: f64 = samples.iter().map(|s| s.abs()).sum();
    let ratio = |component: Vec<f64>| {
        if total < TINY {
            return 0.0;
        }
        (component.iter().map(|s| s.abs()).sum::<f64>() / total).clamp(0.0, 1.0)
    };

    Separation {
        harmonic_ratio: ratio(harmonic_synth.finish(samples.len())),
        percussive_ratio: ratio(percussive_synth.finish(samples.len())),
        harmonic_chroma,
    }
}

/// Pitch class (C = 0) of every FFT bin, `None` below the chroma range.
fn pitch_classes(sample_rate: u32, n_fft: usize) -> Vec<Option<usize>> {
    fft_frequencies(sample_rate, n_fft)
        .into_iter()
        .map(|f| {
            if f < CHROMA_FMIN {
                return None;
            }
            let semitones_from_a = (12.0 * (f / A4_HZ).log2()).round() as i64;
            Some((semitones_from_a + 9).rem_euclid(12) as usize)
        })
        .collect()
}

/// One frame of bin power folded into 12 pitch classes.
fn fold_chroma(power: impl IntoIterator<Item = f64>, classes: &[Option<usize>]) -> [f64; 12] {
    let mut bins = [0.0; 12];
    for (p, class) in power.into_iter().zip(classes) {
        if let Some(c) = class {
            bins[*c] += p;
        }
    }
    bins
}

/// Scales each frame so its strongest pitch class is 1.
fn max_normalize(chroma: &mut [[f64; 12]]) {
    for frame in chroma {
        let peak = frame.iter().copied().fold(0.0, f64::max);
        if peak > TINY {
            frame.iter_mut().for_each(|v| *v /= peak);
        }
    }
}

/// Projects L1-normalized chroma onto the six tonnetz axes.
fn tonnetz(chroma: &[[f64; 12]]) -> Vec<[f64; 6]> {
    let mut phi = [[0.0; 12]; 6];
    for (i, row) in phi.iter_mut().enumerate() {
        let shift = if i % 2 == 0 { 0.5 } else { 0.0 };
        for (k, value) in row.iter_mut().enumerate() {
            *value =
                TONNETZ_RADIUS[i] * (std::f64::consts::PI * (TONNETZ_SCALE[i] * k as f64 - shift)).cos();
        }
    }

    chroma
        .iter()
        .map(|frame| {
            let total: f64 = frame.iter().sum();
            let mut centroid = [0.0; 6];
            if total > TINY {
                for (axis, row) in centroid.iter_mut().zip(&phi) {
                    *axis = row.iter().zip(frame).map(|(w, c)| w * c / total).sum();
                }
            }
            centroid
        })
        .collect()
}

pub(crate) fn analyze(
    samples: &[f64],
    spectrogram: &Spectrogram,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> HarmonicDescriptors {
    let classes = pitch_classes(sample_rate, config.n_fft);
    let separation = separate(samples, spectrogram, &classes, config);

    let mut chroma_frames: Vec<[f64; 12]> = spectrogram
        .power_frames()
        .map(|power| fold_chroma(power, &classes))
        .collect();
    max_normalize(&mut chroma_frames);
    let chroma_values: Vec<f64> = chroma_frames.iter().flatten().copied().collect();

    let filterbank = mel_filterbank(sample_rate, config.n_fft, config.n_mels);
    let mel_db = power_to_db_matrix(&mel_spectrogram(spectrogram.power_frames(), &filterbank));
    let mfcc_values: Vec<f64> = mel_db
        .iter()
        .flat_map(|frame| dct_ortho(frame, config.n_mfcc))
        .collect();

    let tonnetz_values: Vec<f64> = tonnetz(&separation.harmonic_chroma)
        .iter()
        .flatten()
        .copied()
        .collect();

    let (chroma_mean, chroma_std) = stats::mean_std(&chroma_values);
    let (mfcc_mean, mfcc_std) = stats::mean_std(&mfcc_values);
    let (tonnetz_mean, tonnetz_std) = stats::mean_std(&tonnetz_values);

    HarmonicDescriptors {
        harmonic_ratio: separation.harmonic_ratio,
        percussive_ratio: separation.percussive_ratio,
        chroma_mean,
        chroma_std,
        mfcc_mean,
        mfcc_std,
        tonnetz_mean,
        tonnetz_std,
    }
}
