//! Centered short-time Fourier transform and its inverse.
//!
//! Frames are `n_fft` samples long, taken every `hop_length` samples from the
//! signal zero-padded by `n_fft / 2` on both sides, so frame `t` is centred on
//! sample `t * hop_length`. A periodic Hann window is applied before the FFT.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Smallest normal `f32`, used as the "effectively zero" threshold.
pub(crate) const TINY: f64 = f32::MIN_POSITIVE as f64;

/// Periodic Hann window of length `n`.
pub(crate) fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos()))
        .collect()
}

/// Number of centered frames for a signal of `len` samples.
pub(crate) fn frame_count(len: usize, hop_length: usize) -> usize {
    1 + len / hop_length
}

/// Pads `samples` by `pad` zeros on both sides.
pub(crate) fn pad_zero(samples: &[f64], pad: usize) -> Vec<f64> {
    let mut padded = vec![0.0; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);
    padded
}

/// Pads `samples` by repeating the edge values `pad` times on both sides.
pub(crate) fn pad_edge(samples: &[f64], pad: usize) -> Vec<f64> {
    let first = samples.first().copied().unwrap_or(0.0);
    let last = samples.last().copied().unwrap_or(0.0);
    let mut padded = Vec::with_capacity(samples.len() + 2 * pad);
    padded.extend(std::iter::repeat(first).take(pad));
    padded.extend_from_slice(samples);
    padded.extend(std::iter::repeat(last).take(pad));
    padded
}

/// Slices `padded` into `n_frames` windows of `frame_length` samples.
///
/// Frames running past the end of the buffer are zero-extended. Each frame
/// is produced on demand.
pub(crate) fn frames(
    padded: &[f64],
    frame_length: usize,
    hop_length: usize,
    n_frames: usize,
) -> impl Iterator<Item = Vec<f64>> + '_ {
    (0..n_frames).map(move |t| {
        let start = (t * hop_length).min(padded.len());
        let end = (start + frame_length).min(padded.len());
        let mut frame = padded[start..end].to_vec();
        frame.resize(frame_length, 0.0);
        frame
    })
}

/// Frequency in Hz of each one-sided FFT bin.
pub(crate) fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    (0..=n_fft / 2)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect()
}

/// One-sided complex spectrogram, indexed `[frame][bin]`.
#[derive(Debug, Clone)]
pub(crate) struct Spectrogram {
    pub frames: Vec<Vec<Complex<f64>>>,
    pub n_fft: usize,
    pub hop_length: usize,
}

impl Spectrogram {
    /// Centered STFT of `samples`.
    pub fn compute(samples: &[f64], n_fft: usize, hop_length: usize) -> Self {
        let n_frames = frame_count(samples.len(), hop_length);
        let padded = pad_zero(samples, n_fft / 2);
        let window = hann_window(n_fft);
        let n_bins = n_fft / 2 + 1;

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_fft);

        let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
        let frames = self::frames(&padded, n_fft, hop_length, n_frames)
            .map(|frame| {
                for ((slot, &s), &w) in buffer.iter_mut().zip(&frame).zip(&window) {
                    *slot = Complex::new(s * w, 0.0);
                }
                fft.process(&mut buffer);
                buffer[..n_bins].to_vec()
            })
            .collect();

        Self {
            frames,
            n_fft,
            hop_length,
        }
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// `|S|` of each frame, computed lazily.
    pub fn magnitude_frames(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
    }

    /// `|S|^2` of each frame, computed lazily.
    pub fn power_frames(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
    }
}

/// Incremental inverse of [`Spectrogram::compute`] by windowed overlap-add.
///
/// Frames are pushed in time order, so a modified spectrogram can be
/// resynthesized one frame at a time without materializing it.
pub(crate) struct OverlapAdd {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f64>,
    ifft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    signal: Vec<f64>,
    next_frame: usize,
}

impl OverlapAdd {
    /// Accumulator sized for a signal analyzed into `spectrogram`.
    pub fn for_spectrogram(spectrogram: &Spectrogram) -> Self {
        let (n_fft, hop_length) = (spectrogram.n_fft, spectrogram.hop_length);
        let expected_len = n_fft + hop_length * spectrogram.n_frames().saturating_sub(1);
        let mut planner = FftPlanner::<f64>::new();
        Self {
            n_fft,
            hop_length,
            window: hann_window(n_fft),
            ifft: planner.plan_fft_inverse(n_fft),
            buffer: vec![Complex::new(0.0, 0.0); n_fft],
            signal: vec![0.0; expected_len],
            next_frame: 0,
        }
    }

    /// Adds the next one-sided frame of `n_fft / 2 + 1` bins.
    pub fn push(&mut self, frame: &[Complex<f64>]) {
        let n_fft = self.n_fft;
        let n_bins = n_fft / 2 + 1;
        for (k, slot) in self.buffer.iter_mut().enumerate() {
            *slot = if k < n_bins {
                frame[k]
            } else {
                frame[n_fft - k].conj()
            };
        }
        // A real signal has purely real DC and Nyquist bins.
        self.buffer[0].im = 0.0;
        self.buffer[n_fft / 2].im = 0.0;

        self.ifft.process(&mut self.buffer);

        let offset = self.next_frame * self.hop_length;
        for (i, c) in self.buffer.iter().enumerate() {
            self.signal[offset + i] += c.re / n_fft as f64 * self.window[i];
        }
        self.next_frame += 1;
    }

    /// Summed squared window over every pushed frame covering `position`.
    fn window_sum(&self, position: usize) -> f64 {
        let last = (position / self.hop_length).min(self.next_frame - 1);
        let first = (position + 1).saturating_sub(self.n_fft).div_ceil(self.hop_length);
        (first..=last)
            .map(|t| self.window[position - t * self.hop_length].powi(2))
            .sum()
    }

    /// Normalizes by the summed squared window, strips the centering pad and
    /// cuts or zero-extends the result to `length` samples.
    pub fn finish(self, length: usize) -> Vec<f64> {
        if self.next_frame == 0 {
            return vec![0.0; length];
        }
        let start = self.n_fft / 2;
        let end = (start + length).min(self.signal.len());
        let mut out: Vec<f64> = (start..end)
            .map(|position| {
                let w = self.window_sum(position);
                if w > TINY {
                    self.signal[position] / w
                } else {
                    self.signal[position]
                }
            })
            .collect();
        out.resize(length, 0.0);
        out
    }
}
