//! Decoded PCM waveform.

use crate::error::{AnalysisError, AnalysisResult};

/// Mono PCM samples normalized to [-1.0, 1.0] plus their sample rate.
///
/// A waveform is owned by one analysis invocation and never mutated after
/// decode; analyzers only borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Wraps mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Builds a mono waveform from interleaved frames by averaging channels.
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Self {
        if channels <= 1 {
            return Self::new(interleaved.to_vec(), sample_rate);
        }

        let samples = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// The mono samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the waveform has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds (0 for an invalid sample rate).
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Rejects waveforms no analyzer can work on.
    pub(crate) fn ensure_analyzable(&self) -> AnalysisResult<()> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        if self.samples.is_empty() {
            return Err(AnalysisError::EmptyWaveform);
        }
        Ok(())
    }
}
