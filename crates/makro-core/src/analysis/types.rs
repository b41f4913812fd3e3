//! Descriptor records produced by the analyzers.

use serde::{Deserialize, Serialize};

/// Placeholder used for tag fields that are absent or unparseable.
pub const UNKNOWN: &str = "Unknown";

/// A named group of scalar descriptors.
///
/// Lets callers walk every field of a group without knowing its layout, which
/// the aggregator uses for the finiteness check and the CLI for printing.
pub trait DescriptorGroup {
    /// Key of the group in the descriptor set.
    const NAME: &'static str;

    /// Every field as `(name, value)` in declaration order.
    fn fields(&self) -> Vec<(&'static str, f64)>;
}

/// Container and tag facts about the analyzed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Duration in seconds
    pub duration: f64,
    /// Audio bitrate in bits per second
    pub bitrate: u64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Title tag or `"Unknown"`
    pub title: String,
    /// Artist tag or `"Unknown"`
    pub artist: String,
    /// Genre tag or `"Unknown"`
    pub genre: String,
}

impl MetadataRecord {
    /// Record with container properties and every tag field set to `"Unknown"`.
    pub fn untagged(duration: f64, bitrate: u64, sample_rate: u32) -> Self {
        Self {
            duration,
            bitrate,
            sample_rate,
            title: UNKNOWN.to_string(),
            artist: UNKNOWN.to_string(),
            genre: UNKNOWN.to_string(),
        }
    }
}

/// Metadata slot of the descriptor set.
///
/// Serializes either as the plain record or as `{"error": message}` when the
/// container could not be opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metadata {
    /// Metadata was read (possibly with degraded tag fields).
    Record(MetadataRecord),
    /// The container could not be read.
    Error {
        /// Reader error message
        error: String,
    },
}

impl Metadata {
    /// The record, if one was read.
    pub fn record(&self) -> Option<&MetadataRecord> {
        match self {
            Metadata::Record(record) => Some(record),
            Metadata::Error { .. } => None,
        }
    }

    /// Duration in seconds, 0 for an error placeholder.
    pub fn duration(&self) -> f64 {
        self.record().map_or(0.0, |r| r.duration)
    }

    /// Bitrate in bits per second, 0 for an error placeholder.
    pub fn bitrate(&self) -> u64 {
        self.record().map_or(0, |r| r.bitrate)
    }

    /// Genre tag, `"Unknown"` for an error placeholder.
    pub fn genre(&self) -> &str {
        self.record().map_or(UNKNOWN, |r| r.genre.as_str())
    }
}

/// Frame-level amplitude statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TemporalDescriptors {
    pub rms_mean: f64,
    pub rms_std: f64,
    pub rms_max: f64,
    pub zcr_mean: f64,
    pub zcr_std: f64,
}

/// Short-time spectrum shape statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectralDescriptors {
    /// Spectral centroid in Hz
    pub centroid_mean: f64,
    pub centroid_std: f64,
    /// Spectral bandwidth in Hz
    pub bandwidth_mean: f64,
    pub bandwidth_std: f64,
    /// Rolloff frequency in Hz
    pub rolloff_mean: f64,
    pub rolloff_std: f64,
    /// Peak-to-valley contrast in dB
    pub contrast_mean: f64,
    pub contrast_std: f64,
    /// Spectral flatness in [0, 1]
    pub flatness_mean: f64,
    pub flatness_std: f64,
}

/// Tempo, beat and onset statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RhythmicDescriptors {
    /// Global tempo estimate, always positive
    pub tempo_bpm: f64,
    /// Number of tracked beats
    pub beats_count: u64,
    pub onset_strength_mean: f64,
    pub onset_strength_max: f64,
    pub tempogram_mean: f64,
    pub tempogram_std: f64,
}

/// Harmonic/percussive balance and pitch/timbre statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HarmonicDescriptors {
    /// Harmonic share of absolute amplitude in [0, 1]
    pub harmonic_ratio: f64,
    /// Percussive share of absolute amplitude in [0, 1]
    pub percussive_ratio: f64,
    pub chroma_mean: f64,
    pub chroma_std: f64,
    pub mfcc_mean: f64,
    pub mfcc_std: f64,
    pub tonnetz_mean: f64,
    pub tonnetz_std: f64,
}

/// Energy and loudness statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyDescriptors {
    /// Sum of squared samples
    pub total_energy: f64,
    /// Spectrogram level in dB relative to its peak (all values <= 0)
    pub loudness_mean: f64,
    pub loudness_max: f64,
    pub loudness_min: f64,
    /// Spread between loudest and quietest frame RMS
    pub dynamic_range: f64,
}

/// Everything the synthesizer needs to know about one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalDescriptorSet {
    pub metadata: Metadata,
    pub temporal: TemporalDescriptors,
    pub spectral: SpectralDescriptors,
    pub rhythmic: RhythmicDescriptors,
    pub harmonic: HarmonicDescriptors,
    pub energy: EnergyDescriptors,
}

impl TechnicalDescriptorSet {
    /// Every numeric descriptor as `("group.field", value)`.
    pub fn numeric_fields(&self) -> Vec<(String, f64)> {
        fn qualify<G: DescriptorGroup>(group: &G) -> impl Iterator<Item = (String, f64)> {
            group
                .fields()
                .into_iter()
                .map(|(name, value)| (format!("{}.{}", G::NAME, name), value))
        }

        let mut fields = Vec::new();
        if let Metadata::Record(record) = &self.metadata {
            fields.push(("metadata.duration".to_string(), record.duration));
        }
        fields.extend(qualify(&self.temporal));
        fields.extend(qualify(&self.spectral));
        fields.extend(qualify(&self.rhythmic));
        fields.extend(qualify(&self.harmonic));
        fields.extend(qualify(&self.energy));
        fields
    }

    /// Name of the first non-finite descriptor, if any.
    pub fn first_non_finite(&self) -> Option<String> {
        self.numeric_fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(name, _)| name)
    }
}

impl DescriptorGroup for TemporalDescriptors {
    const NAME: &'static str = "temporal";

    fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("rms_mean", self.rms_mean),
            ("rms_std", self.rms_std),
            ("rms_max", self.rms_max),
            ("zcr_mean", self.zcr_mean),
            ("zcr_std", self.zcr_std),
        ]
    }
}

impl DescriptorGroup for SpectralDescriptors {
    const NAME: &'static str = "spectral";

    fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("centroid_mean", self.centroid_mean),
            ("centroid_std", self.centroid_std),
            ("bandwidth_mean", self.bandwidth_mean),
            ("bandwidth_std", self.bandwidth_std),
            ("rolloff_mean", self.rolloff_mean),
            ("rolloff_std", self.rolloff_std),
            ("contrast_mean", self.contrast_mean),
            ("contrast_std", self.contrast_std),
            ("flatness_mean", self.flatness_mean),
            ("flatness_std", self.flatness_std),
        ]
    }
}

impl DescriptorGroup for RhythmicDescriptors {
    const NAME: &'static str = "rhythmic";

    fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("tempo_bpm", self.tempo_bpm),
            ("beats_count", self.beats_count as f64),
            ("onset_strength_mean", self.onset_strength_mean),
            ("onset_strength_max", self.onset_strength_max),
            ("tempogram_mean", self.tempogram_mean),
            ("tempogram_std", self.tempogram_std),
        ]
    }
}

impl DescriptorGroup for HarmonicDescriptors {
    const NAME: &'static str = "harmonic";

    fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("harmonic_ratio", self.harmonic_ratio),
            ("percussive_ratio", self.percussive_ratio),
            ("chroma_mean", self.chroma_mean),
            ("chroma_std", self.chroma_std),
            ("mfcc_mean", self.mfcc_mean),
            ("mfcc_std", self.mfcc_std),
            ("tonnetz_mean", self.tonnetz_mean),
            ("tonnetz_std", self.tonnetz_std),
        ]
    }
}

impl DescriptorGroup for EnergyDescriptors {
    const NAME: &'static str = "energy";

    fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("total_energy", self.total_energy),
            ("loudness_mean", self.loudness_mean),
            ("loudness_max", self.loudness_max),
            ("loudness_min", self.loudness_min),
            ("dynamic_range", self.dynamic_range),
        ]
    }
}
