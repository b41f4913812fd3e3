//! Rule-based production brief.
//!
//! [`DescriptionSynthesizer`] maps a [`TechnicalDescriptorSet`] through a
//! fixed decision table into six phrases. Every threshold lives in
//! [`DescriptionRules`] so the table can be audited and overridden from
//! configuration; the defaults are the values the brief was tuned with.
//!
//! The mapping is total: every comparison has an else branch, so degenerate
//! or placeholder descriptors still produce six well-formed segments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::types::TechnicalDescriptorSet;

const GENRE_FUNK_TRAP: &str = "Funk / Trap: A heavy, bass-driven Brazilian track inspired by the raw street intensity of MC Poze do Rodo blended with the melodic trap swagger of Matuê.";
const GENRE_FUNK_CARIOCA: &str = "Funk Carioca / Phonk: A raw street funk with deep bass and minimal melodic elements, channeling underground Brazilian sound.";
const GENRE_RNB: &str = "R&B / Soul: A smooth, melodic track with rich harmonic textures and emotional depth.";
const GENRE_ELECTRONIC: &str = "Electronic / Dance: A high-energy electronic track with pulsating rhythms and club-ready production.";
const GENRE_URBAN: &str = "Urban / Hip-Hop: A contemporary urban track blending various street music influences with modern production techniques.";

const ATMOSPHERE_DARK: &str = "Dark, dominant atmosphere";
const ATMOSPHERE_ENERGETIC: &str = "Energetic, vibrant atmosphere";
const ATMOSPHERE_SMOOTH: &str = "Smooth, laid-back atmosphere";

const ELEMENT_808: &str = "distorted sub-heavy 808s";
const ELEMENT_KICKS: &str = "hard punchy kicks";
const ELEMENT_SNARES: &str = "explosive snares";
const ELEMENT_TAMBORZAO: &str = "classic tamborzão percussion";
const ELEMENT_HATS: &str = "spacious trap-style hi-hats";

const VOCALS_AGGRESSIVE: &str = "Vocals delivered with commanding, gritty flow — alternating between aggressive chant-style funk cadence and melodic trap hooks with autotuned textures.";
const VOCALS_SMOOTH: &str = "Vocals delivered with smooth, melodic flow — balancing emotional delivery with rhythmic precision and subtle vocal layering.";

const LYRICS_STREET: &str = "Lyrics centered on luxury cars, fast lifestyles, power, and seductive energy, maintaining a street-authentic tone without losing mainstream appeal.";
const LYRICS_GENERIC: &str = "Lyrics exploring personal experiences, emotional depth, and contemporary themes with authentic storytelling and relatable narratives.";

const QUALITY_POLISHED: &str = "gritty yet polished";
const QUALITY_CLEAR: &str = "raw with professional clarity";
const QUALITY_STREET: &str = "authentic and street-ready";

/// Thresholds of the genre/style decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenreRules {
    /// Street styles need a tempo above this (BPM)
    pub street_min_tempo: f64,
    /// ...a percussive ratio above this
    pub street_min_percussive: f64,
    /// ...and a mean loudness above this (dB)
    pub street_min_loudness: f64,
    /// Street tracks brighter than this centroid (Hz) read as funk/trap
    pub bright_min_centroid: f64,
    /// Soul needs a tempo below this (BPM)
    pub soul_max_tempo: f64,
    /// ...and a harmonic ratio above this
    pub soul_min_harmonic: f64,
    /// Dance needs a tempo above this (BPM)
    pub dance_min_tempo: f64,
    /// ...and a percussive ratio above this
    pub dance_min_percussive: f64,
}

impl Default for GenreRules {
    fn default() -> Self {
        Self {
            street_min_tempo: 120.0,
            street_min_percussive: 0.5,
            street_min_loudness: -20.0,
            bright_min_centroid: 2000.0,
            soul_max_tempo: 90.0,
            soul_min_harmonic: 0.6,
            dance_min_tempo: 140.0,
            dance_min_percussive: 0.6,
        }
    }
}

/// Thresholds of the atmosphere decision and its texture elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosphereRules {
    pub dark_min_loudness: f64,
    pub dark_min_dynamic_range: f64,
    pub energetic_min_loudness: f64,
    /// Rolloff below this (Hz) adds the 808 element
    pub sub_bass_max_rolloff: f64,
    /// Onset peak above this adds the kick element
    pub punchy_min_onset: f64,
    /// Dynamic range above this adds the snare element
    pub explosive_min_dynamic_range: f64,
}

impl Default for AtmosphereRules {
    fn default() -> Self {
        Self {
            dark_min_loudness: -15.0,
            dark_min_dynamic_range: 0.05,
            energetic_min_loudness: -20.0,
            sub_bass_max_rolloff: 3000.0,
            punchy_min_onset: 0.5,
            explosive_min_dynamic_range: 0.06,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocalRules {
    /// Tempo above which the aggressive delivery is chosen (BPM)
    pub aggressive_min_tempo: f64,
}

impl Default for VocalRules {
    fn default() -> Self {
        Self {
            aggressive_min_tempo: 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricRules {
    /// Case-insensitive genre substrings that select the street theme
    pub street_genre_keywords: Vec<String>,
}

impl Default for LyricRules {
    fn default() -> Self {
        Self {
            street_genre_keywords: vec!["funk".to_string(), "trap".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionRules {
    /// Bitrate (bits/s) above which the polished wording is possible
    pub polished_min_bitrate: u64,
    /// ...provided the mean bandwidth exceeds this (Hz)
    pub polished_min_bandwidth: f64,
    /// Bitrate (bits/s) above which the clear wording is used
    pub clear_min_bitrate: u64,
}

impl Default for ProductionRules {
    fn default() -> Self {
        Self {
            polished_min_bitrate: 256_000,
            polished_min_bandwidth: 2000.0,
            clear_min_bitrate: 128_000,
        }
    }
}

/// The complete decision table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptionRules {
    pub genre: GenreRules,
    pub atmosphere: AtmosphereRules,
    pub vocals: VocalRules,
    pub lyrics: LyricRules,
    pub production: ProductionRules,
}

/// The six segments of a production brief, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionText {
    pub genre_style: String,
    pub atmosphere: String,
    pub structure: String,
    pub vocals: String,
    pub lyrics_theme: String,
    pub production: String,
}

impl DescriptionText {
    pub fn segments(&self) -> [&str; 6] {
        [
            &self.genre_style,
            &self.atmosphere,
            &self.structure,
            &self.vocals,
            &self.lyrics_theme,
            &self.production,
        ]
    }

    /// Segments joined by newlines and trimmed.
    pub fn as_string(&self) -> String {
        self.segments().join("\n").trim().to_string()
    }
}

impl fmt::Display for DescriptionText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Truncates toward zero, rendering non-finite and negative values as 0.
fn whole(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}

/// Pure mapping from descriptors to a production brief.
#[derive(Debug, Clone, Default)]
pub struct DescriptionSynthesizer {
    rules: DescriptionRules,
}

impl DescriptionSynthesizer {
    pub fn new(rules: DescriptionRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &DescriptionRules {
        &self.rules
    }

    pub fn describe(&self, set: &TechnicalDescriptorSet) -> DescriptionText {
        DescriptionText {
            genre_style: self.genre_style(set).to_string(),
            atmosphere: self.atmosphere(set),
            structure: self.structure(set),
            vocals: self.vocals(set).to_string(),
            lyrics_theme: self.lyrics_theme(set).to_string(),
            production: self.production(set),
        }
    }

    fn genre_style(&self, set: &TechnicalDescriptorSet) -> &'static str {
        let r = &self.rules.genre;
        let tempo = set.rhythmic.tempo_bpm;
        let percussive = set.harmonic.percussive_ratio;

        if tempo > r.street_min_tempo
            && percussive > r.street_min_percussive
            && set.energy.loudness_mean > r.street_min_loudness
        {
            if set.spectral.centroid_mean > r.bright_min_centroid {
                GENRE_FUNK_TRAP
            } else {
                GENRE_FUNK_CARIOCA
            }
        } else if tempo < r.soul_max_tempo && set.harmonic.harmonic_ratio > r.soul_min_harmonic {
            GENRE_RNB
        } else if tempo > r.dance_min_tempo && percussive > r.dance_min_percussive {
            GENRE_ELECTRONIC
        } else {
            GENRE_URBAN
        }
    }

    fn atmosphere(&self, set: &TechnicalDescriptorSet) -> String {
        let r = &self.rules.atmosphere;
        let loudness = set.energy.loudness_mean;
        let dynamic_range = set.energy.dynamic_range;

        let base = if loudness > r.dark_min_loudness && dynamic_range > r.dark_min_dynamic_range {
            ATMOSPHERE_DARK
        } else if loudness > r.energetic_min_loudness {
            ATMOSPHERE_ENERGETIC
        } else {
            ATMOSPHERE_SMOOTH
        };

        let mut elements = Vec::with_capacity(5);
        if set.spectral.rolloff_mean < r.sub_bass_max_rolloff {
            elements.push(ELEMENT_808);
        }
        if set.rhythmic.onset_strength_max > r.punchy_min_onset {
            elements.push(ELEMENT_KICKS);
        }
        if dynamic_range > r.explosive_min_dynamic_range {
            elements.push(ELEMENT_SNARES);
        }
        elements.push(ELEMENT_TAMBORZAO);
        elements.push(ELEMENT_HATS);

        format!("{} with {}.", base, elements.join(", "))
    }

    fn structure(&self, set: &TechnicalDescriptorSet) -> String {
        format!(
            "The instrumental builds from a tense, minimal intro into a massive low-end drop, \
             layering hypnotic rhythms with cinematic synth textures over {} minutes at {} BPM.",
            whole(set.metadata.duration() / 60.0),
            whole(set.rhythmic.tempo_bpm)
        )
    }

    fn vocals(&self, set: &TechnicalDescriptorSet) -> &'static str {
        if set.rhythmic.tempo_bpm > self.rules.vocals.aggressive_min_tempo {
            VOCALS_AGGRESSIVE
        } else {
            VOCALS_SMOOTH
        }
    }

    fn lyrics_theme(&self, set: &TechnicalDescriptorSet) -> &'static str {
        let genre = set.metadata.genre().to_lowercase();
        let street = self
            .rules
            .lyrics
            .street_genre_keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && genre.contains(&keyword.to_lowercase()));
        if street {
            LYRICS_STREET
        } else {
            LYRICS_GENERIC
        }
    }

    fn production(&self, set: &TechnicalDescriptorSet) -> String {
        let r = &self.rules.production;
        let bitrate = set.metadata.bitrate();

        let quality = if bitrate > r.polished_min_bitrate
            && set.spectral.bandwidth_mean > r.polished_min_bandwidth
        {
            QUALITY_POLISHED
        } else if bitrate > r.clear_min_bitrate {
            QUALITY_CLEAR
        } else {
            QUALITY_STREET
        };

        format!(
            "Production must feel {quality} — heavy club pressure in the low-end, modern trap \
             clarity in the highs, and the immersive energy of a packed Rio night scene."
        )
    }
}
