//! Analyzer tests over synthetic signals.

use super::*;
use proptest::prelude::*;

const SR: u32 = 22050;

fn sine(frequency: f32, amplitude: f32, seconds: f32) -> Waveform {
    let n = (SR as f32 * seconds) as usize;
    let samples = (0..n)
        .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / SR as f32).sin() * amplitude)
        .collect();
    Waveform::new(samples, SR)
}

/// Deterministic white-ish noise from a 32-bit LCG.
fn noise(seconds: f32) -> Waveform {
    let n = (SR as f32 * seconds) as usize;
    let mut state: u32 = 0x1234_5678;
    let samples = (0..n)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        })
        .collect();
    Waveform::new(samples, SR)
}

/// Unit impulses every `spacing` samples.
fn clicks(spacing: usize, seconds: f32) -> Waveform {
    let n = (SR as f32 * seconds) as usize;
    let samples = (0..n)
        .map(|i| if i % spacing == 0 { 1.0 } else { 0.0 })
        .collect();
    Waveform::new(samples, SR)
}

fn silence(seconds: f32) -> Waveform {
    Waveform::new(vec![0.0; (SR as f32 * seconds) as usize], SR)
}

fn config() -> AnalysisConfig {
    AnalysisConfig::default()
}

#[test]
fn test_silence_temporal_is_zero() {
    let t = analyze_temporal(&silence(1.0), &config()).unwrap();
    assert_eq!(t, TemporalDescriptors::default());
}

#[test]
fn test_silence_spectral_degenerate_values() {
    let s = analyze_spectral(&silence(1.0), &config()).unwrap();
    assert_eq!(s.centroid_mean, 0.0);
    assert_eq!(s.rolloff_mean, 0.0);
    assert_eq!(s.flatness_mean, 0.0);
    assert_eq!(s.contrast_mean, 0.0);
}

#[test]
fn test_silence_rhythmic_keeps_positive_tempo() {
    let r = analyze_rhythmic(&silence(2.0), &config()).unwrap();
    assert!(r.tempo_bpm > 0.0);
    assert_eq!(r.beats_count, 0);
    assert_eq!(r.onset_strength_max, 0.0);
    assert_eq!(r.tempogram_mean, 0.0);
}

#[test]
fn test_silence_harmonic_ratios_are_zero() {
    let h = analyze_harmonic(&silence(1.0), &config()).unwrap();
    assert_eq!(h.harmonic_ratio, 0.0);
    assert_eq!(h.percussive_ratio, 0.0);
    assert_eq!(h.chroma_mean, 0.0);
    assert_eq!(h.tonnetz_mean, 0.0);
    assert!(h.mfcc_mean.is_finite());
}

#[test]
fn test_silence_energy_is_zero() {
    let e = analyze_energy(&silence(1.0), &config()).unwrap();
    assert_eq!(e, EnergyDescriptors::default());
}

#[test]
fn test_sine_temporal() {
    let t = analyze_temporal(&sine(440.0, 0.5, 2.0), &config()).unwrap();
    let expected_rms = 0.5 / 2f64.sqrt();
    assert!((t.rms_max - expected_rms).abs() < 0.01, "rms_max {}", t.rms_max);
    assert!(t.rms_mean <= t.rms_max);
    let expected_zcr = 2.0 * 440.0 / SR as f64;
    assert!((t.zcr_mean - expected_zcr).abs() < 0.005, "zcr {}", t.zcr_mean);
}

#[test]
fn test_sine_is_tonal_and_noise_is_flat() {
    let tonal = analyze_spectral(&sine(440.0, 0.5, 2.0), &config()).unwrap();
    let flat = analyze_spectral(&noise(2.0), &config()).unwrap();

    assert!(tonal.flatness_mean < 0.1, "sine flatness {}", tonal.flatness_mean);
    assert!(flat.flatness_mean > 0.3, "noise flatness {}", flat.flatness_mean);
    assert!(tonal.centroid_mean > 300.0 && tonal.centroid_mean < 700.0);
    assert!(flat.centroid_mean > 3000.0);
    assert!(flat.rolloff_mean > tonal.rolloff_mean);
    assert!(flat.bandwidth_mean > tonal.bandwidth_mean);
}

#[test]
fn test_sine_is_harmonic_clicks_are_percussive() {
    let tonal = analyze_harmonic(&sine(440.0, 0.5, 2.0), &config()).unwrap();
    assert!(
        tonal.harmonic_ratio > tonal.percussive_ratio,
        "sine harmonic {} percussive {}",
        tonal.harmonic_ratio,
        tonal.percussive_ratio
    );

    let hits = analyze_harmonic(&clicks(11264, 3.0), &config()).unwrap();
    assert!(
        hits.percussive_ratio > hits.harmonic_ratio,
        "clicks harmonic {} percussive {}",
        hits.harmonic_ratio,
        hits.percussive_ratio
    );
}

#[test]
fn test_click_train_tempo_and_beats() {
    // 22 hops between clicks: 60 * 22050 / (512 * 22) BPM.
    let r = analyze_rhythmic(&clicks(22 * 512, 10.0), &config()).unwrap();
    let expected = 60.0 * SR as f64 / (512.0 * 22.0);
    assert!((r.tempo_bpm - expected).abs() < 0.5, "tempo {}", r.tempo_bpm);
    assert!(
        (10..=22).contains(&r.beats_count),
        "beats {}",
        r.beats_count
    );
    assert!(r.onset_strength_max > 0.0);
    assert!(r.tempogram_std > 0.0);
}

#[test]
fn test_energy_loudness_is_relative_to_peak() {
    let e = analyze_energy(&sine(440.0, 0.5, 1.0), &config()).unwrap();
    assert_eq!(e.loudness_max, 0.0);
    assert!(e.loudness_min >= -80.0);
    assert!(e.loudness_mean < 0.0);
    let expected_energy = 0.25 / 2.0 * SR as f64;
    assert!((e.total_energy - expected_energy).abs() / expected_energy < 0.01);
}

#[test]
fn test_dynamic_range_grows_with_level_change() {
    let mut samples = sine(440.0, 0.05, 1.0).samples().to_vec();
    samples.extend(sine(440.0, 0.8, 1.0).samples());
    let varied = Waveform::new(samples, SR);

    let steady = analyze_energy(&sine(440.0, 0.5, 2.0), &config()).unwrap();
    let changing = analyze_energy(&varied, &config()).unwrap();
    assert!(changing.dynamic_range > steady.dynamic_range);
}

#[test]
fn test_analyzers_reject_empty_waveform() {
    let empty = Waveform::new(vec![], SR);
    assert_eq!(
        analyze_temporal(&empty, &config()),
        Err(crate::error::AnalysisError::EmptyWaveform)
    );
    assert!(analyze_harmonic(&empty, &config()).is_err());
}

#[test]
fn test_analyzers_reject_invalid_config() {
    let bad = AnalysisConfig {
        n_fft: 0,
        ..config()
    };
    assert!(analyze_spectral(&sine(440.0, 0.5, 0.5), &bad).is_err());
}

#[test]
fn test_analysis_is_deterministic() {
    let wf = noise(1.0);
    assert_eq!(
        analyze_rhythmic(&wf, &config()).unwrap(),
        analyze_rhythmic(&wf, &config()).unwrap()
    );
    assert_eq!(
        analyze_harmonic(&wf, &config()).unwrap(),
        analyze_harmonic(&wf, &config()).unwrap()
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_descriptors_stay_in_range(
        samples in prop::collection::vec(-1.0f32..1.0, 1..6000),
        sample_rate in prop::sample::select(vec![8000u32, 22050, 44100]),
    ) {
        let wf = Waveform::new(samples, sample_rate);
        let config = config();

        let t = analyze_temporal(&wf, &config).unwrap();
        let s = analyze_spectral(&wf, &config).unwrap();
        let r = analyze_rhythmic(&wf, &config).unwrap();
        let h = analyze_harmonic(&wf, &config).unwrap();
        let e = analyze_energy(&wf, &config).unwrap();

        for (name, value) in t.fields().into_iter()
            .chain(s.fields())
            .chain(r.fields())
            .chain(h.fields())
            .chain(e.fields())
        {
            prop_assert!(value.is_finite(), "{} = {}", name, value);
        }
        prop_assert!(t.rms_mean >= 0.0 && t.zcr_mean >= 0.0);
        prop_assert!((0.0..=1.0).contains(&s.flatness_mean));
        prop_assert!(r.tempo_bpm > 0.0);
        prop_assert!((0.0..=1.0).contains(&h.harmonic_ratio));
        prop_assert!((0.0..=1.0).contains(&h.percussive_ratio));
        prop_assert!(e.loudness_max <= 0.0);
        prop_assert!(e.total_energy >= 0.0 && e.dynamic_range >= 0.0);
    }
}
