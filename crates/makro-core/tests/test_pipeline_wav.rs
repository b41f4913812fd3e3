//! End-to-end pipeline tests over synthesized WAV files.

use std::path::Path;

use lofty::config::WriteOptions;
use lofty::tag::{Accessor, Tag, TagExt, TagType};
use makro_core::upload;
use makro_core::{
    AnalysisExport, FeatureAggregator, Metadata, PipelineConfig, PipelineError,
};
use pretty_assertions::assert_eq;

const SR: u32 = 22050;

/// Bass tone with a click every half second.
fn write_groove(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..seconds * SR {
        let t = i as f32 / SR as f32;
        let tone = (2.0 * std::f32::consts::PI * 110.0 * t).sin() * 0.3;
        let click = if i % (SR / 2) < 64 { 0.6 } else { 0.0 };
        let sample = ((tone + click) * i16::MAX as f32) as i16;
        writer.write_sample(sample).unwrap();
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

fn tag_genre(path: &Path, genre: &str) {
    let mut tag = Tag::new(TagType::RiffInfo);
    tag.set_title("Groove".to_string());
    tag.set_genre(genre.to_string());
    tag.save_to_path(path, WriteOptions::default()).unwrap();
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_run_produces_complete_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("groove.wav");
    write_groove(&path, 4);
    tag_genre(&path, "Brazilian Trap");

    let export = FeatureAggregator::new(PipelineConfig::default())
        .run(&path)
        .unwrap();

    let set = &export.technical_analysis;
    assert!(set.first_non_finite().is_none());
    let record = set.metadata.record().unwrap();
    assert_eq!(record.sample_rate, SR);
    assert_eq!(record.genre, "Brazilian Trap");
    assert!((record.duration - 4.0).abs() < 0.02);

    assert!(set.rhythmic.tempo_bpm > 0.0);
    assert!(set.temporal.rms_mean > 0.0);
    assert!(set.energy.total_energy > 0.0);
    assert!((0.0..=1.0).contains(&set.harmonic.harmonic_ratio));
    assert!((0.0..=1.0).contains(&set.harmonic.percussive_ratio));

    let lines: Vec<&str> = export.ace_step_description.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[4].starts_with("Lyrics centered on luxury cars"));
}

#[test]
fn test_untagged_file_reads_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.wav");
    write_groove(&path, 2);

    let set = FeatureAggregator::new(PipelineConfig::default())
        .analyze_file(&path)
        .unwrap();
    match &set.metadata {
        Metadata::Record(record) => {
            assert_eq!(record.title, "Unknown");
            assert_eq!(record.artist, "Unknown");
            assert_eq!(record.genre, "Unknown");
        }
        other => panic!("expected a metadata record, got {other:?}"),
    }
}

#[test]
fn test_analysis_is_bit_identical_across_runs_and_modes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("groove.wav");
    write_groove(&path, 3);

    let parallel = FeatureAggregator::new(PipelineConfig::default());
    let mut sequential_config = PipelineConfig::default();
    sequential_config.analysis.parallel = false;
    let sequential = FeatureAggregator::new(sequential_config);

    let first = parallel.analyze_file(&path).unwrap();
    let second = parallel.analyze_file(&path).unwrap();
    let third = sequential.analyze_file(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn test_silent_file_uses_else_branches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silence.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SR,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for _ in 0..SR * 2 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();

    let export = FeatureAggregator::new(PipelineConfig::default())
        .run(&path)
        .unwrap();
    let set = &export.technical_analysis;
    assert_eq!(set.temporal.rms_mean, 0.0);
    assert_eq!(set.harmonic.harmonic_ratio, 0.0);
    assert_eq!(set.harmonic.percussive_ratio, 0.0);
    assert_eq!(set.energy.total_energy, 0.0);
    assert!(set.rhythmic.tempo_bpm > 0.0);
    assert_eq!(export.ace_step_description.lines().count(), 6);
}

#[test]
fn test_missing_file_is_decode_error() {
    let err = FeatureAggregator::new(PipelineConfig::default())
        .run("/nonexistent/track.wav")
        .unwrap_err();
    assert!(matches!(err, PipelineError::Decode(_)));
}

// ============================================================================
// Staging and Export
// ============================================================================

#[test]
fn test_staged_upload_round_trips_through_export() {
    let source_dir = tempfile::tempdir().unwrap();
    let staging_dir = tempfile::tempdir().unwrap();
    let path = source_dir.path().join("upload.wav");
    write_groove(&path, 2);

    let mut config = PipelineConfig::default();
    config.upload.temp_dir = Some(staging_dir.path().to_path_buf());
    let aggregator = FeatureAggregator::new(config.clone());

    let staged = upload::stage(&path, &config.upload).unwrap();
    let staged_path = staged.path().to_path_buf();
    let export = aggregator.run(staged.path()).unwrap();
    drop(staged);
    assert!(!staged_path.exists());

    let out = source_dir.path().join("analysis.json");
    export.write_to(&out).unwrap();
    let parsed = AnalysisExport::from_json(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(parsed, export);
}
