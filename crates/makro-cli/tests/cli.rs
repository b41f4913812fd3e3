//! Integration tests for the `makro` binary.
//!
//! Tests verify:
//! - JSON envelope of `analyze` on success and failure
//! - Brief-only output and export file writing
//! - `doctor` exit codes
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p makro-cli --test cli
//! ```

use std::fs;
use std::path::Path;
use std::process::Command;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn makro() -> Command {
    Command::new(env!("CARGO_BIN_EXE_makro"))
}

fn write_wav(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..22050u32 * 2 {
        let t = i as f32 / 22050.0;
        let s = (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.4;
        writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_analyze_json_success() {
    let tmp = tempdir().unwrap();
    let wav = tmp.path().join("tone.wav");
    write_wav(&wav);

    let output = makro()
        .args(["analyze", "--input", wav.to_str().unwrap(), "--json"])
        .output()
        .expect("Failed to execute makro");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Expected success, got: {}", stdout);

    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("Failed to parse JSON output: {}\n{}", e, stdout));
    assert_eq!(json["success"], true);
    assert_eq!(json["errors"], serde_json::json!([]));
    let result = &json["result"];
    assert_eq!(result["file"], wav.to_str().unwrap());
    assert_eq!(result["input_hash"].as_str().unwrap().len(), 64);
    let export = &result["export"];
    assert_eq!(export["technical_analysis"]["metadata"]["sample_rate"], 22050);
    assert_eq!(
        export["ace_step_description"]
            .as_str()
            .unwrap()
            .lines()
            .count(),
        6
    );
}

#[test]
fn test_analyze_json_rejects_extension() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("notes.txt");
    fs::write(&path, "la la la").unwrap();

    let output = makro()
        .args(["analyze", "-i", path.to_str().unwrap(), "--json"])
        .output()
        .expect("Failed to execute makro");
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["code"], "MAKRO_002");
    assert!(json.get("result").is_none());
}

#[test]
fn test_analyze_description_only_and_output_file() {
    let tmp = tempdir().unwrap();
    let wav = tmp.path().join("tone.wav");
    let out = tmp.path().join("analysis.json");
    write_wav(&wav);

    let output = makro()
        .args([
            "analyze",
            "-i",
            wav.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--description-only",
        ])
        .output()
        .expect("Failed to execute makro");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim().lines().count(), 6);

    let export: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(export["ace_step_description"].as_str().unwrap(), stdout.trim());
}

#[test]
fn test_analyze_human_missing_file_fails() {
    let output = makro()
        .args(["analyze", "-i", "/nonexistent/track.wav"])
        .output()
        .expect("Failed to execute makro");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error"));
}

#[test]
fn test_doctor_json_reports_available() {
    let output = makro()
        .args(["doctor", "--json"])
        .output()
        .expect("Failed to execute makro");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], true);
    assert!(json["report"]["checks"].as_array().unwrap().len() >= 5);
}

#[test]
fn test_doctor_json_reports_bad_config() {
    let tmp = tempdir().unwrap();
    let config = tmp.path().join("bad.json");
    fs::write(&config, "{ not json").unwrap();

    let output = makro()
        .args(["doctor", "--json", "--config", config.to_str().unwrap()])
        .output()
        .expect("Failed to execute makro");
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["code"], "MAKRO_004");
    assert_eq!(json["errors"][0]["file"], config.to_str().unwrap());
    assert!(json.get("report").is_none());
}
