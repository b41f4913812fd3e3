//! Analyze command implementation
//!
//! Runs the full pipeline on one audio file and prints the descriptors and
//! production brief, either colored for humans or as a JSON envelope.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use makro_core::upload;
use makro_core::{
    AnalysisError, DescriptorGroup, FeatureAggregator, PipelineConfig, PipelineError, TechnicalDescriptorSet,
    ValidationError,
};

use super::json_output::{error_codes, AnalyzeOutput, AnalyzeResult, JsonError};
use super::load_config;

/// Options of one `analyze` invocation.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions<'a> {
    /// Path to the audio file
    pub input: &'a str,
    /// Optional export file path
    pub output: Option<&'a str>,
    /// Whether to output machine-readable JSON
    pub json: bool,
    /// Optional pipeline config file
    pub config: Option<&'a str>,
    /// Copy the input into the staging directory before analysis
    pub stage: bool,
    /// Print only the production brief
    pub description_only: bool,
}

/// Run the analyze command
///
/// # Returns
/// Exit code: 0 on success, 1 on error
pub fn run(options: &AnalyzeOptions<'_>) -> Result<ExitCode> {
    if options.json {
        run_json(options)
    } else {
        run_human(options)
    }
}

fn validation_error_to_json(error: &ValidationError, input: &str) -> JsonError {
    let code = match error {
        ValidationError::ExtensionNotAllowed { .. } => error_codes::UNSUPPORTED_FORMAT,
        ValidationError::TooLarge { .. } => error_codes::FILE_TOO_LARGE,
        ValidationError::Io { .. } => error_codes::FILE_READ,
    };
    let json = JsonError::new(code, error.to_string()).with_file(input);
    match error {
        ValidationError::TooLarge { .. } => {
            json.with_suggestion("Raise upload.max_upload_bytes in the config file")
        }
        _ => json,
    }
}

fn pipeline_error_to_json(error: &PipelineError, input: &str) -> JsonError {
    let code = match error {
        PipelineError::Decode(_) => error_codes::DECODE,
        PipelineError::Analysis(_) => error_codes::ANALYSIS,
    };
    let json = JsonError::new(code, error.to_string()).with_file(input);
    match error {
        PipelineError::Analysis(AnalysisError::TooLong { .. }) => {
            json.with_suggestion("Raise analysis.max_duration_seconds in the config file")
        }
        _ => json,
    }
}

/// Validate, optionally stage, hash and analyze the input.
fn execute(input: &str, config: &PipelineConfig, stage: bool) -> Result<AnalyzeResult, JsonError> {
    let path = Path::new(input);
    upload::validate(path, &config.upload).map_err(|e| validation_error_to_json(&e, input))?;

    let data = fs::read(path).map_err(|e| {
        JsonError::new(error_codes::FILE_READ, format!("Failed to read file: {}", e))
            .with_file(input)
    })?;
    let input_hash = blake3::hash(&data).to_hex().to_string();

    let aggregator = FeatureAggregator::new(config.clone());
    let start = Instant::now();
    let mut export = if stage {
        let staged =
            upload::stage(path, &config.upload).map_err(|e| validation_error_to_json(&e, input))?;
        aggregator.run(staged.path())
    } else {
        aggregator.run(path)
    }
    .map_err(|e| pipeline_error_to_json(&e, input))?;
    let processing_time_seconds = start.elapsed().as_secs_f64();

    export.file = input.to_string();
    Ok(AnalyzeResult {
        file: input.to_string(),
        input_hash,
        processing_time_seconds,
        export,
    })
}

fn write_export(result: &AnalyzeResult, output_path: &str) -> Result<(), JsonError> {
    result
        .export
        .write_to(Path::new(output_path))
        .map_err(|e| JsonError::new(error_codes::EXPORT_WRITE, e.to_string()).with_file(output_path))
}

/// Run analyze with human-readable (colored) output
fn run_human(options: &AnalyzeOptions<'_>) -> Result<ExitCode> {
    let config = load_config(options.config)?;

    if !options.description_only {
        println!("{} {}", "Analyzing:".cyan().bold(), options.input);
    }

    let result = execute(options.input, &config, options.stage)
        .map_err(|e| anyhow::anyhow!("{}", e.message))
        .with_context(|| format!("Analysis of {} failed", options.input))?;

    if options.description_only {
        println!("{}", result.export.ace_step_description);
    } else {
        println!("{} {}", "Hash:".dimmed(), &result.input_hash[..16]);
        print_descriptors(&result.export.technical_analysis);
        println!();
        println!("{}", "Production brief:".bold());
        for line in result.export.ace_step_description.lines() {
            println!("  {}", line);
        }
        println!();
        println!(
            "{} {:.2}s",
            "Processing time:".dimmed(),
            result.processing_time_seconds
        );
    }

    if let Some(out_path) = options.output {
        write_export(&result, out_path).map_err(|e| anyhow::anyhow!("{}", e.message))?;
        if !options.description_only {
            println!("\n{} {}", "Output written to:".green().bold(), out_path);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_group<G: DescriptorGroup>(group: &G) {
    println!();
    println!("{}", format!("{}:", G::NAME).bold());
    for (name, value) in group.fields() {
        println!("  {:<22} {:>14.4}", name, value);
    }
}

fn print_descriptors(set: &TechnicalDescriptorSet) {
    println!();
    println!("{}", "metadata:".bold());
    match set.metadata.record() {
        Some(record) => {
            println!("  {:<22} {:>14.2}", "duration", record.duration);
            println!("  {:<22} {:>14}", "bitrate", record.bitrate);
            println!("  {:<22} {:>14}", "sample_rate", record.sample_rate);
            println!("  {:<22} {}", "title", record.title);
            println!("  {:<22} {}", "artist", record.artist);
            println!("  {:<22} {}", "genre", record.genre);
        }
        None => println!("  {}", "unreadable (tag fields treated as Unknown)".yellow()),
    }
    print_group(&set.temporal);
    print_group(&set.spectral);
    print_group(&set.rhythmic);
    print_group(&set.harmonic);
    print_group(&set.energy);
}

/// Run analyze with machine-readable JSON output
fn run_json(options: &AnalyzeOptions<'_>) -> Result<ExitCode> {
    let config = match load_config(options.config) {
        Ok(config) => config,
        Err(e) => {
            let mut error = JsonError::new(error_codes::CONFIG, format!("{:#}", e));
            if let Some(config_path) = options.config {
                error = error.with_file(config_path);
            }
            return emit_failure(error);
        }
    };

    let result = match execute(options.input, &config, options.stage) {
        Ok(result) => result,
        Err(error) => return emit_failure(error),
    };

    if let Some(out_path) = options.output {
        if let Err(error) = write_export(&result, out_path) {
            return emit_failure(error);
        }
    }

    let output = AnalyzeOutput::success(result);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

fn emit_failure(error: JsonError) -> Result<ExitCode> {
    let output = AnalyzeOutput::failure(vec![error]);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::from(1))
}
