//! Doctor command implementation
//!
//! Checks that the linked decoders and tag readers cover the configured
//! upload formats and that uploads can be staged.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use makro_core::capability::{self, CapabilityCheck, CheckKind};
use makro_core::CapabilityStatus;

use super::json_output::{error_codes, DoctorOutput, JsonError};
use super::load_config;

fn section_title(kind: CheckKind) -> &'static str {
    match kind {
        CheckKind::Codec => "Decoders:",
        CheckKind::Container => "Containers:",
        CheckKind::Staging => "Staging:",
    }
}

fn print_check(check: &CapabilityCheck) {
    if check.available {
        match &check.detail {
            Some(detail) => println!("  {} {} ({})", "ok".green(), check.name, detail.dimmed()),
            None => println!("  {} {}", "ok".green(), check.name),
        }
    } else {
        println!("  {} {}", "!!".red(), check.name);
        if let Some(detail) = &check.detail {
            println!("     {}", detail.dimmed());
        }
    }
}

/// Run the doctor command
///
/// # Returns
/// Exit code: 0 if all checks pass, 1 if any fail
pub fn run(config_path: Option<&str>, json: bool) -> Result<ExitCode> {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) if json => {
            let mut error = JsonError::new(error_codes::CONFIG, format!("{:#}", e));
            if let Some(config_path) = config_path {
                error = error.with_file(config_path);
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&DoctorOutput::failure(vec![error]))?
            );
            return Ok(ExitCode::from(1));
        }
        Err(e) => return Err(e),
    };
    let report = capability::probe(&config);

    if json {
        let output = DoctorOutput::new(report);
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(if output.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        });
    }

    println!("{}", "Music-Makro Doctor".cyan().bold());
    println!("{}", "==================".cyan());
    println!();
    println!("{}", "Versions:".bold());
    println!("  {} makro v{}", "->".green(), env!("CARGO_PKG_VERSION"));

    let mut current = None;
    for check in &report.checks {
        if current != Some(check.kind) {
            println!();
            println!("{}", section_title(check.kind).bold());
            current = Some(check.kind);
        }
        print_check(check);
    }

    println!();
    match report.status() {
        CapabilityStatus::Available => {
            println!("{} All checks passed!", "SUCCESS".green().bold());
            Ok(ExitCode::SUCCESS)
        }
        CapabilityStatus::Missing { names } => {
            println!(
                "{} Missing: {}",
                "WARNING".yellow().bold(),
                names.join(", ")
            );
            Ok(ExitCode::from(1))
        }
    }
}
