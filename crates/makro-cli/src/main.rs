//! Music-Makro CLI - audio descriptors and production briefs
//!
//! This binary analyzes audio files and checks the local decoding setup.

use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

use makro_cli::commands;
use makro_cli::commands::analyze::AnalyzeOptions;
use makro_cli::logging;

mod cli_args;

use cli_args::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            input,
            output,
            json,
            config,
            stage,
            description_only,
        } => commands::analyze::run(&AnalyzeOptions {
            input: &input,
            output: output.as_deref(),
            json,
            config: config.as_deref(),
            stage,
            description_only,
        }),
        Commands::Doctor { config, json } => commands::doctor::run(config.as_deref(), json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
