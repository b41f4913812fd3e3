//! CLI argument definitions for the makro command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{ArgAction, Parser, Subcommand};

/// Music-Makro - audio descriptors and production briefs
#[derive(Parser)]
#[command(name = "makro")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Increase log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Analyze an audio file and print its descriptors and production brief
    Analyze {
        /// Path to the audio file (mp3, wav, flac, ogg, m4a)
        #[arg(short, long)]
        input: String,

        /// Write the export JSON to this file
        #[arg(short, long)]
        output: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,

        /// Path to a pipeline config file (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Validate and copy the input into the staging directory first
        #[arg(long)]
        stage: bool,

        /// Print only the production brief
        #[arg(long, conflicts_with = "json")]
        description_only: bool,
    },

    /// Check that decoders, tag readers and the staging directory are usable
    Doctor {
        /// Path to a pipeline config file (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },
}
