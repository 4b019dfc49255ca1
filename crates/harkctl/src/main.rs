//! Hark Control - CLI for resolving spoken commands
//!
//! Wires the pipeline together: transcript in, lexical + semantic matching,
//! arbitration, operator confirmation, audit logging, and (only after an
//! explicit yes) execution.

mod commands;
mod errors;

use clap::{Parser, Subcommand};
use hark_common::HarkConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harkctl")]
#[command(about = "Hark - spoken utterance to confirmed system command", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one utterance and, on approval, execute its command
    Resolve {
        /// Transcript text of the utterance
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the transcript from a file instead
        #[arg(long)]
        file: Option<PathBuf>,

        /// Reference to the originating audio artifact (for the audit trail)
        #[arg(long)]
        source: Option<String>,

        /// Confirm and log, but skip execution
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve a batch of transcriptions sequentially
    Batch {
        /// JSON file of {"filename", "transcription"} records
        #[arg(long)]
        file: PathBuf,

        /// Confirm and log, but skip execution
        #[arg(long)]
        dry_run: bool,
    },

    /// List audit records for accuracy review
    Audit {
        /// Show only the most recent N records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Validate the command catalogue and list its entries
    Catalogue,
}

fn main() {
    let cli = Cli::parse();
    let config = HarkConfig::load();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "harkctl starting");

    let result = match cli.command {
        Commands::Resolve {
            text,
            file,
            source,
            dry_run,
        } => commands::resolve(&config, text, file, source, dry_run),
        Commands::Batch { file, dry_run } => commands::batch(&config, &file, dry_run),
        Commands::Audit { limit } => commands::audit(&config, limit),
        Commands::Catalogue => commands::catalogue(&config),
    };

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(errors::exit_code_for(&e));
        }
    }
}
