//! # doc-distill CLI (`distill`)
//!
//! The `distill` binary is the primary interface for doc-distill. It
//! provides commands for output initialization, corpus inspection, running
//! the extraction pipeline, and monitoring a run's output.
//!
//! ## Usage
//!
//! ```bash
//! distill --config ./config/distill.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `distill init` | Create the output directory tree |
//! | `distill scan` | List the discovered corpus without processing it |
//! | `distill run` | Process the corpus and write all output views |
//! | `distill stats` | Summarize what a run has produced so far |
//!
//! ## Examples
//!
//! ```bash
//! # Create output directories (idempotent)
//! distill init --config ./config/distill.toml
//!
//! # Eyeball an unfamiliar corpus, with page counts and excerpts
//! distill scan --preview
//!
//! # Smoke-test the first three documents
//! distill run --limit 3
//!
//! # Full run with machine-readable progress
//! distill run --json-progress
//! ```

mod config;
mod export;
mod extract;
mod language;
#[allow(dead_code)]
mod models;
mod pipeline;
mod progress;
mod provider;
mod scanner;
#[allow(dead_code)]
mod schema;
mod stats;
mod structuring;
mod suggest;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::RunOptions;

/// doc-distill CLI — a schema-driven extraction pipeline turning document
/// corpora into structured records and multi-view reports.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/distill.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "distill",
    about = "doc-distill — schema-driven document extraction with multi-view CSV/JSON reporting",
    version,
    long_about = "doc-distill scans a document corpus (nested taxonomy or flat directory), \
    extracts text and embedded images from each PDF, fills a field schema through a generative \
    extraction provider with per-field validation and deterministic fallbacks, derives validated \
    improvement suggestions, and consolidates the batch into synchronized CSV/JSON views."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/distill.toml`. All corpus, schema, extraction,
    /// and output settings are read from this file.
    #[arg(long, global = true, default_value = "./config/distill.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the output directory tree.
    ///
    /// Creates the images, data, suggestions, and partitioned-output
    /// directories. Idempotent — running it multiple times is safe. Fails
    /// fast if any location is unwritable, before a run spends provider
    /// calls.
    Init,

    /// List the discovered corpus without processing it.
    ///
    /// Walks the configured layout (taxonomy or flat) and prints every
    /// document with its classification path. Useful for verifying
    /// configuration before a run.
    Scan {
        /// Also open each document and print its page count and a short
        /// first-page excerpt.
        #[arg(long)]
        preview: bool,
    },

    /// Process the corpus and write all output views.
    ///
    /// Extracts text and images per document, fills the configured schema
    /// through the extraction provider, generates suggestions, and writes
    /// the CSV/JSON/partitioned/binarized views. Always emits one row per
    /// discovered document, including documents that failed parsing or
    /// extraction.
    Run {
        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Dry run — show the document count without extracting or writing.
        #[arg(long)]
        dry_run: bool,

        /// Emit progress as one JSON object per line on stderr.
        #[arg(long)]
        json_progress: bool,
    },

    /// Summarize what a run has produced so far.
    ///
    /// Reports per-document image directories, total extracted images, and
    /// the size of each data and suggestion file. Safe to run while a batch
    /// is in flight.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            export::ensure_output_dirs(&config.output)?;
            println!("output directories initialized");
        }
        Commands::Scan { preview } => {
            scanner::run_scan(&config, preview)?;
        }
        Commands::Run {
            limit,
            dry_run,
            json_progress,
        } => {
            let options = RunOptions {
                limit,
                dry_run,
                json_progress,
            };
            pipeline::run_pipeline(&config, &options).await?;
        }
        Commands::Stats => {
            stats::run_stats(&config)?;
        }
    }

    Ok(())
}
