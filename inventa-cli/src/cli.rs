//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Inventa -- software discovery over machine inventory scans.
///
/// Use `inventa <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "inventa", version, about, long_about = None)]
pub struct Cli {
    /// Path to the inventa.toml configuration file.
    #[arg(short, long, global = true, default_value = "inventa.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run discovery over every scan file and write the result files.
    Run(RunArgs),

    /// Inspect the discovery library.
    Library(LibraryArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run discovery over a scan directory.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the scan directory.
    #[arg(long)]
    pub scan_dir: Option<PathBuf>,

    /// Override the output directory (recreated on every run).
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Override the library directory.
    #[arg(long)]
    pub library_dir: Option<PathBuf>,

    /// Worker count (0 = half of available parallelism).
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Pre-load the source catalog from the previous run's aggregate files.
    #[arg(long)]
    pub seed_sources: bool,
}

// ---- library ----

/// Inspect the discovery library.
#[derive(Args, Debug)]
pub struct LibraryArgs {
    #[command(subcommand)]
    pub action: LibraryAction,
}

#[derive(Subcommand, Debug)]
pub enum LibraryAction {
    /// Load rules, exclusions and signatures and check the exclusion graph for cycles.
    Validate {
        /// Override the library directory.
        #[arg(long)]
        library_dir: Option<PathBuf>,
    },
}

// ---- config ----

/// Manage inventa configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, discovery).
        #[arg(long)]
        section: Option<String>,
    },
}
