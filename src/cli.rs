//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// WBCTally - WBC differential tallies from case reports
///
/// Reads blood-morphology case report documents, counts the classified
/// white blood cells per category and aggregates them over the WBC
/// parameter taxonomy.
///
/// Examples:
///   wbctally --report cases/C-1042/report_details.json
///   wbctally --dir cases/ --format json --output differential.json
///   wbctally --dir cases/ --combined --strict
///   wbctally --taxonomy wbc_taxonomy.toml --check-taxonomy
///   wbctally --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Case report JSON document to tally
    #[arg(
        short,
        long,
        value_name = "FILE",
        conflicts_with = "dir",
        required_unless_present_any = ["dir", "init_config", "check_taxonomy"]
    )]
    pub report: Option<PathBuf>,

    /// Directory of case report documents to tally
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Taxonomy TOML file to use instead of the built-in WBC table
    #[arg(short, long, value_name = "FILE", env = "WBCTALLY_TAXONOMY")]
    pub taxonomy: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .wbctally.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output file path for the report (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Render rows of hidden categories
    #[arg(long)]
    pub include_hidden: bool,

    /// Add a pooled tally across all cases
    #[arg(long)]
    pub combined: bool,

    /// Exit with code 2 if any count key matched no category
    #[arg(long)]
    pub strict: bool,

    /// Maximum number of reports to tally in directory mode
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Validate the taxonomy, print its outline and exit
    #[arg(long)]
    pub check_taxonomy: bool,

    /// Generate a default .wbctally.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if let Some(ref report) = self.report {
            if !report.is_file() {
                return Err(format!("Report file does not exist: {}", report.display()));
            }
        }

        if let Some(ref dir) = self.dir {
            if !dir.exists() {
                return Err(format!("Report directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Report path is not a directory: {}", dir.display()));
            }
        }

        if !self.check_taxonomy && self.report.is_none() && self.dir.is_none() {
            return Err("One of --report or --dir is required".to_string());
        }

        Ok(())
    }
}
