//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.wbctally.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".wbctally.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Taxonomy source.
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,

    /// Report directory scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report rendering settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Output file path; stdout when unset.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Where the taxonomy comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    /// Custom taxonomy TOML file; the built-in WBC table when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Report directory scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum reports to tally.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum report size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    1000
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

fn default_excludes() -> Vec<String> {
    vec!["node_modules", "tmp", "thumbnails"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> u64 {
    16 * 1024 * 1024 // 16MB
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Render rows of hidden categories.
    #[serde(default)]
    pub include_hidden: bool,

    /// List count keys that matched no category.
    #[serde(default = "default_true")]
    pub show_unknown_keys: bool,

    /// Add a pooled tally across all cases.
    #[serde(default)]
    pub combined: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            show_unknown_keys: true,
            combined: false,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if args.verbose {
            self.general.verbose = true;
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(ref taxonomy) = args.taxonomy {
            self.taxonomy.path = Some(taxonomy.clone());
        }

        if let Some(max_files) = args.max_files {
            self.scanner.max_files = max_files;
        }

        // Flags only switch features on
        if args.include_hidden {
            self.report.include_hidden = true;
        }
        if args.combined {
            self.report.combined = true;
        }
    }

    /// Log level for this run. `--quiet` overrides a verbose config.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.format, OutputFormat::Markdown);
        assert!(config.general.output.is_none());
        assert!(config.taxonomy.path.is_none());
        assert_eq!(config.scanner.max_files, 1000);
        assert_eq!(config.scanner.extensions, vec!["json"]);
        assert!(config.report.show_unknown_keys);
        assert!(!config.report.include_hidden);
        assert!(!config.general.verbose);
    }

    #[test]
    fn test_verbose_from_file_sets_log_level() {
        let config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);
        assert_eq!(Config::default().log_level(false), tracing::Level::INFO);
    }

    #[test]
    fn test_merge_verbose_flag() {
        use clap::Parser;

        let args = crate::cli::Args::parse_from(["wbctally", "--dir", ".", "--verbose"]);
        let mut config = Config::default();
        config.merge_with_args(&args);
        assert!(config.general.verbose);
        assert_eq!(config.log_level(args.quiet), tracing::Level::DEBUG);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "differential.md"
format = "json"

[taxonomy]
path = "config/wbc_taxonomy.toml"

[scanner]
max_files = 50
excludes = ["archive"]

[report]
include_hidden = true
show_unknown_keys = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, Some(PathBuf::from("differential.md")));
        assert_eq!(config.general.format, OutputFormat::Json);
        assert_eq!(
            config.taxonomy.path,
            Some(PathBuf::from("config/wbc_taxonomy.toml"))
        );
        assert_eq!(config.scanner.max_files, 50);
        assert_eq!(config.scanner.excludes, vec!["archive"]);
        assert_eq!(config.scanner.extensions, vec!["json"]);
        assert!(config.report.include_hidden);
        assert!(!config.report.show_unknown_keys);
        assert!(!config.report.combined);
    }

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[report]\ncombined = true\n").unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert!(config.report.combined);
        assert_eq!(config.scanner.max_files, 1000);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[scanner]\nmax_files = \"many\"\n").unwrap();
        assert!(Config::load(temp.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[scanner]"));
        assert!(toml_str.contains("[report]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.scanner.max_files, 1000);
    }
}
