//! Case report discovery.
//!
//! This module walks a directory of case report documents and returns the
//! files that match the configured extensions, excludes and size limit.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Configuration for report scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["json"])
    pub extensions: Vec<String>,
    /// Directory or file names to skip
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of reports to return
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            excludes: vec!["node_modules".to_string(), "tmp".to_string()],
            max_file_size: 16 * 1024 * 1024,
            max_files: None,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// A discovered report file.
#[derive(Debug, Clone)]
pub struct ScannedReport {
    /// Full path to the file
    pub path: PathBuf,
    /// Path relative to the scan root
    pub relative: String,
    /// File size in bytes
    pub size: u64,
}

/// Scanner for case report documents.
pub struct ReportScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl ReportScanner {
    /// Create a new report scanner.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching reports, sorted by relative path.
    pub fn scan(&self) -> Result<Vec<ScannedReport>> {
        if !self.root.is_dir() {
            return Err(anyhow::anyhow!(
                "Not a directory: {}",
                self.root.display()
            ));
        }

        let mut reports = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(entry));

        for entry in walker {
            if let Some(max) = self.config.max_files {
                if reports.len() >= max {
                    debug!("Reached report limit of {}", max);
                    break;
                }
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches_extension(entry.path()) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    debug!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if size > self.config.max_file_size {
                debug!(
                    "Skipping {} ({} bytes exceeds limit)",
                    entry.path().display(),
                    size
                );
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            reports.push(ScannedReport {
                path: entry.path().to_path_buf(),
                relative,
                size,
            });
        }

        reports.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(reports)
    }

    /// Check if a path has one of the configured extensions.
    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.config
                    .extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }

    /// Hidden entries and explicit excludes are skipped.
    fn is_excluded(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        name.starts_with('.') || self.config.excludes.iter().any(|pattern| name == pattern.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b_case.json", "{}");
        write(temp.path(), "a_case.JSON", "{}");
        write(temp.path(), "notes.txt", "ignore me");
        write(temp.path(), "2024/c_case.json", "{}");
        write(temp.path(), ".cache/d_case.json", "{}");
        write(temp.path(), "tmp/e_case.json", "{}");

        let scanner = ReportScanner::new(temp.path().to_path_buf(), ScanConfig::default());
        let reports = scanner.scan().unwrap();
        let names: Vec<&str> = reports.iter().map(|r| r.relative.as_str()).collect();

        let nested = Path::new("2024").join("c_case.json");
        assert_eq!(
            names,
            vec![nested.to_str().unwrap(), "a_case.JSON", "b_case.json"]
        );
        assert_eq!(reports[2].size, 2);
    }

    #[test]
    fn test_scan_respects_limits() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.json", "{}");
        write(temp.path(), "b.json", "{}");
        write(temp.path(), "big.json", &"x".repeat(64));

        let config = ScanConfig {
            max_file_size: 32,
            max_files: Some(1),
            ..ScanConfig::default()
        };
        let reports = ReportScanner::new(temp.path().to_path_buf(), config)
            .scan()
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].relative, "a.json");
    }

    #[test]
    fn test_scan_rejects_file_root() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.json", "{}");
        let scanner =
            ReportScanner::new(temp.path().join("a.json"), ScanConfig::default());
        assert!(scanner.scan().is_err());
    }
}
