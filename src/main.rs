//! WBCTally - WBC differential tallies for blood-morphology case reviews
//!
//! A CLI tool that reads case report documents, counts classified white
//! blood cells per category and aggregates them over the WBC parameter
//! taxonomy into a differential table.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid taxonomy, unreadable report, bad config, etc.)
//!   2 - --strict set and at least one count key matched no category

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;
mod taxonomy;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::{CaseReport, CaseTally, CountMap, ReportMetadata, TallyReport};
use std::path::{Path, PathBuf};
use std::time::Instant;
use taxonomy::Taxonomy;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first: it can switch on verbose logging
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("WBCTally v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run_tally(&args, &config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Tally failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .wbctally.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    println!("   Edit it to set a custom taxonomy, scanner limits and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the tally workflow. Returns exit code (0 or 2).
fn run_tally(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();

    // Step 1: Load and validate the taxonomy; any structural fault is fatal
    let (taxonomy, taxonomy_source) = load_taxonomy(config)?;
    info!(
        "Taxonomy '{}' loaded with {} nodes",
        taxonomy_source,
        taxonomy.len()
    );

    if args.check_taxonomy {
        print!("{}", report::generate_taxonomy_outline(&taxonomy));
        println!("\n✅ Taxonomy is valid ({} nodes).", taxonomy.len());
        return Ok(0);
    }

    // Step 2: Collect report documents
    let sources = collect_sources(args, config)?;
    info!("Tallying {} case report(s)", sources.len());

    let progress = if args.dir.is_some() && !args.quiet && sources.len() > 1 {
        let pb = ProgressBar::new(sources.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    // Step 3: Parse and aggregate each case
    let mut cases = Vec::with_capacity(sources.len());
    let mut pooled: Vec<CountMap> = Vec::new();
    let mut failed = 0usize;

    for source in &sources {
        if let Some(ref pb) = progress {
            pb.set_message(source.display().to_string());
        }

        match CaseReport::load(source) {
            Ok(case_report) => {
                let case_id = case_report
                    .case_id
                    .clone()
                    .unwrap_or_else(|| case_id_from_path(source));
                let tally = tally_case(&taxonomy, case_id, source, &case_report.counts);
                debug!(
                    "Case {}: {} classified cells, {} unknown keys",
                    tally.case_id,
                    tally.total,
                    tally.unknown_keys.len()
                );
                if config.report.combined {
                    pooled.push(case_report.counts);
                }
                cases.push(tally);
            }
            Err(e) if args.dir.is_some() => {
                warn!("Skipping {}: {}", source.display(), e);
                failed += 1;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to tally {}", source.display()));
            }
        }

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let combined = if config.report.combined && !cases.is_empty() {
        let merged = analysis::merge_counts(&pooled);
        let label = format!("Combined ({} cases)", cases.len());
        Some(tally_case(&taxonomy, label, Path::new("*"), &merged))
    } else {
        None
    };

    // Step 4: Build and render the report
    let metadata = ReportMetadata {
        generated_at: Utc::now(),
        taxonomy: taxonomy_source,
        taxonomy_nodes: taxonomy.len(),
        cases_tallied: cases.len(),
        cases_failed: failed,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let tally_report = TallyReport {
        metadata,
        cases,
        combined,
    };

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&tally_report)?,
        OutputFormat::Markdown => report::generate_markdown_report(
            &tally_report,
            report::RenderOptions::from(&config.report),
        ),
    };

    let with_unknown = tally_report.cases_with_unknown_keys();

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;

            if !args.quiet {
                println!("\n📊 Tally Summary:");
                println!("   Cases tallied: {}", tally_report.metadata.cases_tallied);
                if failed > 0 {
                    println!("   Cases skipped: {}", failed);
                }
                if with_unknown > 0 {
                    println!("   Cases with unknown categories: {}", with_unknown);
                }
                println!("\n✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    // Check --strict
    if args.strict && with_unknown > 0 {
        eprintln!(
            "\n⛔ {} case(s) carried unknown WBC categories. Failing (exit code 2).",
            with_unknown
        );
        return Ok(2);
    }

    Ok(0)
}

/// Aggregate one count map into a case tally.
fn tally_case(taxonomy: &Taxonomy, case_id: String, source: &Path, counts: &CountMap) -> CaseTally {
    let aggregation = analysis::aggregate(taxonomy, counts);

    CaseTally {
        case_id,
        source: source.display().to_string(),
        total: aggregation.total,
        rows: aggregation.rows,
        gallery: analysis::gallery_sections(taxonomy, counts),
        unknown_keys: aggregation.unknown_keys,
    }
}

/// Case id for reports that carry none: the parent directory for the
/// usual `<case>/report_details.json` layout, otherwise the file stem.
fn case_id_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    if stem == "report_details" {
        if let Some(dir) = path.parent().and_then(|p| p.file_name()) {
            return dir.to_string_lossy().to_string();
        }
    }

    stem
}

/// Load the configured taxonomy, or the built-in table.
fn load_taxonomy(config: &Config) -> Result<(Taxonomy, String)> {
    match config.taxonomy.path {
        Some(ref path) => {
            let taxonomy = Taxonomy::load(path)
                .with_context(|| format!("Invalid taxonomy {}", path.display()))?;
            Ok((taxonomy, path.display().to_string()))
        }
        None => {
            let taxonomy = Taxonomy::builtin().context("Built-in taxonomy is invalid")?;
            Ok((taxonomy, "builtin".to_string()))
        }
    }
}

/// Resolve the report documents to tally.
fn collect_sources(args: &Args, config: &Config) -> Result<Vec<PathBuf>> {
    if let Some(ref report) = args.report {
        return Ok(vec![report.clone()]);
    }

    let Some(ref dir) = args.dir else {
        return Ok(Vec::new());
    };

    let scan_config = scanner::ScanConfig::from(&config.scanner);
    let reports = scanner::ReportScanner::new(dir.clone(), scan_config).scan()?;

    if reports.is_empty() {
        warn!("No case reports found under {}", dir.display());
    }
    for found in &reports {
        debug!("Found report {} ({} bytes)", found.relative, found.size);
    }

    Ok(reports.into_iter().map(|r| r.path).collect())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!(
                "⚠️  Ignoring {}: {:#}",
                config::DEFAULT_CONFIG_FILE,
                e
            );
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_id_from_path() {
        assert_eq!(
            case_id_from_path(Path::new("cases/C-1042/report_details.json")),
            "C-1042"
        );
        assert_eq!(case_id_from_path(Path::new("cases/c7.json")), "c7");
    }

    #[test]
    fn test_tally_case_uses_builtin_taxonomy() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let report = CaseReport::from_json(
            r#"{"report": {"cells": {"wbc": {
                "segmented_neutrophils": [1, 2, 3, 4],
                "band_forms": [5],
                "monocytes": [6, 7, 8, 9, 10],
                "foo": [11]
            }}}}"#,
        )
        .unwrap();

        let tally = tally_case(&taxonomy, "C-1".to_string(), Path::new("c1.json"), &report.counts);
        assert_eq!(tally.total, 10);
        assert_eq!(tally.unknown_keys, vec!["foo"]);
        assert_eq!(tally.gallery.len(), 3);
        let neutrophils = tally.rows.iter().find(|r| r.node.key == "neutrophils").unwrap();
        assert_eq!(neutrophils.count, 5);
        assert_eq!(neutrophils.percentage, 50.0);
    }

    #[test]
    fn test_load_taxonomy_from_config() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            temp.path(),
            "[[node]]\nid = 0\nlabel = \"A\"\nkey = \"a\"\nparent = 5\n\n[[node]]\nid = 1\nlabel = \"Total\"\nkey = \"total_classified_cells\"\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.taxonomy.path = Some(temp.path().to_path_buf());
        assert!(load_taxonomy(&config).is_err());

        config.taxonomy.path = None;
        let (taxonomy, source) = load_taxonomy(&config).unwrap();
        assert_eq!(source, "builtin");
        assert_eq!(taxonomy.len(), 41);
    }

    fn write_case_dir() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("c1.json"),
            r#"{"case_id": "C-1", "report": {"cells": {"wbc": {
                "monocytes": ["a.png", "b.png"],
                "foo": ["c.png"]
            }}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("c2.json"), "{not json").unwrap();
        dir
    }

    fn tally_args(extra: &[&str]) -> (Args, Config) {
        use clap::Parser;

        let mut argv = vec!["wbctally", "--quiet"];
        argv.extend_from_slice(extra);
        let args = Args::parse_from(argv);
        let mut config = Config::default();
        config.merge_with_args(&args);
        (args, config)
    }

    #[test]
    fn test_dir_mode_skips_bad_reports_and_strict_exits_two() {
        let cases = write_case_dir();
        let out = tempfile::TempDir::new().unwrap();
        let output = out.path().join("tally.json");
        let dir = cases.path().to_str().unwrap();
        let output_arg = output.to_str().unwrap();

        let (args, config) = tally_args(&[
            "--dir", dir, "--strict", "--combined", "--format", "json", "--output", output_arg,
        ]);
        assert_eq!(run_tally(&args, &config).unwrap(), 2);

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["metadata"]["cases_tallied"], 1);
        assert_eq!(written["metadata"]["cases_failed"], 1);
        assert_eq!(written["cases"][0]["case_id"], "C-1");
        assert_eq!(written["cases"][0]["unknown_keys"][0], "foo");
        assert_eq!(written["combined"]["total"], 2);

        // Without --strict the same run succeeds.
        let (args, config) =
            tally_args(&["--dir", dir, "--format", "json", "--output", output_arg]);
        assert_eq!(run_tally(&args, &config).unwrap(), 0);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert!(written.get("combined").is_none());
    }

    #[test]
    fn test_single_report_failure_aborts() {
        let cases = write_case_dir();
        let bad = cases.path().join("c2.json");
        let (args, config) = tally_args(&["--report", bad.to_str().unwrap()]);
        assert!(run_tally(&args, &config).is_err());
    }
}
