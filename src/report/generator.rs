//! Markdown and JSON report generation.
//!
//! This module renders tally reports as Markdown tables or JSON, and prints
//! the taxonomy outline used by `--check-taxonomy`.

use crate::analysis::select_row_flag;
use crate::config::ReportConfig;
use crate::models::{AggregatedRow, CaseTally, GallerySection, ReportMetadata, TallyReport};
use crate::taxonomy::Taxonomy;
use anyhow::Result;
use std::collections::HashSet;

/// Options that control Markdown rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Render rows of hidden categories.
    pub include_hidden: bool,
    /// List count keys that matched no category.
    pub show_unknown_keys: bool,
}

impl From<&ReportConfig> for RenderOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            include_hidden: config.include_hidden,
            show_unknown_keys: config.show_unknown_keys,
        }
    }
}

/// Display form of a percentage: 0 and 100 without decimals, otherwise two.
pub fn format_percentage(percentage: f64) -> String {
    if percentage == 0.0 || percentage == 100.0 {
        format!("{}", percentage as u32)
    } else {
        format!("{:.2}", percentage)
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &TallyReport, options: RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# WBC Differential Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    if let Some(ref combined) = report.combined {
        output.push_str(&generate_case_section(combined, options));
    }

    if report.cases.is_empty() {
        output.push_str("No case reports were tallied.\n\n");
    }

    for case in &report.cases {
        output.push_str(&generate_case_section(case, options));
    }

    output.push_str("---\n\n");
    output.push_str("*Report generated by WBCTally*\n");

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Taxonomy:** {} ({} nodes)\n",
        metadata.taxonomy, metadata.taxonomy_nodes
    ));
    section.push_str(&format!("- **Cases Tallied:** {}\n", metadata.cases_tallied));
    if metadata.cases_failed > 0 {
        section.push_str(&format!("- **Cases Failed:** {}\n", metadata.cases_failed));
    }
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate the table and gallery index for one case.
fn generate_case_section(case: &CaseTally, options: RenderOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Case {}\n\n", case.case_id));
    section.push_str(&format!(
        "*Source: `{}` | Classified cells: {}*\n\n",
        case.source, case.total
    ));

    let anchors: HashSet<&str> = case.gallery.iter().map(|s| s.anchor.as_str()).collect();

    section.push_str("| WBC Parameter | Count | % |\n");
    section.push_str("|:---|---:|---:|\n");
    for row in &case.rows {
        if !row.node.visible && !options.include_hidden {
            continue;
        }
        section.push_str(&generate_row(row, &anchors));
    }
    section.push('\n');

    if !case.gallery.is_empty() {
        section.push_str(&generate_gallery_index(&case.gallery));
    }

    if options.show_unknown_keys && !case.unknown_keys.is_empty() {
        let keys: Vec<String> = case.unknown_keys.iter().map(|k| format!("`{}`", k)).collect();
        section.push_str(&format!(
            "> ⚠️ Ignored unknown categories: {}\n\n",
            keys.join(", ")
        ));
    }

    section
}

/// Generate one table row.
fn generate_row(row: &AggregatedRow, anchors: &HashSet<&str>) -> String {
    let node = &row.node;

    let mut label = "&nbsp;&nbsp;&nbsp;".repeat(usize::from(node.indent_level));
    if node.indent_level >= 2 {
        label.push_str("↳ ");
    }

    let text = match select_row_flag(&node.key, node.interactive) {
        Some(anchor) if anchors.contains(anchor.as_str()) => {
            format!("[{}](#{})", node.label, anchor)
        }
        _ => node.label.clone(),
    };

    let percentage = if node.visible {
        format_percentage(row.percentage)
    } else {
        "-".to_string()
    };

    if node.emphasized {
        format!(
            "| {}**{}** | **{}** | **{}** |\n",
            label, text, row.count, percentage
        )
    } else {
        format!("| {}{} | {} | {} |\n", label, text, row.count, percentage)
    }
}

/// Generate the gallery section index with one anchor per category.
fn generate_gallery_index(gallery: &[GallerySection]) -> String {
    let mut section = String::new();

    section.push_str("### Cell Gallery\n\n");
    for entry in gallery {
        section.push_str(&format!(
            "- <a id=\"{}\"></a>**{}** ({} cells)\n",
            entry.anchor, entry.label, entry.cells
        ));
    }
    section.push('\n');

    section
}

/// Generate a JSON report.
pub fn generate_json_report(report: &TallyReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render the taxonomy as an indented outline.
pub fn generate_taxonomy_outline(taxonomy: &Taxonomy) -> String {
    let mut output = String::new();

    for (position, node) in taxonomy.nodes().iter().enumerate() {
        let mut flags = Vec::new();
        if !taxonomy.is_leaf(position) {
            flags.push("group");
        }
        if taxonomy.is_classifiable(position) {
            flags.push("classified");
        }
        if !node.visible {
            flags.push("hidden");
        }
        if position == taxonomy.grand_total_position() {
            flags.push("grand total");
        }

        output.push_str(&format!(
            "{}{} [{}]",
            "  ".repeat(usize::from(node.indent_level)),
            node.label,
            node.key
        ));
        if !flags.is_empty() {
            output.push_str(&format!(" ({})", flags.join(", ")));
        }
        output.push('\n');
    }

    output
}
