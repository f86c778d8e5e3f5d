//! Data models for WBC tallies.
//!
//! This module contains the taxonomy node record, the aggregated row type,
//! the case report intake and the report structures rendered by the CLI.

use crate::error::ReportError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Key of the synthetic grand-total row.
pub const GRAND_TOTAL_KEY: &str = "total_classified_cells";

/// Observed cell count per taxonomy key.
pub type CountMap = BTreeMap<String, u64>;

/// One entry of the WBC parameter taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyNode {
    /// Stable identity; also encodes declaration order.
    pub id: u32,
    /// Display label.
    pub label: String,
    /// Lookup key for runtime counts.
    pub key: String,
    /// Parent node id, `None` for roots. Serialized as `-1` for roots.
    #[serde(serialize_with = "parent_id::serialize")]
    pub parent: Option<u32>,
    /// Rendered as a total row for its subtree.
    pub emphasized: bool,
    /// Rendering indent, 0 to 3.
    pub indent_level: u8,
    /// Shown, and eligible for the grand total.
    pub visible: bool,
    /// Row selection maps to a cell class in the image grid.
    pub interactive: bool,
}

impl TaxonomyNode {
    /// Returns true if this node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Parent ids use `-1` (or any negative value) for roots in data files.
pub(crate) mod parent_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(parent: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
        match parent {
            Some(id) => serializer.serialize_i64(i64::from(*id)),
            None => serializer.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
        match Option::<i64>::deserialize(deserializer)? {
            Some(raw) if raw >= 0 => u32::try_from(raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// A taxonomy node annotated with its computed count and share.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    #[serde(flatten)]
    pub node: TaxonomyNode,
    pub count: u64,
    /// Share of the grand total, in percent.
    pub percentage: f64,
}

/// A case report document reduced to what the tally needs.
#[derive(Debug, Clone, Default)]
pub struct CaseReport {
    /// Case identifier, if the document carries one.
    pub case_id: Option<String>,
    /// WBC category counts, one entry per category present in the document.
    pub counts: CountMap,
}

impl CaseReport {
    /// Read and parse a case report from disk.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse a case report document.
    ///
    /// Cells are read from `report.cells.wbc`, or `cells.wbc` when the
    /// document is not wrapped. Each category maps to an array of cell
    /// items and its count is the array length.
    pub fn from_json(content: &str) -> Result<Self, ReportError> {
        let doc: Value = serde_json::from_str(content)?;

        let case_id = ["/case_id", "/id", "/report/case_id"]
            .iter()
            .find_map(|pointer| doc.pointer(pointer))
            .and_then(|value| match value {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        let wbc = doc
            .pointer("/report/cells/wbc")
            .or_else(|| doc.pointer("/cells/wbc"))
            .and_then(Value::as_object);

        let mut counts = CountMap::new();
        match wbc {
            Some(categories) => {
                for (key, cells) in categories {
                    let count = match cells.as_array() {
                        Some(items) => items.len() as u64,
                        None => {
                            debug!("WBC category '{}' is not a cell list, counting 0", key);
                            0
                        }
                    };
                    counts.insert(key.clone(), count);
                }
            }
            None => debug!("Case report has no WBC cell section"),
        }

        Ok(Self { case_id, counts })
    }
}

/// One image-grid section: a visible WBC category present in a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GallerySection {
    pub key: String,
    pub label: String,
    /// Section anchor, `wbc-<key>`.
    pub anchor: String,
    pub cells: u64,
}

/// Tally result for a single case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseTally {
    pub case_id: String,
    /// Path of the report document the tally came from.
    pub source: String,
    /// Sum of classifiable leaf counts.
    pub total: u64,
    pub rows: Vec<AggregatedRow>,
    /// Image-grid sections in taxonomy order.
    pub gallery: Vec<GallerySection>,
    /// Count keys that matched no countable category.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_keys: Vec<String>,
}

/// Metadata about the tally run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    /// "builtin" or the taxonomy file path.
    pub taxonomy: String,
    pub taxonomy_nodes: usize,
    pub cases_tallied: usize,
    pub cases_failed: usize,
    pub duration_seconds: f64,
}

/// The complete tally report.
#[derive(Debug, Clone, Serialize)]
pub struct TallyReport {
    pub metadata: ReportMetadata,
    pub cases: Vec<CaseTally>,
    /// Pooled tally across all cases, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combined: Option<CaseTally>,
}

impl TallyReport {
    /// Number of cases that carried at least one unknown count key.
    pub fn cases_with_unknown_keys(&self) -> usize {
        self.cases
            .iter()
            .filter(|case| !case.unknown_keys.is_empty())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_array_lengths() {
        let json = r#"{
            "case_id": "C-1042",
            "report": {
                "cells": {
                    "reference_url": "https://slides.example/c1042/",
                    "wbc": {
                        "segmented_neutrophils": ["a.png", "b.png", "c.png"],
                        "band_forms": [{"name": "d.png"}],
                        "monocytes": []
                    }
                }
            }
        }"#;

        let report = CaseReport::from_json(json).unwrap();
        assert_eq!(report.case_id.as_deref(), Some("C-1042"));
        assert_eq!(report.counts.get("segmented_neutrophils"), Some(&3));
        assert_eq!(report.counts.get("band_forms"), Some(&1));
        assert_eq!(report.counts.get("monocytes"), Some(&0));
        assert_eq!(report.counts.len(), 3);
    }

    #[test]
    fn test_report_unwrapped_cells_and_numeric_id() {
        let json = r#"{"id": 77, "cells": {"wbc": {"basophils": ["x"]}}}"#;
        let report = CaseReport::from_json(json).unwrap();
        assert_eq!(report.case_id.as_deref(), Some("77"));
        assert_eq!(report.counts.get("basophils"), Some(&1));
    }

    #[test]
    fn test_report_non_array_category_counts_zero() {
        let json = r#"{"report": {"cells": {"wbc": {"eosinophils": "oops"}}}}"#;
        let report = CaseReport::from_json(json).unwrap();
        assert_eq!(report.counts.get("eosinophils"), Some(&0));
    }

    #[test]
    fn test_report_without_wbc_section() {
        let report = CaseReport::from_json(r#"{"report": {}}"#).unwrap();
        assert!(report.counts.is_empty());
        assert!(report.case_id.is_none());
    }

    #[test]
    fn test_report_invalid_json() {
        assert!(matches!(
            CaseReport::from_json("{not json"),
            Err(ReportError::Json(_))
        ));
    }

    #[test]
    fn test_root_parent_serializes_as_minus_one() {
        let node = TaxonomyNode {
            id: 0,
            label: "Neutrophils".to_string(),
            key: "neutrophils".to_string(),
            parent: None,
            emphasized: true,
            indent_level: 0,
            visible: true,
            interactive: false,
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["parent"], -1);
        assert!(node.is_root());
    }
}
