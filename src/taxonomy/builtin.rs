//! The WBC taxonomy shipped with the application.
//!
//! Rows are listed in display order. Indent levels are derived from the
//! nesting depth when the taxonomy is built.

use super::NodeRecord;

const BOLD: bool = true;
const PLAIN: bool = false;

const SHOWN: bool = true;
const HIDDEN: bool = false;

const CLICK: bool = true;
const FIXED: bool = false;

struct Row {
    id: u32,
    label: &'static str,
    key: &'static str,
    parent: Option<u32>,
    emphasized: bool,
    visible: bool,
    interactive: bool,
}

const fn row(
    id: u32,
    label: &'static str,
    key: &'static str,
    parent: Option<u32>,
    emphasized: bool,
    visible: bool,
    interactive: bool,
) -> Row {
    Row {
        id,
        label,
        key,
        parent,
        emphasized,
        visible,
        interactive,
    }
}

#[rustfmt::skip]
const WBC_TABLE: &[Row] = &[
    row(0, "Neutrophils", "neutrophils", None, BOLD, SHOWN, FIXED),
    row(1, "Segmented neutrophils", "segmented_neutrophils", Some(0), PLAIN, SHOWN, CLICK),
    row(2, "Band forms", "band_forms", Some(0), PLAIN, SHOWN, CLICK),

    row(3, "Lymphocytes", "lymphocytes", None, BOLD, SHOWN, FIXED),
    row(4, "Small lymphocytes", "small_lymphocytes", Some(3), PLAIN, SHOWN, CLICK),
    row(5, "Large lymphocytes", "large_lymphocytes", Some(3), PLAIN, SHOWN, CLICK),
    row(6, "Large granular lymphocytes", "large_granular_lymphocytes", Some(3), PLAIN, SHOWN, CLICK),

    row(7, "Reactive lymphocytes", "reactive_lymphocytes", None, BOLD, SHOWN, CLICK),

    row(8, "Abnormal lymphocytes", "abnormal_lymphocytes", None, BOLD, SHOWN, FIXED),
    row(9, "Hairy cells", "hairy_cells", Some(8), PLAIN, SHOWN, CLICK),
    row(10, "Sezary cells", "sezary_cells", Some(8), PLAIN, SHOWN, CLICK),
    row(11, "Lymphocyte variants", "other_variants", Some(8), PLAIN, SHOWN, CLICK),

    row(12, "Monocytes", "monocytes", None, BOLD, SHOWN, CLICK),
    row(13, "Eosinophils", "eosinophils", None, BOLD, SHOWN, CLICK),
    row(14, "Basophils", "basophils", None, BOLD, SHOWN, CLICK),

    row(15, "Immature granulocytes", "immature_granulocytes", None, BOLD, SHOWN, FIXED),
    row(16, "Promyelocytes", "promyelocytes", Some(15), PLAIN, SHOWN, CLICK),
    row(17, "Myelocytes", "myelocytes", Some(15), PLAIN, SHOWN, FIXED),
    row(18, "Neutrophilic myelocytes", "neutrophilic_myelocytes", Some(17), PLAIN, SHOWN, CLICK),
    row(19, "Eosinophilic myelocytes", "eosinophilic_myelocytes", Some(17), PLAIN, SHOWN, CLICK),
    row(20, "Basophilic myelocytes", "basophilic_myelocytes", Some(17), PLAIN, SHOWN, CLICK),
    row(21, "Metamyelocytes", "metamyelocytes", Some(15), PLAIN, SHOWN, FIXED),
    row(22, "Neutrophilic metamyelocytes", "neutrophilic_metamyelocytes", Some(21), PLAIN, SHOWN, CLICK),
    row(23, "Eosinophilic metamyelocytes", "eosinophilic_metamyelocytes", Some(21), PLAIN, SHOWN, CLICK),
    row(24, "Basophilic metamyelocytes", "basophilic_metamyelocytes", Some(21), PLAIN, SHOWN, CLICK),

    row(25, "Blasts", "blasts", None, BOLD, SHOWN, FIXED),
    row(26, "Non-specific", "blasts_non_specific", Some(25), PLAIN, SHOWN, CLICK),
    row(27, "Monoblasts", "monoblasts", Some(25), PLAIN, SHOWN, CLICK),

    row(28, "Plasma cells", "plasma_cells", None, BOLD, SHOWN, CLICK),
    row(29, "Promonocytes", "promonocytes", None, BOLD, SHOWN, CLICK),
    row(30, "Prolymphocytes", "prolymphocytes", None, BOLD, SHOWN, CLICK),

    row(31, "Smudge/Smear cells", "smudge", None, BOLD, HIDDEN, CLICK),

    row(32, "Others", "others", None, BOLD, HIDDEN, FIXED),
    row(33, "Unclassified", "unclassified", Some(32), PLAIN, HIDDEN, CLICK),
    row(34, "Stain or Stain precipitate", "stain", Some(32), PLAIN, HIDDEN, CLICK),
    row(35, "Artifact", "artifact", Some(32), PLAIN, HIDDEN, CLICK),
    row(36, "NRBC", "nucleated_rbc", Some(32), PLAIN, HIDDEN, CLICK),
    row(37, "Giant platelets", "giant_platelet", Some(32), PLAIN, HIDDEN, CLICK),
    row(38, "Platelet clumps", "platelet_clump", Some(32), PLAIN, HIDDEN, CLICK),
    row(39, "Duplicates", "duplicates", Some(32), PLAIN, HIDDEN, CLICK),

    row(40, "Total", "total_classified_cells", None, BOLD, SHOWN, FIXED),
];

/// Records for the built-in WBC taxonomy.
pub(super) fn wbc_records() -> Vec<NodeRecord> {
    WBC_TABLE
        .iter()
        .map(|row| NodeRecord {
            id: row.id,
            label: row.label.to_string(),
            key: row.key.to_string(),
            parent: row.parent,
            emphasized: row.emphasized,
            indent_level: None,
            visible: row.visible,
            interactive: row.interactive,
        })
        .collect()
}
