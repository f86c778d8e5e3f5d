//! Row selection and image-grid section ordering.
//!
//! Clicking an interactive row scrolls the cell gallery to the section of
//! the same category. Sections are ordered by taxonomy position, and only
//! visible categories get one.

use crate::models::{CountMap, GallerySection};
use crate::taxonomy::Taxonomy;

/// Prefix of every gallery section anchor.
pub const SECTION_PREFIX: &str = "wbc-";

/// Anchor of the gallery section for `key`.
pub fn section_anchor(key: &str) -> String {
    format!("{}{}", SECTION_PREFIX, key)
}

/// Section to scroll to when a row with `key` and `interactive` is clicked.
pub fn select_row_flag(key: &str, interactive: bool) -> Option<String> {
    interactive.then(|| section_anchor(key))
}

/// Section to scroll to when the row with `key` is clicked.
#[allow(dead_code)] // Lookup for callers that only hold the key
pub fn select_row(taxonomy: &Taxonomy, key: &str) -> Option<String> {
    let node = taxonomy.get(key)?;
    select_row_flag(&node.key, node.interactive)
}

/// Gallery sections for the categories present in a case.
///
/// Categories the taxonomy does not know, or hides, get no section.
pub fn gallery_sections(taxonomy: &Taxonomy, cells: &CountMap) -> Vec<GallerySection> {
    let mut present: Vec<(usize, &str, u64)> = cells
        .iter()
        .filter_map(|(key, &count)| {
            let position = taxonomy.position(key)?;
            let node = taxonomy.nodes().get(position)?;
            node.visible.then_some((position, key.as_str(), count))
        })
        .collect();
    present.sort_by_key(|(position, _, _)| *position);

    present
        .into_iter()
        .filter_map(|(position, key, cells)| {
            let node = taxonomy.nodes().get(position)?;
            Some(GallerySection {
                key: key.to_string(),
                label: node.label.clone(),
                anchor: section_anchor(key),
                cells,
            })
        })
        .collect()
}
