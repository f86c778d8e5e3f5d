//! WBC count aggregation.
//!
//! This module turns a flat per-category count map into one row per taxonomy
//! node: leaf counts are read from the map, group counts are summed from
//! their direct children, and every row carries its share of the grand total.
//! Aggregation never fails; missing counts are zero and unknown keys are
//! reported as diagnostics.

use crate::models::{AggregatedRow, CountMap};
use crate::taxonomy::Taxonomy;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// The result of one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    /// One row per taxonomy node, in declaration order.
    pub rows: Vec<AggregatedRow>,
    /// Sum of the classifiable leaf counts.
    pub total: u64,
    /// Count keys that matched no countable leaf, sorted.
    pub unknown_keys: Vec<String>,
}

impl Aggregation {
    /// Row for the node with `key`.
    #[allow(dead_code)] // Lookup for callers holding a key rather than a position
    pub fn row(&self, key: &str) -> Option<&AggregatedRow> {
        self.rows.iter().find(|row| row.node.key == key)
    }
}

/// Data-quality diagnostics are warnings in debug builds and debug-level
/// logs in release builds.
fn diagnostic(message: fmt::Arguments<'_>) {
    if cfg!(debug_assertions) {
        warn!("{}", message);
    } else {
        debug!("{}", message);
    }
}

/// Percentage of `count` in `total`, capped at 100.
pub fn share_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 100.0 / total as f64).min(100.0)
}

/// Aggregate `counts` over `taxonomy`.
pub fn aggregate(taxonomy: &Taxonomy, counts: &CountMap) -> Aggregation {
    let nodes = taxonomy.nodes();
    let mut tallies = vec![0u64; nodes.len()];

    for (position, node) in nodes.iter().enumerate() {
        if taxonomy.is_leaf(position) {
            tallies[position] = counts.get(&node.key).copied().unwrap_or(0);
        }
    }

    let total = (0..nodes.len())
        .filter(|&position| taxonomy.is_classifiable(position))
        .fold(0u64, |sum, position| sum.saturating_add(tallies[position]));

    // Children are always resolved before their group.
    for &position in taxonomy.evaluation_order() {
        let children = taxonomy.children(position);
        if children.is_empty() {
            continue;
        }

        let mut sum = 0u64;
        for &child in children {
            match tallies.get(child) {
                Some(count) => sum = sum.saturating_add(*count),
                None => diagnostic(format_args!(
                    "Group '{}' references child position {} with no row, skipping",
                    nodes[position].key, child
                )),
            }
        }
        tallies[position] = sum;
    }

    let grand_total = taxonomy.grand_total_position();
    tallies[grand_total] = total;

    let rows = nodes
        .iter()
        .zip(&tallies)
        .enumerate()
        .map(|(position, (node, &count))| {
            let percentage = if position == grand_total {
                if total > 0 {
                    100.0
                } else {
                    0.0
                }
            } else {
                share_of(count, total)
            };

            AggregatedRow {
                node: node.clone(),
                count,
                percentage,
            }
        })
        .collect();

    let unknown_keys: Vec<String> = counts
        .keys()
        .filter(|key| !taxonomy.is_countable_key(key))
        .cloned()
        .collect();
    for key in &unknown_keys {
        diagnostic(format_args!("Ignoring count for unknown WBC category '{}'", key));
    }

    Aggregation {
        rows,
        total,
        unknown_keys,
    }
}

/// Pool several count maps into one, summing per key.
pub fn merge_counts<'a, I>(maps: I) -> CountMap
where
    I: IntoIterator<Item = &'a CountMap>,
{
    let mut merged = CountMap::new();
    for map in maps {
        for (key, count) in map {
            let entry = merged.entry(key.clone()).or_insert(0);
            *entry = entry.saturating_add(*count);
        }
    }
    merged
}
