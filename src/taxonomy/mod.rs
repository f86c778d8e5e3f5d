//! The WBC parameter taxonomy.
//!
//! A `Taxonomy` is built once at startup from a list of node records,
//! validated, and then shared read-only by every aggregation. Construction
//! derives the parent/child adjacency, the key index and a post-order
//! evaluation sequence so that aggregation never rescans the node list.

mod builtin;

use crate::error::TaxonomyError;
use crate::models::{TaxonomyNode, GRAND_TOTAL_KEY};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Deepest rendering indent a node may carry.
pub const MAX_INDENT: u8 = 3;

/// A node as written in a taxonomy file.
///
/// `indent_level` may be omitted, in which case it is derived from the
/// nesting depth. When given it must match that depth.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    pub id: u32,
    pub label: String,
    pub key: String,
    #[serde(default, deserialize_with = "crate::models::parent_id::deserialize")]
    pub parent: Option<u32>,
    #[serde(default)]
    pub emphasized: bool,
    #[serde(default)]
    pub indent_level: Option<u8>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub interactive: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    #[serde(rename = "node", default)]
    nodes: Vec<NodeRecord>,
}

/// A validated, immutable taxonomy.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    nodes: Vec<TaxonomyNode>,
    /// Child positions per node position, in declaration order.
    children: Vec<Vec<usize>>,
    by_key: HashMap<String, usize>,
    /// Every node after all of its children.
    evaluation_order: Vec<usize>,
    grand_total: usize,
}

impl Taxonomy {
    /// The taxonomy shipped with the application.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_records(builtin::wbc_records())
    }

    /// Load a taxonomy from a TOML file of `[[node]]` tables.
    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let content = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a taxonomy from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = toml::from_str(content)?;
        Self::from_records(file.nodes)
    }

    /// Build from file records, deriving missing indent levels.
    ///
    /// An explicit `indent_level` must agree with the nesting depth
    /// (capped at [`MAX_INDENT`]).
    pub fn from_records(records: Vec<NodeRecord>) -> Result<Self, TaxonomyError> {
        let mut depths: HashMap<u32, u8> = HashMap::with_capacity(records.len());
        let mut nodes = Vec::with_capacity(records.len());

        for record in records {
            let depth = record
                .parent
                .and_then(|parent| depths.get(&parent))
                .map_or(0, |d| d.saturating_add(1));
            depths.insert(record.id, depth);

            let expected = depth.min(MAX_INDENT);
            let indent_level = match record.indent_level {
                Some(declared) if declared != expected => {
                    return Err(TaxonomyError::IndentMismatch {
                        key: record.key,
                        declared,
                        expected,
                    })
                }
                _ => expected,
            };

            nodes.push(TaxonomyNode {
                id: record.id,
                label: record.label,
                key: record.key,
                parent: record.parent,
                emphasized: record.emphasized,
                indent_level,
                visible: record.visible,
                interactive: record.interactive,
            });
        }

        Self::new(nodes)
    }

    /// Validate the nodes and build the lookup structures.
    pub fn new(nodes: Vec<TaxonomyNode>) -> Result<Self, TaxonomyError> {
        if nodes.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let mut by_id: HashMap<u32, usize> = HashMap::with_capacity(nodes.len());
        let mut by_key: HashMap<String, usize> = HashMap::with_capacity(nodes.len());
        let mut grand_total: Option<usize> = None;

        for (position, node) in nodes.iter().enumerate() {
            if node.key.trim().is_empty() {
                return Err(TaxonomyError::EmptyField {
                    id: node.id,
                    field: "key",
                });
            }
            if node.label.trim().is_empty() {
                return Err(TaxonomyError::EmptyField {
                    id: node.id,
                    field: "label",
                });
            }
            if node.indent_level > MAX_INDENT {
                return Err(TaxonomyError::IndentTooDeep {
                    key: node.key.clone(),
                    level: node.indent_level,
                    max: MAX_INDENT,
                });
            }
            if by_id.insert(node.id, position).is_some() {
                return Err(TaxonomyError::DuplicateId(node.id));
            }
            if node.key == GRAND_TOTAL_KEY {
                if let Some(first) = grand_total {
                    return Err(TaxonomyError::DuplicateGrandTotal {
                        first: nodes[first].id,
                        second: node.id,
                    });
                }
                grand_total = Some(position);
            }
            if by_key.insert(node.key.clone(), position).is_some() {
                return Err(TaxonomyError::DuplicateKey(node.key.clone()));
            }
        }

        let grand_total = grand_total.ok_or(TaxonomyError::MissingGrandTotal(GRAND_TOTAL_KEY))?;
        if let Some(parent) = nodes[grand_total].parent {
            return Err(TaxonomyError::GrandTotalHasParent(parent));
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (position, node) in nodes.iter().enumerate() {
            let Some(parent) = node.parent else {
                continue;
            };
            match by_id.get(&parent) {
                None => {
                    return Err(TaxonomyError::DanglingParent {
                        key: node.key.clone(),
                        parent,
                    })
                }
                Some(&parent_position) if parent_position >= position => {
                    return Err(TaxonomyError::ForwardParent {
                        key: node.key.clone(),
                        parent,
                    })
                }
                Some(&parent_position) => children[parent_position].push(position),
            }
        }

        if !children[grand_total].is_empty() {
            return Err(TaxonomyError::GrandTotalHasChildren);
        }

        let evaluation_order = post_order(&nodes, &children);
        debug!(
            "Taxonomy validated: {} nodes, {} groups",
            nodes.len(),
            children.iter().filter(|c| !c.is_empty()).count()
        );

        Ok(Self {
            nodes,
            children,
            by_key,
            evaluation_order,
            grand_total,
        })
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> &[TaxonomyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Direct children of the node at `position`.
    pub fn children(&self, position: usize) -> &[usize] {
        self.children
            .get(position)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_leaf(&self, position: usize) -> bool {
        self.children(position).is_empty()
    }

    /// A leaf that is both visible and interactive feeds the grand total.
    pub fn is_classifiable(&self, position: usize) -> bool {
        position != self.grand_total
            && self.is_leaf(position)
            && self
                .nodes
                .get(position)
                .is_some_and(|node| node.visible && node.interactive)
    }

    /// Position of the node with `key`.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn get(&self, key: &str) -> Option<&TaxonomyNode> {
        self.position(key).and_then(|position| self.nodes.get(position))
    }

    /// True if `key` names a leaf whose count is read from the count map.
    pub fn is_countable_key(&self, key: &str) -> bool {
        self.position(key)
            .is_some_and(|position| position != self.grand_total && self.is_leaf(position))
    }

    /// Position of the grand-total node.
    pub fn grand_total_position(&self) -> usize {
        self.grand_total
    }

    /// Node positions ordered so that every node follows all of its children.
    pub fn evaluation_order(&self) -> &[usize] {
        &self.evaluation_order
    }
}

/// Iterative post-order walk from the roots, in declaration order.
fn post_order(nodes: &[TaxonomyNode], children: &[Vec<usize>]) -> Vec<usize> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut stack: Vec<(usize, bool)> = nodes
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, node)| node.is_root())
        .map(|(position, _)| (position, false))
        .collect();

    while let Some((position, expanded)) = stack.pop() {
        if expanded {
            order.push(position);
            continue;
        }
        stack.push((position, true));
        for &child in children[position].iter().rev() {
            stack.push((child, false));
        }
    }

    order
}
