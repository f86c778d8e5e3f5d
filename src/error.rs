//! Error types for taxonomy loading and case report intake.
//!
//! Taxonomy errors are structural configuration faults and abort startup.
//! Report errors concern a single case document and are handled per file.

use std::path::PathBuf;
use thiserror::Error;

/// Structural faults in a taxonomy definition.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    /// The taxonomy file could not be read.
    #[error("Failed to read taxonomy file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The taxonomy file is not valid TOML or has the wrong shape.
    #[error("Failed to parse taxonomy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Taxonomy defines no nodes")]
    Empty,

    #[error("Duplicate node id {0}")]
    DuplicateId(u32),

    #[error("Duplicate node key '{0}'")]
    DuplicateKey(String),

    #[error("Node {id} has an empty {field}")]
    EmptyField { id: u32, field: &'static str },

    #[error("Node '{key}' references unknown parent {parent}")]
    DanglingParent { key: String, parent: u32 },

    /// Parents must be declared before their children.
    #[error("Node '{key}' references parent {parent}, which is not declared before it")]
    ForwardParent { key: String, parent: u32 },

    #[error("Node '{key}' has indent level {level} (maximum is {max})")]
    IndentTooDeep { key: String, level: u8, max: u8 },

    #[error("Node '{key}' declares indent level {declared} but its depth gives {expected}")]
    IndentMismatch {
        key: String,
        declared: u8,
        expected: u8,
    },

    #[error("Taxonomy has no grand-total node (key '{0}')")]
    MissingGrandTotal(&'static str),

    #[error("Taxonomy declares more than one grand-total node (ids {first} and {second})")]
    DuplicateGrandTotal { first: u32, second: u32 },

    #[error("Grand-total node must be a root but has parent {0}")]
    GrandTotalHasParent(u32),

    #[error("Grand-total node must not have children")]
    GrandTotalHasChildren,
}

/// Failures while reading a single case report document.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read case report {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid case report JSON: {0}")]
    Json(#[from] serde_json::Error),
}
