//! Analysis modules.
//!
//! Count aggregation over the taxonomy, and the row-selection helpers that
//! link aggregated rows to the cell gallery.

pub mod aggregator;
pub mod selection;

pub use aggregator::*;
pub use selection::*;
