#![warn(missing_docs)]
//! codecbench Statistics
//!
//! Turns verified trial results into the numbers the summary table reports:
//! - [`TrialLedger`]: append-only store keyed by declared labels and categories
//! - [`aggregate`]: per-category means and the file-weighted overall mean

mod aggregate;
mod ledger;

pub use aggregate::{Aggregates, CategoryAggregate, OverallAggregate, aggregate};
pub use ledger::{AggregateError, TrialLedger, ensure_unique_labels};
