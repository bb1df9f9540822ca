//! Trial Ledger
//!
//! Append-only accumulation of verified trial results. The ledger is created
//! with the declared configuration and category orders, threaded through the
//! trial loop, and handed to [`crate::aggregate`] once every trial is in.

use codecbench_core::{Label, TrialResult};
use fxhash::FxHashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Rejections raised while building or filling a ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// A result whose round trip was not verified
    #[error("[{label}] {path}: result was not verified and cannot be aggregated")]
    Unverified {
        /// Configuration label
        label: String,
        /// Source file
        path: String,
    },

    /// Two configurations share a label
    #[error("duplicate configuration label \"{0}\"")]
    DuplicateLabel(String),

    /// A category was declared twice
    #[error("duplicate category \"{0}\"")]
    DuplicateCategory(String),

    /// A result for a configuration the ledger was not declared with
    #[error("result for undeclared configuration \"{0}\"")]
    UnknownLabel(String),

    /// A result for a category the ledger was not declared with
    #[error("result for undeclared category \"{0}\"")]
    UnknownCategory(String),

    /// A second result for the same configuration and source file
    #[error("[{label}] {path}: file already has a recorded result")]
    DuplicateTrial {
        /// Configuration label
        label: String,
        /// Source file
        path: String,
    },
}

/// Fail if any label occurs more than once.
pub fn ensure_unique_labels<'a>(
    labels: impl IntoIterator<Item = &'a Label>,
) -> Result<(), AggregateError> {
    let mut seen = FxHashSet::default();
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(AggregateError::DuplicateLabel(label.to_string()));
        }
    }
    Ok(())
}

/// Verified trial results in execution order.
#[derive(Debug, Clone, Default)]
pub struct TrialLedger {
    labels: Vec<Label>,
    categories: Vec<String>,
    trials: Vec<TrialResult>,
    recorded: FxHashSet<(Label, PathBuf)>,
}

impl TrialLedger {
    /// Empty ledger for the given configuration and category orders
    pub fn new<C, S>(labels: Vec<Label>, categories: C) -> Result<Self, AggregateError>
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ensure_unique_labels(&labels)?;

        let categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        let mut seen = FxHashSet::default();
        for category in &categories {
            if !seen.insert(category.as_str()) {
                return Err(AggregateError::DuplicateCategory(category.clone()));
            }
        }

        Ok(Self {
            labels,
            categories,
            trials: Vec::new(),
            recorded: FxHashSet::default(),
        })
    }

    /// Append one result. Unverified results, undeclared keys and a second
    /// result for the same (configuration, file) are refused.
    pub fn record(&mut self, result: TrialResult) -> Result<(), AggregateError> {
        if !result.verified {
            return Err(AggregateError::Unverified {
                label: result.label.to_string(),
                path: result.source.path().display().to_string(),
            });
        }
        if !self.labels.contains(&result.label) {
            return Err(AggregateError::UnknownLabel(result.label.to_string()));
        }
        if !self
            .categories
            .iter()
            .any(|c| c == result.source.category())
        {
            return Err(AggregateError::UnknownCategory(
                result.source.category().to_string(),
            ));
        }
        let key = (result.label.clone(), result.source.path().to_path_buf());
        if self.recorded.contains(&key) {
            return Err(AggregateError::DuplicateTrial {
                label: result.label.to_string(),
                path: result.source.path().display().to_string(),
            });
        }
        self.recorded.insert(key);
        self.trials.push(result);
        Ok(())
    }

    /// Declared configuration labels
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Declared categories
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// All results in recording order
    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    /// Results of one configuration, in recording order
    pub fn trials_for<'a>(&'a self, label: &'a Label) -> impl Iterator<Item = &'a TrialResult> + 'a {
        self.trials.iter().filter(move |t| &t.label == label)
    }

    /// Number of recorded results
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}
