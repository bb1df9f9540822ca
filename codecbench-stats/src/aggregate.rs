//! Aggregation
//!
//! Per-category and overall arithmetic means of the three ratios:
//! - Category means are taken over the files of that category only
//! - The overall mean pools every file of the configuration, so each category
//!   contributes in proportion to its file count (not a mean of category means)
//! - Sums run sequentially in recording order, so identical ledgers yield
//!   bit-identical means

use crate::ledger::TrialLedger;
use codecbench_core::{Label, Ratios};
use fxhash::FxHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Mean ratios of one configuration over one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAggregate {
    /// Configuration label
    pub label: Label,
    /// Category name
    pub category: String,
    /// Number of files averaged
    pub file_count: usize,
    /// Arithmetic mean of each ratio
    pub mean: Ratios,
}

/// File-weighted mean ratios of one configuration over the whole corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAggregate {
    /// Configuration label
    pub label: Label,
    /// Number of files averaged
    pub file_count: usize,
    /// Arithmetic mean of each ratio over all files
    pub mean: Ratios,
}

/// Everything the summary table needs, in declared order.
///
/// Categories with no files for a configuration have no [`CategoryAggregate`];
/// configurations with no files at all have no [`OverallAggregate`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregates {
    /// Configuration labels in declared order
    pub labels: Vec<Label>,
    /// Categories in declared order
    pub categories: Vec<String>,
    /// Label-major, category-minor
    pub per_category: Vec<CategoryAggregate>,
    /// One per label that has at least one file
    pub overall: Vec<OverallAggregate>,
}

impl Aggregates {
    /// Category mean for `label`, if that category had files
    pub fn category(&self, label: &Label, category: &str) -> Option<&CategoryAggregate> {
        self.per_category
            .iter()
            .find(|a| &a.label == label && a.category == category)
    }

    /// Overall mean for `label`, if it had any files
    pub fn overall(&self, label: &Label) -> Option<&OverallAggregate> {
        self.overall.iter().find(|a| &a.label == label)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RatioSum {
    encode: f64,
    decode: f64,
    compression: f64,
    count: usize,
}

impl RatioSum {
    fn add(&mut self, ratios: &Ratios) {
        self.encode += ratios.encode;
        self.decode += ratios.decode;
        self.compression += ratios.compression;
        self.count += 1;
    }

    fn mean(&self) -> Option<Ratios> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Ratios {
            encode: self.encode / n,
            decode: self.decode / n,
            compression: self.compression / n,
        })
    }
}

/// Reduce a ledger to category and overall means.
///
/// Pure: calling it twice on the same ledger gives equal results.
pub fn aggregate(ledger: &TrialLedger) -> Aggregates {
    let index: FxHashMap<&str, usize> = ledger
        .categories()
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // Labels are independent; collect() keeps declared order.
    let per_label: Vec<(Vec<CategoryAggregate>, Option<OverallAggregate>)> = ledger
        .labels()
        .par_iter()
        .map(|label| aggregate_label(ledger, &index, label))
        .collect();

    let mut aggregates = Aggregates {
        labels: ledger.labels().to_vec(),
        categories: ledger.categories().to_vec(),
        ..Aggregates::default()
    };
    for (categories, overall) in per_label {
        aggregates.per_category.extend(categories);
        aggregates.overall.extend(overall);
    }
    aggregates
}

fn aggregate_label(
    ledger: &TrialLedger,
    index: &FxHashMap<&str, usize>,
    label: &Label,
) -> (Vec<CategoryAggregate>, Option<OverallAggregate>) {
    let mut by_category = vec![RatioSum::default(); ledger.categories().len()];
    let mut pooled = RatioSum::default();

    for trial in ledger.trials_for(label) {
        // The ledger refuses undeclared categories on record().
        if let Some(&i) = index.get(trial.source.category()) {
            by_category[i].add(&trial.ratios);
            pooled.add(&trial.ratios);
        }
    }

    let categories = ledger
        .categories()
        .iter()
        .zip(&by_category)
        .filter_map(|(category, sum)| {
            sum.mean().map(|mean| CategoryAggregate {
                label: label.clone(),
                category: category.clone(),
                file_count: sum.count,
                mean,
            })
        })
        .collect();

    let overall = pooled.mean().map(|mean| OverallAggregate {
        label: label.clone(),
        file_count: pooled.count,
        mean,
    });

    (categories, overall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AggregateError;
    use codecbench_core::{AudioBaseline, SourceFile, TrialResult};
    use std::time::Duration;

    fn trial(label: &Label, category: &str, name: &str, compression: f64) -> TrialResult {
        TrialResult {
            label: label.clone(),
            source: SourceFile::new(format!("{category}/{name}.wav"), category),
            encode_time: Duration::from_millis(10),
            decode_time: Duration::from_millis(5),
            compressed_size: 500,
            baseline: AudioBaseline {
                frames: 44100,
                sample_rate: 44100,
                size_bytes: 1000,
            },
            ratios: Ratios {
                encode: compression / 10.0,
                decode: compression / 20.0,
                compression,
            },
            verified: true,
        }
    }

    fn flac() -> Label {
        Label::new("FLAC", "-5")
    }

    #[test]
    fn overall_mean_is_file_weighted() {
        let label = flac();
        let mut ledger = TrialLedger::new(vec![label.clone()], ["A", "B"]).unwrap();
        ledger.record(trial(&label, "A", "a1", 10.0)).unwrap();
        ledger.record(trial(&label, "A", "a2", 20.0)).unwrap();
        ledger.record(trial(&label, "B", "b1", 30.0)).unwrap();

        let aggregates = aggregate(&ledger);
        let a = aggregates.category(&label, "A").unwrap();
        let b = aggregates.category(&label, "B").unwrap();
        assert_eq!(a.file_count, 2);
        assert!((a.mean.compression - 15.0).abs() < 1e-12);
        assert!((b.mean.compression - 30.0).abs() < 1e-12);

        // Pooled over three files, not (15 + 30) / 2
        let overall = aggregates.overall(&label).unwrap();
        assert_eq!(overall.file_count, 3);
        assert!((overall.mean.compression - 20.0).abs() < 1e-12);
        assert!((overall.mean.encode - 2.0).abs() < 1e-12);
        assert!((overall.mean.decode - 1.0).abs() < 1e-12);
    }

    #[test]
    fn second_result_for_a_file_is_refused() {
        let label = flac();
        let mut ledger = TrialLedger::new(vec![label.clone()], ["A", "B"]).unwrap();
        ledger.record(trial(&label, "A", "a1", 10.0)).unwrap();
        ledger.record(trial(&label, "B", "b1", 40.0)).unwrap();

        let err = ledger.record(trial(&label, "A", "a1", 10.0)).unwrap_err();
        assert_eq!(
            err,
            AggregateError::DuplicateTrial {
                label: "FLAC -5".to_string(),
                path: "A/a1.wav".to_string(),
            }
        );
        assert_eq!(ledger.len(), 2);
        let overall = aggregate(&ledger).overall(&label).unwrap().clone();
        assert!((overall.mean.compression - 25.0).abs() < 1e-12);

        // the same file under another configuration is a separate trial
        let other = Label::new("FLAC", "-8");
        let mut ledger = TrialLedger::new(vec![label.clone(), other.clone()], ["A"]).unwrap();
        ledger.record(trial(&label, "A", "a1", 10.0)).unwrap();
        ledger.record(trial(&other, "A", "a1", 12.0)).unwrap();
    }

    #[test]
    fn empty_category_has_no_mean() {
        let label = flac();
        let mut ledger = TrialLedger::new(vec![label.clone()], ["rock", "jazz"]).unwrap();
        ledger.record(trial(&label, "rock", "r1", 55.0)).unwrap();

        let aggregates = aggregate(&ledger);
        assert!(aggregates.category(&label, "jazz").is_none());
        assert_eq!(aggregates.per_category.len(), 1);
        assert_eq!(aggregates.overall(&label).unwrap().file_count, 1);
    }

    #[test]
    fn configuration_without_files_has_no_overall() {
        let label = flac();
        let ledger = TrialLedger::new(vec![label.clone()], ["rock"]).unwrap();
        let aggregates = aggregate(&ledger);
        assert!(aggregates.overall(&label).is_none());
        assert!(aggregates.per_category.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent_and_ordered() {
        let labels = vec![
            Label::new("FLAC", "-8"),
            Label::new("WavPack", "-hh"),
            Label::new("TTA", ""),
        ];
        let mut ledger = TrialLedger::new(labels.clone(), ["classic", "pop"]).unwrap();
        for (i, label) in labels.iter().enumerate() {
            ledger
                .record(trial(label, "classic", "c1", 40.0 + i as f64 / 3.0))
                .unwrap();
            ledger
                .record(trial(label, "pop", "p1", 60.0 + i as f64 / 7.0))
                .unwrap();
        }

        let first = aggregate(&ledger);
        let second = aggregate(&ledger);
        assert_eq!(first, second);

        let order: Vec<&Label> = first.overall.iter().map(|a| &a.label).collect();
        assert_eq!(order, labels.iter().collect::<Vec<_>>());
        let pairs: Vec<(&str, &str)> = first
            .per_category
            .iter()
            .map(|a| (a.label.as_str(), a.category.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("FLAC -8", "classic"),
                ("FLAC -8", "pop"),
                ("WavPack -hh", "classic"),
                ("WavPack -hh", "pop"),
                ("TTA", "classic"),
                ("TTA", "pop"),
            ]
        );
    }

    #[test]
    fn unverified_results_are_refused() {
        let label = flac();
        let mut ledger = TrialLedger::new(vec![label.clone()], ["A"]).unwrap();
        let mut result = trial(&label, "A", "a1", 50.0);
        result.verified = false;

        let err = ledger.record(result).unwrap_err();
        assert!(matches!(err, AggregateError::Unverified { .. }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn undeclared_keys_are_refused() {
        let label = flac();
        let mut ledger = TrialLedger::new(vec![label.clone()], ["A"]).unwrap();

        let stranger = Label::new("TAK", "-p4m");
        assert_eq!(
            ledger.record(trial(&stranger, "A", "a1", 50.0)).unwrap_err(),
            AggregateError::UnknownLabel("TAK -p4m".to_string())
        );
        assert_eq!(
            ledger.record(trial(&label, "B", "b1", 50.0)).unwrap_err(),
            AggregateError::UnknownCategory("B".to_string())
        );
    }

    #[test]
    fn duplicate_declarations_are_refused() {
        let err = TrialLedger::new(vec![flac(), flac()], ["A"]).unwrap_err();
        assert_eq!(err, AggregateError::DuplicateLabel("FLAC -5".to_string()));

        let err = TrialLedger::new(vec![flac()], ["A", "A"]).unwrap_err();
        assert_eq!(err, AggregateError::DuplicateCategory("A".to_string()));
    }
}
