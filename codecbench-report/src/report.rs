//! Report Data Structures

use chrono::{DateTime, Utc};
use codecbench_core::{Label, Ratios, SourceFile, TrialResult};
use codecbench_stats::Aggregates;
use serde::{Deserialize, Serialize};

/// Version of the JSON layout below
pub const SCHEMA_VERSION: u32 = 1;

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub meta: ReportMeta,
    /// Configuration labels in declaration order
    pub labels: Vec<Label>,
    /// Categories in enumeration order
    pub categories: Vec<String>,
    /// Source files in enumeration order (category, then path)
    pub sources: Vec<SourceFile>,
    /// One entry per trial, in execution order
    pub results: Vec<FileResult>,
    pub aggregates: Aggregates,
    pub summary: ReportSummary,
}

impl Report {
    /// Result of `label` on `source`, if that trial ran
    pub fn result(&self, label: &Label, source: &SourceFile) -> Option<&FileResult> {
        let path = source.path().display().to_string();
        self.results
            .iter()
            .find(|r| &r.label == label && r.path == path)
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub system: SystemInfo,
    pub config: ReportConfig,
}

/// Runner settings captured in report metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    pub timeout_secs: Option<f64>,
    pub compressed_file: String,
    pub decoded_file: String,
    pub filter: Option<String>,
    pub category: Option<String>,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    /// CPU model string, heads both tables
    pub cpu: String,
    pub cpu_cores: u32,
}

/// One trial flattened for machine-readable output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub label: Label,
    pub category: String,
    pub path: String,
    pub stem: String,
    pub encode_secs: f64,
    pub decode_secs: f64,
    pub duration_secs: f64,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
    pub ratios: Ratios,
}

impl From<&TrialResult> for FileResult {
    fn from(trial: &TrialResult) -> Self {
        Self {
            label: trial.label.clone(),
            category: trial.source.category().to_string(),
            path: trial.source.path().display().to_string(),
            stem: trial.source.stem(),
            encode_secs: trial.encode_time.as_secs_f64(),
            decode_secs: trial.decode_time.as_secs_f64(),
            duration_secs: trial.baseline.duration_secs(),
            original_bytes: trial.baseline.size_bytes,
            compressed_bytes: trial.compressed_size,
            ratios: trial.ratios,
        }
    }
}

/// Run-level totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub configurations: usize,
    pub categories: usize,
    pub files: usize,
    pub trials: usize,
    pub total_encode_secs: f64,
    pub total_decode_secs: f64,
    pub total_duration_secs: f64,
}

impl ReportSummary {
    /// Totals over a set of per-file results
    pub fn from_results(
        labels: &[Label],
        categories: &[String],
        sources: &[SourceFile],
        results: &[FileResult],
    ) -> Self {
        Self {
            configurations: labels.len(),
            categories: categories.len(),
            files: sources.len(),
            trials: results.len(),
            total_encode_secs: results.iter().map(|r| r.encode_secs).sum(),
            total_decode_secs: results.iter().map(|r| r.decode_secs).sum(),
            total_duration_secs: results.iter().map(|r| r.duration_secs).sum(),
        }
    }
}
