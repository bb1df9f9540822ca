//! Report Building
//!
//! Assembles the [`Report`] of a finished run from the plan, the filled
//! ledger and its aggregates.
//!
//! ```text
//! TrialLedger ──► aggregate() ──► Aggregates
//!      │                              │
//!      └──────────────┬───────────────┘
//!                     ▼
//!                  Report  ──► detail / summary CSV, JSON
//! ```

use super::metadata::build_report_meta;
use crate::planner::ExecutionPlan;
use codecbench_report::{FileResult, Report, ReportConfig, ReportSummary};
use codecbench_stats::{Aggregates, TrialLedger};

/// Build a complete Report from a finished run
pub fn build_report(
    plan: &ExecutionPlan,
    ledger: &TrialLedger,
    aggregates: Aggregates,
    config: ReportConfig,
) -> Report {
    let labels = ledger.labels().to_vec();
    let categories = ledger.categories().to_vec();
    let sources: Vec<_> = plan.corpus.files().cloned().collect();
    let results: Vec<FileResult> = ledger.trials().iter().map(FileResult::from).collect();
    let summary = ReportSummary::from_results(&labels, &categories, &sources, &results);

    Report {
        meta: build_report_meta(config),
        labels,
        categories,
        sources,
        results,
        aggregates,
        summary,
    }
}
