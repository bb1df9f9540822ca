//! Trial Executor
//!
//! Runs the plan and turns its results into a report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionPlan (from planner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Sequential encode/decode/verify trials
//! └──────┬──────┘
//!        │  TrialLedger
//!        ▼
//! ┌─────────────┐
//! │  aggregate  │  Category and overall means (parallel across labels)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Report with system metadata
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Sequential trial loop with progress display
//! - [`report`] - Report assembly
//! - [`formatting`] - Human-readable output formatting
//! - [`metadata`] - System metadata collection

mod execution;
mod formatting;
mod metadata;
mod report;

pub use execution::{ExecutionConfig, ExecutionError, Executor};
pub use formatting::format_human_output;
pub use metadata::{build_report_meta, system_info};
pub use report::build_report;
