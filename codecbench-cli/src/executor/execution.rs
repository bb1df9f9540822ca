//! Trial Execution
//!
//! Runs every planned configuration over the corpus, strictly one trial at a
//! time, and threads the results into a [`TrialLedger`].
//!
//! ## Data Flow
//!
//! ```text
//! ExecutionPlan (configurations × corpus)
//!        │
//!        ▼
//!   ExecutionConfig (timeout, scratch paths)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │  Executor        │  encode → decode → verify, per file
//! └────────┬─────────┘
//!          │
//!          ▼
//!  TrialLedger (verified results, execution order)
//! ```
//!
//! The first failing trial aborts the run. Nothing is retried.

use crate::planner::ExecutionPlan;
use codecbench_core::{ExternalCodec, ScratchPaths, TrialError, TrialRunner};
use codecbench_stats::{AggregateError, TrialLedger};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A trial failed
    #[error(transparent)]
    Trial(#[from] TrialError),

    /// A configuration could not be turned into an adapter
    #[error(transparent)]
    Codec(#[from] codecbench_core::CodecError),

    /// A result was refused by the ledger
    #[error(transparent)]
    Ledger(#[from] AggregateError),

    /// The scratch directory could not be prepared
    #[error("failed to prepare scratch directory {path}: {source}")]
    Scratch {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration for trial execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Bound on each encoder or decoder invocation
    pub timeout: Option<Duration>,
    /// Scratch files reused by every trial
    pub scratch: ScratchPaths,
    /// Draw a progress bar on stderr
    pub progress: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            scratch: ScratchPaths::new(
                codecbench_core::DEFAULT_COMPRESSED_FILE,
                codecbench_core::DEFAULT_DECODED_FILE,
            ),
            progress: true,
        }
    }
}

/// Sequential trial executor
pub struct Executor {
    config: ExecutionConfig,
    runner: TrialRunner,
}

impl Executor {
    /// Executor over the given scratch paths and timeout
    pub fn new(config: ExecutionConfig) -> Self {
        let runner = TrialRunner::new(config.scratch.clone());
        Self { config, runner }
    }

    /// Run the whole plan, returning the filled ledger and the wall time spent
    pub fn execute(&self, plan: &ExecutionPlan) -> Result<(TrialLedger, Duration), ExecutionError> {
        self.prepare_scratch()?;

        let mut ledger = TrialLedger::new(plan.labels(), plan.corpus.category_names())?;
        let start = Instant::now();

        let pb = if self.config.progress {
            ProgressBar::new(plan.trial_count() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        for planned in &plan.codecs {
            let adapter = ExternalCodec::new(planned.config.build()?).with_timeout(self.config.timeout);
            pb.set_message(planned.label.to_string());

            for source in plan.corpus.files() {
                let result = match self.runner.run(&adapter, source) {
                    Ok(result) => result,
                    Err(e) => {
                        pb.abandon_with_message(format!("{} failed", planned.label));
                        return Err(e.into());
                    }
                };
                ledger.record(result)?;

                let line = format!("[{}] {}", planned.label, source.path().display());
                if pb.is_hidden() {
                    eprintln!("{}", line);
                } else {
                    pb.println(line);
                }
                pb.inc(1);
            }
        }

        pb.finish_with_message("Complete");
        Ok((ledger, start.elapsed()))
    }

    fn prepare_scratch(&self) -> Result<(), ExecutionError> {
        let scratch = &self.config.scratch;
        for path in [scratch.compressed(), scratch.decoded()] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| ExecutionError::Scratch {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}
