#![warn(missing_docs)]
//! # codecbench
//!
//! Benchmarking harness for lossless audio codecs.
//!
//! codecbench drives external encoders and decoders over a categorized corpus
//! of WAV files and reports, per file and per configuration:
//! - **Encode time** as a percentage of the audio duration
//! - **Decode time** as a percentage of the audio duration
//! - **Compressed size** as a percentage of the source size
//!
//! Every trial is verified by a byte-exact comparison of the decoded output
//! with the source; any mismatch aborts the run before a table is written.
//! Means are reported per category and over the whole corpus, where the
//! overall mean weights every file equally.
//!
//! ## Quick Start
//!
//! ```text
//! codecbench init > codecbench.toml
//! codecbench list
//! codecbench run "^FLAC"
//! ```
//!
//! ## Library Use
//!
//! ```ignore
//! use codecbench::prelude::*;
//!
//! let adapter = ExternalCodec::new(CodecConfiguration::new(CodecFamily::Flac, "-8").build()?);
//! let runner = TrialRunner::new(ScratchPaths::in_dir(&scratch_dir));
//! let result = runner.run(&adapter, &SourceFile::new("rock/track01.wav", "rock"))?;
//! println!("{}: {:.2}%", result.label, result.ratios.compression);
//! ```

// Re-export core types
pub use codecbench_core::{
    AudioBaseline, CodecAdapter, CodecConfiguration, CodecError, CodecFamily, CommandCodec,
    CommandTemplate, EncodeOutcome, ExternalCodec, Invocation, Label, Metric, Ratios,
    ScratchPaths, SourceFile, TrialError, TrialResult, TrialRunner, VerificationFailure, codecs,
};

// Re-export stats
pub use codecbench_stats::{
    AggregateError, Aggregates, CategoryAggregate, OverallAggregate, TrialLedger, aggregate,
};

// Re-export report
pub use codecbench_report::{
    OutputFormat, Report, generate_detail_csv, generate_json_report, generate_summary_csv,
    parse_json_report,
};

// Re-export CLI pieces
pub use codecbench_cli::{BenchConfig, Cli, Commands, run_with_cli};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CodecAdapter, CodecConfiguration, CodecFamily, ExternalCodec, Label, ScratchPaths,
        SourceFile, TrialLedger, TrialRunner, aggregate,
    };
}

/// Run the codecbench CLI.
///
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     codecbench::run()
/// }
/// ```
pub use codecbench_cli::run;
