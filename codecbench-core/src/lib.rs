#![warn(missing_docs)]
//! codecbench Core
//!
//! Measurement side of the harness:
//! - [`CodecAdapter`]: uniform encode/decode contract over external tools
//! - [`codecs`]: command-line conventions of the wrapped codec families
//! - [`run_timed`]: scoped, optionally deadline-bounded process execution
//! - [`TrialRunner`]: one encode/decode/verify trial producing [`TrialResult`]

mod audio;
mod codec;
pub mod codecs;
mod error;
mod process;
mod trial;

pub use audio::{AudioBaseline, SourceFile};
pub use codec::{
    CodecAdapter, CommandCodec, EncodeOutcome, ExternalCodec, Label, reclaim_forced_extension,
    relocate, relocate_with_extension, remove_if_present, with_extensions,
};
pub use codecs::{CodecConfiguration, CodecFamily, CommandTemplate, HALAC_VERSION};
pub use error::{CodecError, TrialError, VerificationFailure};
pub use process::{Invocation, run_timed};
pub use trial::{
    DEFAULT_COMPRESSED_FILE, DEFAULT_DECODED_FILE, Metric, Ratios, ScratchPaths, TrialResult,
    TrialRunner, compare_files,
};
