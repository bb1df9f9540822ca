//! Error types
//!
//! Every variant here is fatal for the run: the harness never retries an
//! invocation and never averages in a result it could not verify.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single codec operation (encode or decode).
#[derive(Debug, Error)]
pub enum CodecError {
    /// The external program could not be started
    #[error("failed to spawn `{program}`: {source}")]
    SpawnFailed {
        /// Program name as configured
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The external program exited unsuccessfully
    #[error("`{command}` exited with {status}")]
    NonZeroExit {
        /// Rendered command line
        command: String,
        /// Exit status reported by the OS
        status: ExitStatus,
    },

    /// The external program ran past its deadline and was terminated
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout {
        /// Rendered command line
        command: String,
        /// Configured deadline
        timeout: Duration,
    },

    /// The tool reported success but left no artifact behind
    #[error("expected output artifact {} is missing", path.display())]
    MissingArtifact {
        /// Path the artifact was expected at
        path: PathBuf,
    },

    /// Moving an artifact to the path the caller asked for failed
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    RelocationFailed {
        /// Source path
        from: PathBuf,
        /// Destination path
        to: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A configuration could not be turned into a runnable codec
    #[error("invalid codec configuration: {0}")]
    InvalidConfiguration(String),

    /// Any other I/O failure while handling artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a round trip did not reproduce its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// The decoder did not produce the decoded scratch file
    MissingOutput,
    /// Both files exist but their lengths differ
    LengthMismatch {
        /// Source length in bytes
        expected: u64,
        /// Decoded length in bytes
        actual: u64,
    },
    /// Same length, different content starting at `offset`
    ContentMismatch {
        /// Byte offset of the first difference
        offset: u64,
    },
}

impl std::fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationFailure::MissingOutput => write!(f, "decoded output is missing"),
            VerificationFailure::LengthMismatch { expected, actual } => write!(
                f,
                "decoded output is {} bytes, source is {} bytes",
                actual, expected
            ),
            VerificationFailure::ContentMismatch { offset } => {
                write!(f, "decoded output differs from source at byte {}", offset)
            }
        }
    }
}

/// Failure of one (configuration, file) trial.
#[derive(Debug, Error)]
pub enum TrialError {
    /// Encode or decode failed
    #[error("[{label}] {}: {source}", path.display())]
    Codec {
        /// Configuration label
        label: String,
        /// Source file under test
        path: PathBuf,
        /// Adapter failure
        #[source]
        source: CodecError,
    },

    /// Decoding did not reproduce the source byte for byte
    #[error("[{label}] {}: round-trip verification failed: {reason}", path.display())]
    Verification {
        /// Configuration label
        label: String,
        /// Source file under test
        path: PathBuf,
        /// What went wrong
        reason: VerificationFailure,
    },

    /// The source has a zero baseline (no samples, zero rate or zero bytes)
    #[error("degenerate input {}: {reason}", path.display())]
    DegenerateInput {
        /// Offending source file
        path: PathBuf,
        /// Which baseline is zero
        reason: String,
    },

    /// The source could not be parsed as a WAV file
    #[error("failed to read audio header of {}: {source}", path.display())]
    Audio {
        /// Offending source file
        path: PathBuf,
        /// Parser error
        #[source]
        source: hound::Error,
    },

    /// I/O failure while comparing or measuring files
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
}
