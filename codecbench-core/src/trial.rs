//! Trial Execution
//!
//! One trial = encode, decode, verify, normalize, for a single
//! (configuration, source file) pair:
//!
//! ```text
//!  source.wav ──encode──▶ compressed scratch ──decode──▶ decoded scratch
//!       │                                                     │
//!       └──────────────── byte-exact comparison ◀─────────────┘
//! ```
//!
//! The two scratch paths are shared by every trial of a run. They are cleared
//! before a trial starts and removed again when it ends, on every exit path.

use crate::audio::{AudioBaseline, SourceFile};
use crate::codec::{CodecAdapter, Label, remove_if_present};
use crate::error::{TrialError, VerificationFailure};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const COMPARE_CHUNK: usize = 64 * 1024;

/// Default compressed scratch file name
pub const DEFAULT_COMPRESSED_FILE: &str = "compressed.tmp";
/// Default decoded scratch file name
pub const DEFAULT_DECODED_FILE: &str = "decompressed.wav";

/// The three measured quantities, each a percentage of a per-file baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ratios {
    /// Encode time as a percentage of audio duration
    pub encode: f64,
    /// Decode time as a percentage of audio duration
    pub decode: f64,
    /// Compressed size as a percentage of source size
    pub compression: f64,
}

impl Ratios {
    /// Normalize raw measurements against a file's intrinsic baselines.
    ///
    /// Returns `None` when either baseline is not strictly positive.
    pub fn from_measurements(
        encode_secs: f64,
        decode_secs: f64,
        compressed_bytes: u64,
        duration_secs: f64,
        original_bytes: u64,
    ) -> Option<Self> {
        if duration_secs.is_nan() || duration_secs <= 0.0 || original_bytes == 0 {
            return None;
        }
        Some(Self {
            encode: 100.0 * encode_secs / duration_secs,
            decode: 100.0 * decode_secs / duration_secs,
            compression: 100.0 * compressed_bytes as f64 / original_bytes as f64,
        })
    }

    /// Value of one metric
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::EncodeTime => self.encode,
            Metric::DecodeTime => self.decode,
            Metric::Compression => self.compression,
        }
    }
}

/// Selector for one of the three ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Encode-time ratio
    EncodeTime,
    /// Decode-time ratio
    DecodeTime,
    /// Compression ratio
    Compression,
}

impl Metric {
    /// All metrics in table order
    pub const ALL: [Metric; 3] = [Metric::EncodeTime, Metric::DecodeTime, Metric::Compression];

    /// Column suffix in per-file tables
    pub fn column_name(self) -> &'static str {
        match self {
            Metric::EncodeTime => "encode time",
            Metric::DecodeTime => "decode time",
            Metric::Compression => "compress rate",
        }
    }

    /// Row suffix in summary tables
    pub fn summary_name(self) -> &'static str {
        match self {
            Metric::EncodeTime => "encode time",
            Metric::DecodeTime => "decode time",
            Metric::Compression => "compression rate",
        }
    }
}

/// Outcome of one (configuration, source file) measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Configuration label
    pub label: Label,
    /// File under test
    pub source: SourceFile,
    /// Wall-clock encode duration
    pub encode_time: Duration,
    /// Wall-clock decode duration
    pub decode_time: Duration,
    /// Compressed artifact size in bytes
    pub compressed_size: u64,
    /// Intrinsic baselines of the source
    pub baseline: AudioBaseline,
    /// Normalized ratios
    pub ratios: Ratios,
    /// Whether the decoded output matched the source byte for byte
    pub verified: bool,
}

/// Locations of the two shared scratch files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchPaths {
    compressed: PathBuf,
    decoded: PathBuf,
}

impl ScratchPaths {
    /// Explicit scratch locations
    pub fn new(compressed: impl Into<PathBuf>, decoded: impl Into<PathBuf>) -> Self {
        Self {
            compressed: compressed.into(),
            decoded: decoded.into(),
        }
    }

    /// Default file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(DEFAULT_COMPRESSED_FILE), dir.join(DEFAULT_DECODED_FILE))
    }

    /// Compressed intermediate
    pub fn compressed(&self) -> &Path {
        &self.compressed
    }

    /// Decoded intermediate
    pub fn decoded(&self) -> &Path {
        &self.decoded
    }

    /// Remove both files if present
    pub fn clear(&self) -> io::Result<()> {
        self.clear_with(&[])
    }

    /// Remove both files and the given codec-specific siblings if present
    pub fn clear_with(&self, siblings: &[PathBuf]) -> io::Result<()> {
        for path in [&self.compressed, &self.decoded].into_iter().chain(siblings) {
            remove_if_present(path)?;
        }
        Ok(())
    }

    fn acquire(&self, siblings: Vec<PathBuf>) -> Result<ScratchGuard<'_>, TrialError> {
        self.clear_with(&siblings).map_err(|source| TrialError::Io {
            path: self.compressed.clone(),
            source,
        })?;
        Ok(ScratchGuard {
            paths: self,
            siblings,
            released: false,
        })
    }
}

/// Removes the scratch files when a trial ends.
struct ScratchGuard<'a> {
    paths: &'a ScratchPaths,
    siblings: Vec<PathBuf>,
    released: bool,
}

impl ScratchGuard<'_> {
    fn release(mut self) -> Result<(), TrialError> {
        self.released = true;
        self.paths
            .clear_with(&self.siblings)
            .map_err(|source| TrialError::Io {
                path: self.paths.compressed.clone(),
                source,
            })
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.paths.clear_with(&self.siblings) {
                warn!(error = %e, "failed to remove scratch files");
            }
        }
    }
}

/// Runs single verified trials against a fixed pair of scratch paths.
#[derive(Debug, Clone)]
pub struct TrialRunner {
    scratch: ScratchPaths,
}

impl TrialRunner {
    /// Runner using `scratch` for intermediates
    pub fn new(scratch: ScratchPaths) -> Self {
        Self { scratch }
    }

    /// Scratch locations used by this runner
    pub fn scratch(&self) -> &ScratchPaths {
        &self.scratch
    }

    /// Encode, decode and verify `source` with `adapter`.
    ///
    /// Any adapter failure, a missing or differing decoded file, or a
    /// degenerate source is returned as an error; no partial result escapes.
    pub fn run(
        &self,
        adapter: &dyn CodecAdapter,
        source: &SourceFile,
    ) -> Result<TrialResult, TrialError> {
        let label = adapter.label();
        let path = source.path();
        let codec_error = |source_err| TrialError::Codec {
            label: label.to_string(),
            path: path.to_path_buf(),
            source: source_err,
        };

        let baseline = AudioBaseline::probe(path)?;
        let scratch = self
            .scratch
            .acquire(adapter.scratch_siblings(self.scratch.compressed()))?;

        let encoded = adapter
            .encode(path, self.scratch.compressed())
            .map_err(codec_error)?;
        let decode_time = adapter
            .decode(self.scratch.compressed(), self.scratch.decoded())
            .map_err(codec_error)?;

        if let Some(reason) = compare_files(path, self.scratch.decoded())? {
            return Err(TrialError::Verification {
                label: label.to_string(),
                path: path.to_path_buf(),
                reason,
            });
        }

        let ratios = Ratios::from_measurements(
            encoded.duration.as_secs_f64(),
            decode_time.as_secs_f64(),
            encoded.size_bytes,
            baseline.duration_secs(),
            baseline.size_bytes,
        )
        .ok_or_else(|| TrialError::DegenerateInput {
            path: path.to_path_buf(),
            reason: "zero baseline".to_string(),
        })?;

        scratch.release()?;

        info!(
            label = %label,
            file = %path.display(),
            encode = ratios.encode,
            decode = ratios.decode,
            compression = ratios.compression,
            "trial complete"
        );

        Ok(TrialResult {
            label: label.clone(),
            source: source.clone(),
            encode_time: encoded.duration,
            decode_time,
            compressed_size: encoded.size_bytes,
            baseline,
            ratios,
            verified: true,
        })
    }
}

/// Compare `expected` against `actual` byte for byte.
///
/// Returns `None` when identical, otherwise the reason they differ.
pub fn compare_files(expected: &Path, actual: &Path) -> Result<Option<VerificationFailure>, TrialError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| TrialError::Io { path, source }
    };

    if !actual.exists() {
        return Ok(Some(VerificationFailure::MissingOutput));
    }

    let expected_len = fs::metadata(expected).map_err(io_error(expected))?.len();
    let actual_len = fs::metadata(actual).map_err(io_error(actual))?.len();
    if expected_len != actual_len {
        return Ok(Some(VerificationFailure::LengthMismatch {
            expected: expected_len,
            actual: actual_len,
        }));
    }

    let mut left = BufReader::new(File::open(expected).map_err(io_error(expected))?);
    let mut right = BufReader::new(File::open(actual).map_err(io_error(actual))?);
    let mut lbuf = vec![0u8; COMPARE_CHUNK];
    let mut rbuf = vec![0u8; COMPARE_CHUNK];
    let mut offset = 0u64;

    loop {
        let ln = fill(&mut left, &mut lbuf).map_err(io_error(expected))?;
        let rn = fill(&mut right, &mut rbuf).map_err(io_error(actual))?;
        if let Some(i) = lbuf[..ln]
            .iter()
            .zip(&rbuf[..rn])
            .position(|(a, b)| a != b)
        {
            return Ok(Some(VerificationFailure::ContentMismatch {
                offset: offset + i as u64,
            }));
        }
        if ln != rn {
            // a file changed size while being compared
            return Ok(Some(VerificationFailure::ContentMismatch {
                offset: offset + ln.min(rn) as u64,
            }));
        }
        if ln == 0 {
            return Ok(None);
        }
        offset += ln as u64;
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
