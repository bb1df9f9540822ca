//! Codec Contract
//!
//! Two traits split the codec abstraction:
//!
//! - [`CommandCodec`] describes *how* a family's tool is driven: the encode
//!   and decode command lines plus the optional fix-up hooks around them.
//!   Built-in families live in [`crate::codecs`].
//! - [`CodecAdapter`] is the uniform encode/decode contract the trial runner
//!   consumes. [`ExternalCodec`] implements it for any [`CommandCodec`] by
//!   running the commands with [`run_timed`].
//!
//! Keeping the trial runner on [`CodecAdapter`] lets tests substitute
//! in-process codecs without touching external tools.

use crate::error::CodecError;
use crate::process::{Invocation, run_timed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Unique, human-readable name of one benchmarked configuration.
///
/// Labels are the join key of every table the harness produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// Build a label from a family name and an option string.
    ///
    /// Whitespace runs in the options collapse to single spaces, so option
    /// strings that only differ in spacing yield the same label.
    pub fn new(family: &str, options: &str) -> Self {
        let options = options.split_whitespace().collect::<Vec<_>>().join(" ");
        if options.is_empty() {
            Label(family.trim().to_string())
        } else {
            Label(format!("{} {}", family.trim(), options))
        }
    }

    /// Label text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Command-line description of one codec family with fixed options.
pub trait CommandCodec: fmt::Debug + Send + Sync {
    /// Family name as shown in labels (e.g. `FLAC`)
    fn family(&self) -> &str;

    /// Option string passed to the tool
    fn options(&self) -> &str;

    /// Label of this configuration
    fn label(&self) -> Label {
        Label::new(self.family(), self.options())
    }

    /// Command that encodes `input` into `output`
    fn encode_command(&self, input: &Path, output: &Path) -> Invocation;

    /// Fix-up after a successful encode, e.g. moving a forced-extension
    /// artifact to `output`
    fn post_encode(&self, _output: &Path) -> Result<(), CodecError> {
        Ok(())
    }

    /// Command that decodes `input` into `output`
    fn decode_command(&self, input: &Path, output: &Path) -> Invocation;

    /// Fix-up before decoding. Returns the path the decoder should read,
    /// which differs from `input` when the file had to be renamed.
    fn pre_decode(&self, input: &Path) -> Result<PathBuf, CodecError> {
        Ok(input.to_path_buf())
    }

    /// Extra files the tool or the fix-up hooks may create next to the
    /// compressed `path`, e.g. `compressed.tak`
    fn scratch_siblings(&self, _path: &Path) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Result of one encode operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOutcome {
    /// Wall-clock duration of the encoder process
    pub duration: Duration,
    /// Size of the compressed artifact at the requested output path
    pub size_bytes: u64,
}

/// Uniform encode/decode contract used by the trial runner.
pub trait CodecAdapter {
    /// Label of the configuration this adapter runs
    fn label(&self) -> &Label;

    /// Encode `input` into `output`, returning duration and artifact size
    fn encode(&self, input: &Path, output: &Path) -> Result<EncodeOutcome, CodecError>;

    /// Decode `input` into `output`, returning the duration
    fn decode(&self, input: &Path, output: &Path) -> Result<Duration, CodecError>;

    /// Files besides `compressed` that a trial must clear
    fn scratch_siblings(&self, _compressed: &Path) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// [`CodecAdapter`] backed by an external command-line tool.
#[derive(Debug)]
pub struct ExternalCodec {
    codec: Box<dyn CommandCodec>,
    label: Label,
    timeout: Option<Duration>,
}

impl ExternalCodec {
    /// Wrap a command codec without a deadline
    pub fn new(codec: Box<dyn CommandCodec>) -> Self {
        let label = codec.label();
        Self {
            codec,
            label,
            timeout: None,
        }
    }

    /// Apply a per-invocation deadline
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Underlying command description
    pub fn command_codec(&self) -> &dyn CommandCodec {
        self.codec.as_ref()
    }
}

impl CodecAdapter for ExternalCodec {
    fn label(&self) -> &Label {
        &self.label
    }

    fn encode(&self, input: &Path, output: &Path) -> Result<EncodeOutcome, CodecError> {
        // A stale forced-extension file would be reclaimed as this encode's output
        for sibling in self.codec.scratch_siblings(output) {
            remove_if_present(&sibling)?;
        }
        let invocation = self.codec.encode_command(input, output);
        let duration = run_timed(&invocation, self.timeout)?;
        self.codec.post_encode(output)?;

        let size_bytes = match fs::metadata(output) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CodecError::MissingArtifact {
                    path: output.to_path_buf(),
                });
            }
            Err(e) => return Err(CodecError::Io(e)),
        };

        Ok(EncodeOutcome {
            duration,
            size_bytes,
        })
    }

    fn decode(&self, input: &Path, output: &Path) -> Result<Duration, CodecError> {
        let tool_input = self.codec.pre_decode(input)?;
        let restore = (tool_input != input).then(|| Restore::new(&tool_input, input));

        let invocation = self.codec.decode_command(&tool_input, output);
        let duration = run_timed(&invocation, self.timeout)?;

        if let Some(restore) = restore {
            restore.finish()?;
        }
        Ok(duration)
    }

    fn scratch_siblings(&self, compressed: &Path) -> Vec<PathBuf> {
        self.codec.scratch_siblings(compressed)
    }
}

/// Remove `path`, treating an absent file as success.
pub fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// `path` with each of `extensions`, skipping ones equal to `path`.
pub fn with_extensions<'a>(path: &Path, extensions: impl IntoIterator<Item = &'a str>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for ext in extensions {
        let sibling = path.with_extension(ext);
        if sibling != path && !paths.contains(&sibling) {
            paths.push(sibling);
        }
    }
    paths
}

/// Move `from` to `to`, replacing any existing file at `to`.
pub fn relocate(from: &Path, to: &Path) -> Result<(), CodecError> {
    fs::rename(from, to).map_err(|source| CodecError::RelocationFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

/// Move `path` to the same name with extension `ext`; returns the new path.
pub fn relocate_with_extension(path: &Path, ext: &str) -> Result<PathBuf, CodecError> {
    let target = path.with_extension(ext);
    if target != path {
        relocate(path, &target)?;
    }
    Ok(target)
}

/// Move `path.<ext>` back to `path` once a tool that forces `ext` has run.
///
/// A missing `path.<ext>` means the tool wrote nothing.
pub fn reclaim_forced_extension(path: &Path, ext: &str) -> Result<(), CodecError> {
    let forced = path.with_extension(ext);
    if forced == path {
        return Ok(());
    }
    if !forced.exists() {
        return Err(CodecError::MissingArtifact { path: forced });
    }
    relocate(&forced, path)
}

/// Moves a renamed decoder input back to its original path.
///
/// Finishing explicitly propagates rename errors; dropping without finishing
/// (a failed decode) restores on a best-effort basis.
struct Restore {
    current: PathBuf,
    original: PathBuf,
    done: bool,
}

impl Restore {
    fn new(current: &Path, original: &Path) -> Self {
        Self {
            current: current.to_path_buf(),
            original: original.to_path_buf(),
            done: false,
        }
    }

    fn finish(mut self) -> Result<(), CodecError> {
        self.done = true;
        relocate(&self.current, &self.original)
    }
}

impl Drop for Restore {
    fn drop(&mut self) {
        if !self.done && self.current.exists() {
            if let Err(e) = fs::rename(&self.current, &self.original) {
                warn!(
                    from = %self.current.display(),
                    to = %self.original.display(),
                    error = %e,
                    "failed to restore renamed decoder input"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_joins_family_and_options() {
        assert_eq!(Label::new("FLAC", "-8").as_str(), "FLAC -8");
        assert_eq!(Label::new("SRLA", "-m 2  -V 0 ").as_str(), "SRLA -m 2 -V 0");
        assert_eq!(Label::new("TTA", "").as_str(), "TTA");
        assert_eq!(Label::new("WavPack", "   ").to_string(), "WavPack");
    }

    #[test]
    fn relocate_with_extension_renames_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compressed.tmp");
        fs::write(&path, b"payload").unwrap();

        let moved = relocate_with_extension(&path, "tak").unwrap();

        assert_eq!(moved, dir.path().join("compressed.tak"));
        assert!(!path.exists());
        assert_eq!(fs::read(&moved).unwrap(), b"payload");
    }

    #[test]
    fn relocate_with_same_extension_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ape");
        fs::write(&path, b"x").unwrap();

        let moved = relocate_with_extension(&path, "ape").unwrap();
        assert_eq!(moved, path);
        assert!(path.exists());
    }

    #[test]
    fn reclaim_missing_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = reclaim_forced_extension(&dir.path().join("out.tmp"), "halac").unwrap_err();
        match err {
            CodecError::MissingArtifact { path } => assert_eq!(path, dir.path().join("out.halac")),
            other => panic!("expected missing artifact, got {other}"),
        }
    }

    #[test]
    fn sibling_paths_skip_the_path_itself() {
        let path = Path::new("scratch/compressed.tmp");
        assert_eq!(
            with_extensions(path, ["tak", "tmp", "tak", "ape"]),
            vec![
                PathBuf::from("scratch/compressed.tak"),
                PathBuf::from("scratch/compressed.ape")
            ]
        );
    }

    #[test]
    fn restore_on_drop_moves_file_back() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("c.tmp");
        let renamed = dir.path().join("c.tak");
        fs::write(&renamed, b"data").unwrap();

        drop(Restore::new(&renamed, &original));

        assert!(original.exists());
        assert!(!renamed.exists());
    }
}
