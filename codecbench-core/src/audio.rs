//! Source audio assets and their intrinsic baselines.

use crate::error::TrialError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A reference audio file annotated with its category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    path: PathBuf,
    category: String,
}

impl SourceFile {
    /// Describe a source file belonging to `category`
    pub fn new(path: impl Into<PathBuf>, category: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            category: category.into(),
        }
    }

    /// Path on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Category (e.g. musical genre)
    pub fn category(&self) -> &str {
        &self.category
    }

    /// File name without extension, used as the row key in detail tables
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Intrinsic per-file quantities that ratios are normalized against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioBaseline {
    /// Sample frames per channel
    pub frames: u64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Size of the source file in bytes
    pub size_bytes: u64,
}

impl AudioBaseline {
    /// Read the WAV header and file size of `path`.
    ///
    /// A baseline with no frames, a zero sample rate or zero bytes is a
    /// precondition violation and is reported as [`TrialError::DegenerateInput`].
    pub fn probe(path: &Path) -> Result<Self, TrialError> {
        let size_bytes = fs::metadata(path)
            .map_err(|source| TrialError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let reader = hound::WavReader::open(path).map_err(|source| TrialError::Audio {
            path: path.to_path_buf(),
            source,
        })?;
        let spec = reader.spec();

        let baseline = Self {
            frames: u64::from(reader.duration()),
            sample_rate: spec.sample_rate,
            size_bytes,
        };
        baseline.check(path)?;
        Ok(baseline)
    }

    fn check(&self, path: &Path) -> Result<(), TrialError> {
        let reason = if self.size_bytes == 0 {
            "file is empty"
        } else if self.sample_rate == 0 {
            "sample rate is zero"
        } else if self.frames == 0 {
            "audio contains no samples"
        } else {
            return Ok(());
        };
        Err(TrialError::DegenerateInput {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        })
    }

    /// Audio duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / f64::from(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, rate: u32, frames: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            writer.write_sample((i % 128) as i16).unwrap();
            writer.write_sample(-((i % 64) as i16)).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn probe_reads_frames_rate_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8000, 4000);

        let baseline = AudioBaseline::probe(&path).unwrap();
        assert_eq!(baseline.frames, 4000);
        assert_eq!(baseline.sample_rate, 8000);
        assert_eq!(baseline.size_bytes, fs::metadata(&path).unwrap().len());
        assert!((baseline.duration_secs() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_length_audio_is_degenerate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_wav(&path, 44100, 0);

        let err = AudioBaseline::probe(&path).unwrap_err();
        assert!(matches!(err, TrialError::DegenerateInput { .. }));
    }

    #[test]
    fn non_wav_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        fs::write(&path, b"definitely not RIFF").unwrap();

        let err = AudioBaseline::probe(&path).unwrap_err();
        assert!(matches!(err, TrialError::Audio { .. }));
    }

    #[test]
    fn stem_drops_directory_and_extension() {
        let file = SourceFile::new("data/jazz/M01 take.wav", "jazz");
        assert_eq!(file.stem(), "M01 take");
        assert_eq!(file.category(), "jazz");
    }
}
