//! Configuration loading from codecbench.toml
//!
//! The configuration names the corpus categories, the codec configurations to
//! benchmark and where the tables go. It is discovered by walking up from the
//! current directory; command-line flags override file values.

use codecbench_core::{
    CodecConfiguration, CodecError, CodecFamily, DEFAULT_COMPRESSED_FILE, DEFAULT_DECODED_FILE,
    Label, ScratchPaths,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the configuration file looked up by [`BenchConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "codecbench.toml";

/// Errors raised while reading or interpreting configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Configuration file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Configuration file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// A duration string could not be interpreted
    #[error("invalid duration \"{0}\": {1}")]
    InvalidDuration(String, String),

    /// A codec entry is unusable
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// codecbench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Corpus categories in enumeration order
    #[serde(default)]
    pub corpus: Vec<CorpusConfig>,
    /// Codec configurations in declaration order
    #[serde(default)]
    pub codecs: Vec<CodecConfiguration>,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Runner configuration for trial execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Bound on a single encoder or decoder invocation (e.g. "10m"); unbounded if unset
    #[serde(default)]
    pub timeout: Option<String>,
    /// Directory holding the scratch files; the working directory if unset
    #[serde(default)]
    pub scratch_dir: Option<String>,
    /// Scratch file name for the compressed artifact
    #[serde(default = "default_compressed_file")]
    pub compressed_file: String,
    /// Scratch file name for the decoded artifact
    #[serde(default = "default_decoded_file")]
    pub decoded_file: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            scratch_dir: None,
            compressed_file: default_compressed_file(),
            decoded_file: default_decoded_file(),
        }
    }
}

fn default_compressed_file() -> String {
    DEFAULT_COMPRESSED_FILE.to_string()
}
fn default_decoded_file() -> String {
    DEFAULT_DECODED_FILE.to_string()
}

/// One corpus category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Category name (e.g. a musical genre)
    pub name: String,
    /// Glob patterns; `**` matches across directories
    pub patterns: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Console output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// Directory receiving the tables and the JSON report
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Per-file detail table
    #[serde(default = "default_detail_file")]
    pub detail_file: String,
    /// Aggregate summary table
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
    /// JSON report
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
            detail_file: default_detail_file(),
            summary_file: default_summary_file(),
            report_file: default_report_file(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    ".".to_string()
}
fn default_detail_file() -> String {
    "codec_comparison_result.csv".to_string()
}
fn default_summary_file() -> String {
    "codec_comparison_summary.csv".to_string()
}
fn default_report_file() -> String {
    "report.json".to_string()
}

impl BenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Discover configuration by walking up from the current directory.
    ///
    /// Returns the file found together with its contents. A file that exists
    /// but cannot be loaded is an error rather than a silent fallback.
    pub fn discover() -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let Ok(mut dir) = std::env::current_dir() else {
            return Ok(None);
        };
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                let config = Self::load(&config_path)?;
                return Ok(Some((config_path, config)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Invocation timeout, if one is configured
    pub fn timeout(&self) -> Result<Option<Duration>, ConfigError> {
        self.runner
            .timeout
            .as_deref()
            .map(Self::parse_duration)
            .transpose()
    }

    /// Scratch paths resolved against `base` when relative
    pub fn scratch_paths(&self, base: &Path) -> ScratchPaths {
        let dir = match &self.runner.scratch_dir {
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        };
        ScratchPaths::new(
            dir.join(&self.runner.compressed_file),
            dir.join(&self.runner.decoded_file),
        )
    }

    /// Labels of every declared codec configuration, in order
    pub fn labels(&self) -> Result<Vec<Label>, ConfigError> {
        self.codecs
            .iter()
            .map(|codec| codec.label().map_err(ConfigError::from))
            .collect()
    }

    /// Generate the default configuration as a TOML string
    pub fn default_toml() -> String {
        let mut toml = String::from(
            r#"# codecbench configuration

[runner]
# Bound on a single encoder or decoder invocation (uncomment to enable)
# timeout = "10m"
# Directory for the scratch files (defaults to the working directory)
# scratch_dir = "target/codecbench"
compressed_file = "compressed.tmp"
decoded_file = "decompressed.wav"

[output]
# Console output format: human, json, csv
format = "human"
# Directory receiving the tables and report.json
directory = "."
detail_file = "codec_comparison_result.csv"
summary_file = "codec_comparison_summary.csv"
report_file = "report.json"

# Corpus categories, enumerated in this order. Patterns are relative to this file.
[[corpus]]
name = "classic"
patterns = ["data/RWC Music Database Sub-Working Group - Rwc-Mdb-C-2001-M*/**/*.wav"]

[[corpus]]
name = "genre"
patterns = ["data/RWC Music Database Sub-Working Group - Rwc-Mdb-G-2001-M*/**/*.wav"]

[[corpus]]
name = "jazz"
patterns = ["data/RWC Music Database Sub-Working Group - Rwc-Mdb-J-2001-M*/**/*.wav"]

[[corpus]]
name = "popular"
patterns = ["data/RWC Music Database Sub-Working Group - Rwc-Mdb-P-2001-M*/**/*.wav"]

[[corpus]]
name = "right"
patterns = ["data/RWC Music Database Sub-Working Group - Rwc-Mdb-R-2001-M*/**/*.wav"]

# Codec configurations, benchmarked in this order.
# family: flac, wavpack, tta, monkeys-audio, mpeg4-als, tak, halac, naru, linne,
# srla or template.
#
# [[codecs]]
# family = "flac"
# options = "-8"
#
# [[codecs]]
# family = "wavpack"
# options = "-hh -x4"
#
# [[codecs]]
# family = "tta"
#
# [[codecs]]
# family = "monkeys-audio"
# options = "-c4000"
#
# [[codecs]]
# family = "mpeg4-als"
# options = "-7"
#
# [[codecs]]
# family = "tak"
# options = "-p4m"
#
# [[codecs]]
# family = "halac"
# options = "-mt=1 -normal"
#
# A codec without built-in support:
#
# [[codecs]]
# family = "template"
# options = "-5"
# [codecs.template]
# name = "OptimFROG"
# encode = "ofr --encode {input} --output {output} {options}"
# decode = "ofr --decode {input} --output {output}"
"#,
        );

        for (family, options) in default_codecs() {
            toml.push_str(&format!(
                "\n[[codecs]]\nfamily = \"{}\"\noptions = \"{}\"\n",
                family_key(family),
                options
            ));
        }
        toml
    }

    /// Parse duration string (e.g. "30s", "500ms", "10m") to a [`Duration`]
    pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidDuration(s.to_string(), reason.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = trimmed
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| trimmed.split_at(i))
            .unwrap_or((trimmed, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| invalid("not a number"))?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid("must be a non-negative number"));
        }

        let seconds_per_unit = match unit_part.to_lowercase().as_str() {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" | "" => 1.0,
            "m" | "min" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid("unknown unit")),
        };

        Duration::try_from_secs_f64(value * seconds_per_unit).map_err(|_| invalid("out of range"))
    }
}

/// The SRLA sweep the default configuration enables
fn default_codecs() -> Vec<(CodecFamily, String)> {
    let mut codecs = Vec::new();
    for mode in [0, 2, 4, 6] {
        for block in [2048, 4096, 8192] {
            for (variance, suffix) in [(0, ""), (2, ""), (0, " -P")] {
                codecs.push((
                    CodecFamily::Srla,
                    format!("-m {} -V {} -B {}{}", mode, variance, block, suffix),
                ));
            }
        }
    }
    codecs
}

fn family_key(family: CodecFamily) -> String {
    toml::Value::try_from(family)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", family).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BenchConfig::default();
        assert_eq!(config.runner.compressed_file, "compressed.tmp");
        assert_eq!(config.runner.decoded_file, "decompressed.wav");
        assert!(config.runner.timeout.is_none());
        assert!(config.codecs.is_empty());
        assert_eq!(config.output.format, "human");
    }

    #[test]
    fn test_parse_duration() {
        let secs = |s: &str| BenchConfig::parse_duration(s).unwrap();
        assert_eq!(secs("3s"), Duration::from_secs(3));
        assert_eq!(secs("500ms"), Duration::from_millis(500));
        assert_eq!(secs("100us"), Duration::from_micros(100));
        assert_eq!(secs("2m"), Duration::from_secs(120));
        assert_eq!(secs("1h"), Duration::from_secs(3600));
        assert_eq!(secs("1.5s"), Duration::from_millis(1500));
        assert_eq!(secs("45"), Duration::from_secs(45));
        assert!(BenchConfig::parse_duration("").is_err());
        assert!(BenchConfig::parse_duration("5 fortnights").is_err());
        assert!(BenchConfig::parse_duration("-1s").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [runner]
            timeout = "30s"

            [[corpus]]
            name = "rock"
            patterns = ["rock/*.wav"]

            [[codecs]]
            family = "flac"
            options = "-8"

            [[codecs]]
            family = "template"
            [codecs.template]
            name = "copy"
            encode = "cp {input} {output}"
            decode = "cp {input} {output}"
        "#;

        let config = BenchConfig::parse(toml_str).unwrap();
        assert_eq!(config.timeout().unwrap(), Some(Duration::from_secs(30)));
        assert_eq!(config.corpus[0].name, "rock");
        assert_eq!(config.codecs[0].family, CodecFamily::Flac);
        assert_eq!(config.codecs[1].family, CodecFamily::Template);
        let labels: Vec<String> = config
            .labels()
            .unwrap()
            .iter()
            .map(|l| l.to_string())
            .collect();
        assert_eq!(labels, vec!["FLAC -8", "copy"]);
        // Defaults should still apply
        assert_eq!(config.runner.decoded_file, "decompressed.wav");
        assert_eq!(config.output.detail_file, "codec_comparison_result.csv");
    }

    #[test]
    fn test_unknown_family_is_rejected() {
        let err = BenchConfig::parse("[[codecs]]\nfamily = \"mp3\"\n").unwrap_err();
        assert!(err.to_string().contains("mp3"));
    }

    #[test]
    fn test_default_toml_parses() {
        let config = BenchConfig::parse(&BenchConfig::default_toml()).unwrap();
        assert_eq!(config.corpus.len(), 5);
        assert_eq!(config.corpus[3].name, "popular");
        assert_eq!(config.codecs.len(), 36);
        assert!(config.codecs.iter().all(|c| c.family == CodecFamily::Srla));

        let labels = config.labels().unwrap();
        assert_eq!(labels[0].as_str(), "SRLA -m 0 -V 0 -B 2048");
        assert_eq!(labels[2].as_str(), "SRLA -m 0 -V 0 -B 2048 -P");
        assert_eq!(labels[35].as_str(), "SRLA -m 6 -V 0 -B 8192 -P");
        codecbench_stats::ensure_unique_labels(&labels).unwrap();
    }

    #[test]
    fn test_scratch_paths() {
        let mut config = BenchConfig::default();
        config.runner.scratch_dir = Some("tmp".to_string());
        let scratch = config.scratch_paths(Path::new("/work"));
        assert_eq!(scratch.compressed(), Path::new("/work/tmp/compressed.tmp"));
        assert_eq!(scratch.decoded(), Path::new("/work/tmp/decompressed.wav"));
    }
}
