//! Integration tests for codecbench
//!
//! These drive whole runs through the CLI entry point with stand-in codecs
//! built from ordinary Unix tools, over WAV files synthesized with hound.

#![cfg(unix)]

use codecbench::prelude::*;
use codecbench::{BenchConfig, Cli, CommandTemplate, TrialError, VerificationFailure};
use codecbench_cli::ExecutionError;
use clap::Parser;
use std::fs;
use std::path::Path;

fn write_wav(path: &Path, frames: u32, seed: i16) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames as i32 {
        writer.write_sample(((i * 7) % 1000) as i16 + seed).unwrap();
        writer.write_sample(-(((i * 13) % 500) as i16) - seed).unwrap();
    }
    writer.finalize().unwrap();
}

/// A corpus of three files over two populated categories and one empty one
fn write_corpus(root: &Path) {
    write_wav(&root.join("corpus/rock/b.wav"), 4000, 3);
    write_wav(&root.join("corpus/rock/a.wav"), 8000, 1);
    write_wav(&root.join("corpus/jazz/c.wav"), 2000, 5);
}

const COPY_CODECS: &str = r#"
[[codecs]]
family = "template"
[codecs.template]
name = "copy"
encode = "cp {input} {output}"
decode = "cp {input} {output}"

[[codecs]]
family = "template"
options = "-x"
[codecs.template]
name = "copy-ext"
encode = "cp {input} {output}"
decode = "cp {input} {output}"
encode_extension = "bin"
decode_extension = "bin"
"#;

const TRUNCATING_CODEC: &str = r#"
[[codecs]]
family = "template"
[codecs.template]
name = "lossy"
encode = "cp {input} {output}"
decode = "dd if={input} of={output} bs=100 count=1"
"#;

fn write_config(root: &Path, codecs: &str) -> std::path::PathBuf {
    let config = format!(
        r#"
[runner]
scratch_dir = "scratch"

[output]
directory = "out"

[[corpus]]
name = "rock"
patterns = ["corpus/rock/*.wav"]

[[corpus]]
name = "jazz"
patterns = ["corpus/jazz/**/*.wav"]

[[corpus]]
name = "empty"
patterns = ["corpus/empty/*.wav"]
{}"#,
        codecs
    );
    let path = root.join("codecbench.toml");
    fs::write(&path, config).unwrap();
    path
}

fn run(args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["codecbench"];
    argv.extend_from_slice(args);
    codecbench::run_with_cli(Cli::try_parse_from(argv).unwrap())
}

fn fields(line: &str) -> Vec<&str> {
    line.split(',').collect()
}

/// A full run writes both tables and the JSON report, and cleans its scratch files
#[test]
fn test_end_to_end_run() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = write_config(dir.path(), COPY_CODECS);

    run(&["--config", config.to_str().unwrap(), "--format", "csv"]).unwrap();

    let out = dir.path().join("out");
    let detail = fs::read_to_string(out.join("codec_comparison_result.csv")).unwrap();
    let lines: Vec<&str> = detail.lines().collect();
    assert_eq!(lines.len(), 4, "header plus one row per file");
    assert!(lines[0].starts_with("CPU: "));
    assert!(lines[0].ends_with(
        "copy encode time,copy decode time,copy compress rate,\
         copy-ext -x encode time,copy-ext -x decode time,copy-ext -x compress rate"
    ));

    // Category order, then lexicographic order within a category
    let stems: Vec<&str> = lines[1..].iter().map(|l| fields(l)[0]).collect();
    assert_eq!(stems, vec!["a", "b", "c"]);
    for line in &lines[1..] {
        let row = fields(line);
        assert_eq!(row.len(), 7);
        // A copy is exactly as large as its source
        assert_eq!(row[3], "100");
        assert_eq!(row[6], "100");
        let encode: f64 = row[1].parse().unwrap();
        assert!(encode > 0.0);
    }

    let summary = fs::read_to_string(out.join("codec_comparison_summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 1 + 3 * 4);
    assert!(lines[0].ends_with(",copy,copy-ext -x"));
    assert_eq!(lines[3], "empty mean encode time,,");
    assert_eq!(lines[9], "rock mean compression rate,100,100");
    assert_eq!(lines[12], "total mean compression rate,100,100");

    let report =
        codecbench::parse_json_report(&fs::read_to_string(out.join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report.results.len(), 6);
    assert_eq!(report.summary.files, 3);
    assert_eq!(report.categories, vec!["rock", "jazz", "empty"]);
    let copy = Label::new("copy", "");
    assert_eq!(report.aggregates.overall(&copy).unwrap().file_count, 3);
    assert!(report.aggregates.category(&copy, "empty").is_none());

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("scratch"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "scratch files left behind: {:?}", leftovers);
}

/// A decoder that does not reproduce the source aborts the run without tables
#[test]
fn test_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = write_config(dir.path(), TRUNCATING_CODEC);

    let err = run(&["--config", config.to_str().unwrap()]).unwrap_err();
    let execution = err.downcast_ref::<ExecutionError>().unwrap();
    match execution {
        ExecutionError::Trial(TrialError::Verification { label, reason, .. }) => {
            assert_eq!(label, "lossy");
            assert!(matches!(reason, VerificationFailure::LengthMismatch { actual: 100, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    let out = dir.path().join("out");
    assert!(!out.join("codec_comparison_result.csv").exists());
    assert!(!out.join("codec_comparison_summary.csv").exists());
    assert!(!out.join("report.json").exists());
}

/// A codec whose executable is missing is a fatal adapter error
#[test]
fn test_missing_executable_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = write_config(
        dir.path(),
        r#"
[[codecs]]
family = "template"
[codecs.template]
name = "ghost"
encode = "codecbench-no-such-encoder {input} {output}"
decode = "cp {input} {output}"
"#,
    );

    let err = run(&["--config", config.to_str().unwrap()]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExecutionError>(),
        Some(ExecutionError::Trial(TrialError::Codec { .. }))
    ));
}

/// The filter and category restriction narrow the run; table shape is stable
#[test]
fn test_filtered_runs_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = write_config(dir.path(), COPY_CODECS);
    let config = config.to_str().unwrap();

    let mut tables = Vec::new();
    for out in ["first", "second"] {
        let out_dir = dir.path().join(out);
        run(&[
            "run",
            "^copy-ext",
            "--config",
            config,
            "--category",
            "rock",
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--format",
            "json",
        ])
        .unwrap();
        tables.push(fs::read_to_string(out_dir.join("codec_comparison_result.csv")).unwrap());
    }

    let shape = |table: &str| -> Vec<(String, String)> {
        table
            .lines()
            .map(|l| {
                let row = fields(l);
                (row[0].to_string(), row[row.len() - 1].to_string())
            })
            .collect()
    };
    assert_eq!(shape(&tables[0]), shape(&tables[1]));

    let lines: Vec<&str> = tables[0].lines().collect();
    assert_eq!(lines.len(), 3, "only the rock files");
    assert_eq!(fields(lines[0]).len(), 4, "only the copy-ext configuration");
}

/// `list` plans without running anything
#[test]
fn test_list_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());
    let config = write_config(dir.path(), COPY_CODECS);

    run(&["list", "--config", config.to_str().unwrap()]).unwrap();
    assert!(!dir.path().join("out").exists());
    assert!(!dir.path().join("scratch").exists());
}

/// The shipped default configuration declares unique labels
#[test]
fn test_default_config_labels_are_unique() {
    let config = BenchConfig::parse(&BenchConfig::default_toml()).unwrap();
    let labels = config.labels().unwrap();
    assert_eq!(labels.len(), 36);
    codecbench_stats::ensure_unique_labels(&labels).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("codecbench.toml");
    fs::write(&path, BenchConfig::default_toml()).unwrap();
    run(&["list", "--config", path.to_str().unwrap()]).unwrap();
}

/// The library pieces compose without the CLI
#[test]
fn test_library_pipeline_weights_files_equally() {
    let dir = tempfile::tempdir().unwrap();
    write_corpus(dir.path());

    let template = CommandTemplate {
        name: "copy".to_string(),
        encode: "cp {input} {output}".to_string(),
        decode: "cp {input} {output}".to_string(),
        encode_extension: None,
        decode_extension: None,
    };
    let adapter = ExternalCodec::new(CodecConfiguration::with_template(template, "").build().unwrap());
    let runner = TrialRunner::new(ScratchPaths::in_dir(dir.path()));

    let sources = [
        SourceFile::new(dir.path().join("corpus/rock/a.wav"), "rock"),
        SourceFile::new(dir.path().join("corpus/rock/b.wav"), "rock"),
        SourceFile::new(dir.path().join("corpus/jazz/c.wav"), "jazz"),
    ];
    let mut ledger = TrialLedger::new(vec![adapter.label().clone()], ["rock", "jazz"]).unwrap();
    for source in &sources {
        ledger.record(runner.run(&adapter, source).unwrap()).unwrap();
    }

    let aggregates = aggregate(&ledger);
    let label = adapter.label();
    let encode: Vec<f64> = ledger.trials().iter().map(|t| t.ratios.encode).collect();
    let pooled = encode.iter().sum::<f64>() / 3.0;
    let overall = aggregates.overall(label).unwrap();
    assert_eq!(overall.file_count, 3);
    assert!((overall.mean.encode - pooled).abs() < 1e-9);
    assert_eq!(aggregates.category(label, "rock").unwrap().file_count, 2);
    assert!(!dir.path().join("compressed.tmp").exists());
    assert!(!dir.path().join("decompressed.wav").exists());
}
