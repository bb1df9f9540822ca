#![warn(missing_docs)]
//! codecbench CLI Library
//!
//! Command-line driver for the harness. Use `codecbench::run()` (or
//! `codecbench_cli::run()`) in a main function to get the full CLI.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     codecbench_cli::run()
//! }
//! ```

mod config;
mod executor;
mod planner;

pub use config::*;
pub use executor::{
    ExecutionConfig, ExecutionError, Executor, build_report, build_report_meta,
    format_human_output, system_info,
};
pub use planner::{
    Category, Corpus, ExecutionPlan, PlanError, PlannedCodec, build_plan, discover_corpus,
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use codecbench_report::{
    OutputFormat, Report, ReportConfig, generate_detail_csv, generate_json_report,
    generate_summary_csv,
};
use codecbench_stats::aggregate;
use rayon::ThreadPoolBuilder;
use regex::Regex;
use std::path::{Path, PathBuf};

/// codecbench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "codecbench")]
#[command(author, version, about = "codecbench - lossless audio codec benchmark harness")]
pub struct Cli {
    /// Optional subcommand (Run, List, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Filter codec configurations by regex over their labels
    #[arg(default_value = ".*")]
    pub filter: String,

    /// Configuration file (default: codecbench.toml found by walking up)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Run only this corpus category
    #[arg(long, global = true)]
    pub category: Option<String>,

    /// Output format: human, json, csv
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Directory receiving the tables and report.json
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Bound on each encoder/decoder invocation (e.g. "30s", "10m")
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Directory for the scratch files
    #[arg(long, global = true)]
    pub scratch_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of threads for aggregation
    /// 0 = use all available cores (default), 1 = single-threaded
    #[arg(long, short = 'j', default_value = "0", global = true)]
    pub threads: usize,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configurations and per-category file counts without running
    List {
        /// Filter codec configurations by regex over their labels
        filter: Option<String>,
    },
    /// Run the benchmark (default)
    Run {
        /// Filter codec configurations by regex over their labels
        filter: Option<String>,
    },
    /// Print a default codecbench.toml
    Init,
}

/// Run the codecbench CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or the first fatal error.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the codecbench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging; a subscriber installed earlier in the process wins.
    let filter = if cli.verbose {
        "codecbench=debug"
    } else {
        "codecbench=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    if let Some(Commands::Init) = cli.command {
        print!("{}", BenchConfig::default_toml());
        return Ok(());
    }

    let (config, base) = load_config(&cli)?;

    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let filter = match &cli.command {
        Some(Commands::List { filter: Some(f) }) | Some(Commands::Run { filter: Some(f) }) => f,
        _ => &cli.filter,
    };
    let filter_re =
        Regex::new(filter).with_context(|| format!("invalid filter pattern \"{}\"", filter))?;

    let corpus = discover_corpus(&config.corpus, &base, cli.category.as_deref())?;
    let plan = build_plan(&config.codecs, Some(&filter_re), corpus)?;

    match cli.command {
        Some(Commands::List { .. }) => {
            list_plan(&plan);
            Ok(())
        }
        _ => run_plan(&cli, &config, &base, &plan, format, filter),
    }
}

/// Load the configuration named on the command line, or discover one.
///
/// Returns it with the directory relative corpus patterns resolve against.
fn load_config(cli: &Cli) -> anyhow::Result<(BenchConfig, PathBuf)> {
    let found = match &cli.config {
        Some(path) => Some((path.clone(), BenchConfig::load(path)?)),
        None => BenchConfig::discover()?,
    };
    let cwd = std::env::current_dir().context("cannot determine working directory")?;

    Ok(match found {
        Some((path, config)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| cwd.join(p))
                .unwrap_or(cwd);
            (config, base)
        }
        None => {
            tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
            (BenchConfig::default(), cwd)
        }
    })
}

fn list_plan(plan: &ExecutionPlan) {
    println!("codecbench Plan:");

    println!("├── configurations:");
    for codec in &plan.codecs {
        println!("│   ├── {}", codec.label);
    }
    println!("├── corpus:");
    for category in &plan.corpus.categories {
        println!("│   ├── {} ({} files)", category.name, category.files.len());
    }

    println!(
        "{} configurations × {} files = {} trials.",
        plan.codecs.len(),
        plan.corpus.file_count(),
        plan.trial_count()
    );
}

fn run_plan(
    cli: &Cli,
    config: &BenchConfig,
    base: &Path,
    plan: &ExecutionPlan,
    format: OutputFormat,
    filter: &str,
) -> anyhow::Result<()> {
    if plan.codecs.is_empty() {
        println!("No codec configurations selected.");
        return Ok(());
    }

    // Configure Rayon thread pool for aggregation
    if cli.threads > 0 {
        ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok();
    }

    // CLI flags override config file values
    let timeout = match &cli.timeout {
        Some(t) => Some(BenchConfig::parse_duration(t)?),
        None => config.timeout()?,
    };
    let mut scratch_config = config.clone();
    if let Some(dir) = &cli.scratch_dir {
        scratch_config.runner.scratch_dir = Some(dir.to_string_lossy().into_owned());
    }
    let scratch = scratch_config.scratch_paths(base);

    eprintln!(
        "Running {} configurations over {} files ({} trials)...\n",
        plan.codecs.len(),
        plan.corpus.file_count(),
        plan.trial_count()
    );

    let executor = Executor::new(ExecutionConfig {
        timeout,
        scratch: scratch.clone(),
        progress: true,
    });
    let (ledger, elapsed) = executor.execute(plan)?;
    tracing::info!(trials = ledger.len(), elapsed_secs = elapsed.as_secs_f64(), "all trials verified");

    let aggregates = aggregate(&ledger);
    let report = build_report(
        plan,
        &ledger,
        aggregates,
        ReportConfig {
            timeout_secs: timeout.map(|t| t.as_secs_f64()),
            compressed_file: scratch.compressed().display().to_string(),
            decoded_file: scratch.decoded().display().to_string(),
            filter: Some(filter.to_string()).filter(|f| f != ".*"),
            category: cli.category.clone(),
        },
    );

    let output_dir = match &cli.output_dir {
        Some(dir) => dir.clone(),
        None => base.join(&config.output.directory),
    };
    write_outputs(&report, config, &output_dir)?;

    let output = match format {
        OutputFormat::Json => generate_json_report(&report)?,
        OutputFormat::Csv => generate_summary_csv(&report)?,
        OutputFormat::Human => format_human_output(&report),
    };
    print!("{}", output);

    Ok(())
}

/// Write the detail table, the summary table and the JSON report.
///
/// Everything is rendered before the first file is touched, and each file is
/// written to a temporary sibling and renamed into place.
fn write_outputs(report: &Report, config: &BenchConfig, dir: &Path) -> anyhow::Result<()> {
    let detail = generate_detail_csv(report)?;
    let summary = generate_summary_csv(report)?;
    let json = generate_json_report(report)?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    for (name, contents) in [
        (&config.output.detail_file, detail),
        (&config.output.summary_file, summary),
        (&config.output.report_file, json),
    ] {
        let path = dir.join(name);
        write_atomically(&path, contents.as_bytes())?;
        eprintln!("Written: {}", path.display());
    }
    Ok(())
}

fn write_atomically(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("{} is not a file path", path.display()))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, contents).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}
