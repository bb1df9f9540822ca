#![warn(missing_docs)]
//! codecbench Report
//!
//! Output of a completed run:
//! - CSV detail and summary tables
//! - JSON report with system metadata, per-file results and aggregates

mod csv;
mod json;
mod report;

pub use csv::{generate_detail_csv, generate_summary_csv, write_detail_csv, write_summary_csv};
pub use json::{generate_json_report, parse_json_report};
pub use report::{
    FileResult, Report, ReportConfig, ReportMeta, ReportSummary, SCHEMA_VERSION, SystemInfo,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable terminal summary
    #[default]
    Human,
    /// JSON report on stdout
    Json,
    /// Summary table as CSV on stdout
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("text".parse::<OutputFormat>(), Ok(OutputFormat::Human));
        assert_eq!("csv".parse::<OutputFormat>(), Ok(OutputFormat::Csv));
        assert!("html".parse::<OutputFormat>().is_err());
    }
}
