//! Output Formatting
//!
//! Human-readable output for a finished run: one block per configuration with
//! the category means and the file-weighted total, all as percentages.

use codecbench_core::Ratios;
use codecbench_report::Report;

fn ratio_columns(files: usize, mean: Option<&Ratios>) -> String {
    match mean {
        Some(m) => format!(
            "{:>6}  {:>10.3}  {:>10.3}  {:>10.3}",
            files, m.encode, m.decode, m.compression
        ),
        None => format!("{:>6}  {:>10}  {:>10}  {:>10}", 0, "-", "-", "-"),
    }
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("codecbench Results\n");
    output.push_str(&"=".repeat(72));
    output.push('\n');
    output.push_str(&format!("CPU: {}\n", report.meta.system.cpu));
    output.push_str(&format!(
        "{} configuration(s), {} categor{}, {} file(s), {} trial(s)\n\n",
        report.summary.configurations,
        report.summary.categories,
        if report.summary.categories == 1 { "y" } else { "ies" },
        report.summary.files,
        report.summary.trials
    ));

    let width = report
        .categories
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(0)
        .max("total".len());

    for label in &report.labels {
        output.push_str(&format!("{}\n", label));
        output.push_str(&"-".repeat(72));
        output.push('\n');
        output.push_str(&format!(
            "  {:<width$}  {:>6}  {:>10}  {:>10}  {:>10}\n",
            "category",
            "files",
            "encode %",
            "decode %",
            "size %",
            width = width
        ));

        for category in &report.categories {
            let aggregate = report.aggregates.category(label, category);
            output.push_str(&format!(
                "  {:<width$}  {}\n",
                category,
                ratio_columns(
                    aggregate.map_or(0, |a| a.file_count),
                    aggregate.map(|a| &a.mean)
                ),
                width = width
            ));
        }

        let overall = report.aggregates.overall(label);
        output.push_str(&format!(
            "  {:<width$}  {}\n\n",
            "total",
            ratio_columns(overall.map_or(0, |a| a.file_count), overall.map(|a| &a.mean)),
            width = width
        ));
    }

    if report.labels.is_empty() {
        output.push_str("No configurations were run.\n");
    }

    output.push_str(&format!(
        "Encode time is {:.1}% and decode time {:.1}% of {:.1}s of audio\n",
        percent(report.summary.total_encode_secs, report.summary.total_duration_secs),
        percent(report.summary.total_decode_secs, report.summary.total_duration_secs),
        report.summary.total_duration_secs
    ));

    output
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { 100.0 * part / whole } else { 0.0 }
}
