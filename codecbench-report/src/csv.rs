//! CSV Output
//!
//! The two tables of a run:
//! - detail: one row per source file, a (encode, decode, compress) triple of
//!   columns per configuration
//! - summary: one column per configuration, one row per (metric, category)
//!   mean plus a `total` row per metric

use crate::report::{FileResult, Report};
use codecbench_core::Metric;
use std::collections::HashMap;
use std::io::{self, Write};

fn cpu_header(report: &Report) -> String {
    format!("CPU: {}", report.meta.system.cpu)
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Write the per-file detail table.
///
/// Columns are configuration-major: for each label in declaration order,
/// `<label> encode time`, `<label> decode time`, `<label> compress rate`.
pub fn write_detail_csv<W: Write>(report: &Report, writer: W) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(false).from_writer(writer);

    let mut header = Vec::with_capacity(1 + report.labels.len() * Metric::ALL.len());
    header.push(cpu_header(report));
    for label in &report.labels {
        for metric in Metric::ALL {
            header.push(format!("{} {}", label, metric.column_name()));
        }
    }
    wtr.write_record(&header)?;

    let index: HashMap<(&str, &str), &FileResult> = report
        .results
        .iter()
        .map(|r| ((r.label.as_str(), r.path.as_str()), r))
        .collect();

    for source in &report.sources {
        let path = source.path().display().to_string();
        let mut record = Vec::with_capacity(header.len());
        record.push(source.stem());
        for label in &report.labels {
            let result = index.get(&(label.as_str(), path.as_str()));
            for metric in Metric::ALL {
                record.push(cell(result.map(|r| r.ratios.get(metric))));
            }
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the aggregate summary table.
///
/// Rows per metric: `<category> mean <metric>` for each category, then
/// `total mean <metric>`. Absent aggregates are empty cells.
pub fn write_summary_csv<W: Write>(report: &Report, writer: W) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(false).from_writer(writer);
    let aggregates = &report.aggregates;

    let mut header = Vec::with_capacity(1 + report.labels.len());
    header.push(cpu_header(report));
    header.extend(report.labels.iter().map(|l| l.to_string()));
    wtr.write_record(&header)?;

    for metric in Metric::ALL {
        for category in &report.categories {
            let mut record = vec![format!("{} mean {}", category, metric.summary_name())];
            record.extend(report.labels.iter().map(|label| {
                cell(
                    aggregates
                        .category(label, category)
                        .map(|a| a.mean.get(metric)),
                )
            }));
            wtr.write_record(&record)?;
        }

        let mut record = vec![format!("total mean {}", metric.summary_name())];
        record.extend(
            report
                .labels
                .iter()
                .map(|label| cell(aggregates.overall(label).map(|a| a.mean.get(metric)))),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn render(write: impl FnOnce(&mut Vec<u8>) -> csv::Result<()>) -> csv::Result<String> {
    let mut buf = Vec::new();
    write(&mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Detail table as a string
pub fn generate_detail_csv(report: &Report) -> csv::Result<String> {
    render(|buf| write_detail_csv(report, buf))
}

/// Summary table as a string
pub fn generate_summary_csv(report: &Report) -> csv::Result<String> {
    render(|buf| write_summary_csv(report, buf))
}
