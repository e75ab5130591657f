//! Check command implementation.

use std::path::PathBuf;

use keystone_canonical::Codec;
use keystone_vectors::{check_set, SetReport, VectorFile};
use serde::Serialize;

use crate::error::CliError;

#[derive(Serialize)]
struct FileReport<'a> {
    file: String,
    #[serde(flatten)]
    report: &'a SetReport,
}

pub fn run(codec: &Codec, files: &[PathBuf], json: bool) -> Result<(), CliError> {
    let mut reports = Vec::with_capacity(files.len());
    for path in files {
        let set = VectorFile::load(path)?;
        reports.push((path.display().to_string(), check_set(&set, codec)));
    }

    let checked: usize = reports
        .iter()
        .map(|(_, r)| r.passed.len() + r.failed.len())
        .sum();
    let failed: usize = reports.iter().map(|(_, r)| r.failed.len()).sum();

    let rendered = if json {
        let entries: Vec<FileReport<'_>> = reports
            .iter()
            .map(|(file, report)| FileReport {
                file: file.clone(),
                report,
            })
            .collect();
        serde_json::to_string_pretty(&entries)?
    } else {
        render_text(&reports)
    };

    if failed > 0 {
        eprintln!("{}", rendered);
        return Err(CliError::VectorsFailed { failed, checked });
    }
    println!("{}", rendered);
    Ok(())
}

fn render_text(reports: &[(String, SetReport)]) -> String {
    let mut lines = Vec::new();
    for (file, report) in reports {
        lines.push(format!(
            "{}: {} passed, {} failed, {} skipped",
            file,
            report.passed.len(),
            report.failed.len(),
            report.skipped.len()
        ));
        for (id, mismatch) in &report.failed {
            lines.push(format!("  FAIL {}: {}", id, mismatch));
        }
    }
    lines.join("\n")
}
