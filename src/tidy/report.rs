//! Plain text report of an execution run.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::Local;

use crate::tidy::executor::ExecutionReport;

/// Render the report as text.
#[must_use]
pub fn render_report(report: &ExecutionReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Video organization report");
    let _ = writeln!(text, "Generated: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(text);
    let _ = writeln!(text, "Total tasks:     {}", report.total);
    let _ = writeln!(text, "Moved:           {}", report.moved.len());
    let _ = writeln!(text, "Already present: {}", report.already_present);
    let _ = writeln!(text, "Failed:          {}", report.failures.len());
    if report.not_started > 0 {
        let _ = writeln!(text, "Not started:     {}", report.not_started);
    }
    let _ = writeln!(text, "Elapsed:         {}", crate::format_duration(report.elapsed));
    if report.aborted {
        let _ = writeln!(text, "Aborted by user");
    }

    if !report.moved.is_empty() {
        let _ = writeln!(text, "\nMoved files:");
        for (source, target) in &report.moved {
            let _ = writeln!(text, "  {} -> {}", source.display(), target.display());
        }
    }
    if !report.backups.is_empty() {
        let _ = writeln!(text, "\nBacked up existing files:");
        for backup in &report.backups {
            let _ = writeln!(text, "  {}", backup.display());
        }
    }
    if !report.failures.is_empty() {
        let _ = writeln!(text, "\nFailures:");
        for failure in &report.failures {
            let _ = writeln!(
                text,
                "  {} -> {}: {}",
                failure.source.display(),
                failure.target.display(),
                failure.error
            );
        }
    }
    text
}

/// Write the report to a text file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn export_report(report: &ExecutionReport, path: &Path) -> anyhow::Result<()> {
    fs::write(path, render_report(report)).with_context(|| format!("Failed to write report {}", path.display()))
}
