//! Plain-text run report for the CLI.
//!
//! The JSON artifacts are the machine-readable contract; this is the short
//! human summary printed to stdout after a run.

use std::io::{self, Write};

use errorutil_core::error::ErrorUtilError;
use errorutil_core::pipeline::{RunReport, RunStatus};

/// Write the run report.
pub fn emit_report<W: Write>(report: &RunReport, out: &mut W) -> io::Result<()> {
    for (name, summary) in &report.summary.components {
        let totals = &summary.totals;
        writeln!(
            out,
            "component {}: {} file(s), {} declaration(s) ({} placeholder(s)), {} detail(s)",
            name, totals.files, totals.declarations, totals.placeholders, totals.details
        )?;
        match (summary.min_code, summary.max_code) {
            (Some(min), Some(max)) => write!(out, "codes {}..={}", min, max)?,
            _ => write!(out, "no numeric codes")?,
        }
        match summary.next_error_code {
            Some(next) => writeln!(out, ", next_error_code {}", next)?,
            None => writeln!(out)?,
        }
        if totals.orphans > 0 {
            writeln!(out, "{} declaration(s) without details", totals.orphans)?;
        }
    }

    if let Some(update) = &report.update {
        let plan = &update.plan;
        let failed = |file: &str| update.failed_files.iter().any(|(f, _)| f == file);
        if plan.is_empty() {
            writeln!(out, "no codes assigned")?;
        } else {
            let written = plan.assignments.iter().filter(|a| !failed(a.file.as_str())).count();
            writeln!(
                out,
                "assigned {} of {} code(s) from {} in {} file(s), next_error_code {} -> {}",
                written,
                plan.assignments.len(),
                plan.start,
                update.committed_files.len(),
                update.counter_before,
                update.counter_after
            )?;
            for a in &plan.assignments {
                let note = if failed(a.file.as_str()) { " (not written)" } else { "" };
                writeln!(
                    out,
                    "  {}: {} {} -> {}{}",
                    a.location,
                    a.name,
                    a.old_literal,
                    a.new_literal(),
                    note
                )?;
            }
        }
        for (file, message) in &update.failed_files {
            writeln!(out, "  rewrite failed: {}: {}", file, message)?;
        }
    }

    for summary in report.summary.components.values() {
        if !summary.violations.is_empty() {
            writeln!(out, "{} violation(s):", summary.violations.len())?;
            for v in &summary.violations {
                writeln!(out, "  {}", v)?;
            }
        }
        if !summary.file_errors.is_empty() {
            writeln!(out, "{} file error(s):", summary.file_errors.len())?;
            for e in &summary.file_errors {
                writeln!(out, "  {}: {}", e.file, e.message)?;
            }
        }
    }

    for path in &report.artifacts {
        writeln!(out, "wrote {}", path.display())?;
    }
    writeln!(out, "status: {}", status_label(report.status()))?;
    Ok(())
}

/// Write a fatal error, with its exit code.
pub fn emit_error<W: Write>(err: &ErrorUtilError, out: &mut W) -> io::Result<()> {
    writeln!(out, "error: {} (exit {})", err, err.error_code())
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Clean => "clean",
        RunStatus::Violations => "violations",
        RunStatus::FileErrors => "file errors",
    }
}
