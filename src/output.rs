//! CLI output formatting for export runs.
//!
//! # Information-First Display
//!
//! Every record is shown by its position and display name, the way the roster
//! lists it. Files and failure reasons follow as indented context lines, so
//! the output reads as a checklist of people rather than a list of paths.
//!
//! # Output Format
//!
//! ## Export
//!
//! ```text
//! Exporting 3 cards
//! [001/003] Ann Lee
//!     3 files
//! [002/003] Bo Chen
//!     1 file
//!     skipped: back face missing
//! [003/003] Cy Diaz
//!     failed: front face failed: Photo photos/cy.jpg: No such file
//! Archiving 4 files
//! Exported 2 of 3 cards
//! ```
//!
//! ## Report
//!
//! ```text
//! Archive: dist/TOMO_Academy_ID_Cards.zip
//! SHA-256: 9f2c...
//!
//! Failures (2)
//! 002 Bo Chen [missing_face]
//!     back face missing
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 Ann Lee → Ann_Lee_E1
//!     front: ready
//!     back: ready
//! 002 Bo Chen → Bo_Chen_E2
//!     front: ready
//!     back: missing
//!
//! 1 of 2 cards ready
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::batch::{BatchReport, ExportEvent, FaceCheck, RecordCheck, SheetReport};
use crate::pipeline::RecordStatus;
use crate::summary::FailureSummary;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Export progress
// ============================================================================

/// Format a single export progress event as display lines.
pub fn format_export_event(event: &ExportEvent) -> Vec<String> {
    match event {
        ExportEvent::Started { total } => {
            vec![format!("Exporting {}", plural(*total, "card", "cards"))]
        }
        ExportEvent::RecordStarted { index, total, name } => {
            vec![format!(
                "[{}/{}] {}",
                format_index(*index),
                format_index(*total),
                name
            )]
        }
        ExportEvent::RecordFinished {
            status,
            entries,
            failures,
            ..
        } => {
            let mut lines = Vec::new();
            let label = match status {
                RecordStatus::Failed => "failed",
                RecordStatus::Complete | RecordStatus::Partial => "skipped",
            };
            if *status != RecordStatus::Failed {
                lines.push(format!("{}{}", indent(1), plural(*entries, "file", "files")));
            }
            for reason in failures {
                lines.push(format!("{}{}: {}", indent(1), label, reason));
            }
            lines
        }
        ExportEvent::Archiving { entries } => {
            vec![format!("Archiving {}", plural(*entries, "file", "files"))]
        }
        ExportEvent::Cancelled { completed, total } => {
            vec![format!("Cancelled after {} of {} cards", completed, total)]
        }
        ExportEvent::Finished { exported, total } => {
            vec![format!("Exported {} of {} cards", exported, total)]
        }
    }
}

// ============================================================================
// Terminal reports
// ============================================================================

fn format_failures(failures: &[FailureSummary]) -> Vec<String> {
    let mut lines = Vec::new();
    if failures.is_empty() {
        return lines;
    }
    lines.push(String::new());
    lines.push(format!("Failures ({})", failures.len()));
    let mut last_record: Option<&str> = None;
    let mut position = 0;
    for failure in failures {
        if last_record != Some(failure.record_id.as_str()) {
            position += 1;
            last_record = Some(failure.record_id.as_str());
        }
        lines.push(format!(
            "{} {} [{}]",
            format_index(position),
            failure.name,
            failure.stage
        ));
        lines.push(format!("{}{}", indent(1), failure.reason));
    }
    lines
}

/// Format the terminal success report of an export.
pub fn format_report(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::new();
    match &report.archive_sha256 {
        Some(sha) => {
            lines.push(format!("Archive: {}", report.delivered.display()));
            lines.push(format!("SHA-256: {}", sha));
        }
        None => lines.push(format!("Output: {}", report.delivered.display())),
    }
    lines.extend(format_failures(&report.failures));
    lines
}

/// Format the terminal success report of a combined sheet.
pub fn format_sheet_report(report: &SheetReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Sheet: {} ({}, {})",
        report.delivered.display(),
        plural(report.exported, "card", "cards"),
        plural(report.pages, "page", "pages")
    )];
    lines.extend(format_failures(&report.failures));
    lines
}

/// Print the export report to stdout.
pub fn print_report(report: &BatchReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

pub fn print_sheet_report(report: &SheetReport) {
    for line in format_sheet_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

fn face_status(check: &FaceCheck) -> String {
    match check {
        FaceCheck::Ready => "ready".to_string(),
        FaceCheck::Missing => "missing".to_string(),
        FaceCheck::Error(e) => format!("error: {}", e),
    }
}

/// Format staging results for every record.
pub fn format_check(checks: &[RecordCheck]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, check) in checks.iter().enumerate() {
        lines.push(format!(
            "{} {} \u{2192} {}",
            format_index(i + 1),
            check.name,
            check.stem
        ));
        lines.push(format!("{}front: {}", indent(1), face_status(&check.front)));
        lines.push(format!("{}back: {}", indent(1), face_status(&check.back)));
    }
    let ready = checks.iter().filter(|c| c.is_ready()).count();
    lines.push(String::new());
    lines.push(format!("{} of {} cards ready", ready, checks.len()));
    lines
}

pub fn print_check(checks: &[RecordCheck]) {
    for line in format_check(checks) {
        println!("{}", line);
    }
}
