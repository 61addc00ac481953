//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Per document
//!
//! ```text
//! ✔ report.pdf
//!     found=5, saved=3, dupes=1, filtered_small=1, filtered_dims=0, errors=0
//!     Archive: output/report.zip
//! ⚠ notes.txt
//!     Skipped: unsupported extension (.txt)
//! ✘ broken.pdf
//!     Failed: PDF error: invalid file header
//! ```
//!
//! ## Summary
//!
//! ```text
//! === SUMMARY ===
//! files=2, skipped=1, failed=1 | found=5, saved=3, dupes=1, filtered_small=1, filtered_dims=0, errors=0
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::extract::ExtractionStats;
use crate::pipeline::{BatchSummary, DocumentOutcome, DocumentReport};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// One-line rendering of the stats counters.
pub fn stats_line(stats: &ExtractionStats) -> String {
    format!(
        "found={}, saved={}, dupes={}, filtered_small={}, filtered_dims={}, errors={}",
        stats.found,
        stats.saved,
        stats.duplicates,
        stats.filtered_small,
        stats.filtered_dims,
        stats.errors
    )
}

// ============================================================================
// Documents
// ============================================================================

pub fn format_document_report(report: &DocumentReport) -> Vec<String> {
    match &report.outcome {
        DocumentOutcome::Processed { stats, archive } => {
            let mut lines = vec![
                format!("✔ {}", report.name),
                format!("{}{}", indent(1), stats_line(stats)),
            ];
            if let Some(archive) = archive {
                lines.push(format!("{}Archive: {}", indent(1), archive.display()));
            }
            lines
        }
        DocumentOutcome::Skipped { reason } => vec![
            format!("⚠ {}", report.name),
            format!("{}Skipped: {}", indent(1), reason),
        ],
        DocumentOutcome::Failed { message } => vec![
            format!("✘ {}", report.name),
            format!("{}Failed: {}", indent(1), message),
        ],
    }
}

pub fn print_document_report(report: &DocumentReport) {
    for line in format_document_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

pub fn format_summary(summary: &BatchSummary) -> Vec<String> {
    vec![
        "=== SUMMARY ===".to_string(),
        format!(
            "files={}, skipped={}, failed={} | {}",
            summary.files,
            summary.skipped,
            summary.failed,
            stats_line(&summary.total)
        ),
    ]
}

pub fn print_summary(summary: &BatchSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

pub fn format_empty_input(input_dir: &Path) -> String {
    format!("No .pdf or .docx files found in {}", input_dir.display())
}

// ============================================================================
// Tests
// ============================================================================
