//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Progress
//!
//! One block per photo, printed as builds complete. The leading number is
//! the photo's position in traversal order, so blocks may arrive out of
//! order on a parallel run.
//!
//! ```text
//! Building 3 photos
//!     001 a.jpg
//!         Source: holiday/a.jpg
//!         full-size: linked
//!         small: encoded
//!         thumbnail: fresh
//!     002 bad.jpg
//!         Source: holiday/bad.jpg
//!         Failed: decode failed: ...
//! ```
//!
//! ## Summary
//!
//! ```text
//! Gallery: "Summer" → out/index.md
//!     Cover: a.jpg
//!     2 photos: 3 encoded, 1 fresh, 1 failed
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::builder::{Publish, VariantStatus};
use crate::pipeline::{PipelineEvent, RunResult};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(source_path: &str) -> String {
    Path::new(source_path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_path.to_string())
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single pipeline progress event as display lines.
pub fn format_pipeline_event(event: &PipelineEvent) -> Vec<String> {
    match event {
        PipelineEvent::Started { candidates } => {
            vec![format!("Building {} photos", candidates)]
        }
        PipelineEvent::ImageBuilt {
            index,
            source_path,
            publish,
            variants,
        } => {
            let mut lines = vec![
                format!(
                    "{}{} {}",
                    indent(1),
                    format_index(*index),
                    file_name(source_path)
                ),
                format!("{}Source: {}", indent(2), source_path),
            ];
            let publish_str = match publish {
                Publish::Linked => "linked",
                Publish::Copied => "copied",
                Publish::InPlace => "in place",
            };
            lines.push(format!("{}full-size: {}", indent(2), publish_str));
            for variant in variants {
                let status_str = match variant.status {
                    VariantStatus::Fresh => "fresh",
                    VariantStatus::Encoded => "encoded",
                    VariantStatus::CropUnsupported => "skipped (no crop fits)",
                };
                lines.push(format!(
                    "{}{}: {}",
                    indent(2),
                    variant.kind.label(),
                    status_str
                ));
            }
            lines
        }
        PipelineEvent::ImageFailed {
            index,
            source_path,
            error,
        } => vec![
            format!(
                "{}{} {}",
                indent(1),
                format_index(*index),
                file_name(source_path)
            ),
            format!("{}Source: {}", indent(2), source_path),
            format!("{}Failed: {}", indent(2), error),
        ],
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-run summary.
pub fn format_run_summary(result: &RunResult) -> Vec<String> {
    let header = if result.manifest.title.is_empty() {
        format!("Gallery \u{2192} {}", result.index_path.display())
    } else {
        format!(
            "Gallery: \"{}\" \u{2192} {}",
            result.manifest.title,
            result.index_path.display()
        )
    };
    vec![
        header,
        format!("{}Cover: {}", indent(1), result.manifest.cover),
        format!("{}{}", indent(1), result.stats),
    ]
}

pub fn print_run_summary(result: &RunResult) {
    for line in format_run_summary(result) {
        println!("{}", line);
    }
}
