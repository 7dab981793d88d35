//! Run-level timing report (`--cpuprofile`).
//!
//! A single [`RunProfile`] is started before the pipeline and finished after
//! it, so it brackets the whole run rather than individual workers. The
//! report is JSON:
//!
//! ```json
//! {
//!   "total_ms": 1234.5,
//!   "threads": 8,
//!   "images": [
//!     { "source": "a.jpg", "ms": 310.2, "succeeded": true }
//!   ],
//!   "stats": { "photos": 1, "encoded": 2, "fresh": 0, ... }
//! }
//! ```
//!
//! Per-image times are summed wall time inside workers, so their total can
//! exceed `total_ms` on a parallel run.

use crate::pipeline::{ImageTiming, RunStats};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("could not write profile {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    total_ms: f64,
    threads: usize,
    images: Vec<ImageReport>,
    stats: &'a RunStats,
}

#[derive(Debug, Serialize)]
struct ImageReport {
    source: String,
    ms: f64,
    succeeded: bool,
}

/// Open timing bracket around one run.
#[derive(Debug)]
pub struct RunProfile {
    path: PathBuf,
    started: Instant,
}

impl RunProfile {
    pub fn start(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            started: Instant::now(),
        }
    }

    /// Close the bracket and write the report.
    pub fn finish(
        self,
        threads: usize,
        timings: &[ImageTiming],
        stats: &RunStats,
    ) -> Result<PathBuf, ProfileError> {
        let json = self.report_json(threads, timings, stats)?;
        fs::write(&self.path, json).map_err(|source| ProfileError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.path)
    }

    fn report_json(
        &self,
        threads: usize,
        timings: &[ImageTiming],
        stats: &RunStats,
    ) -> Result<String, serde_json::Error> {
        let report = Report {
            total_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            threads,
            images: timings
                .iter()
                .map(|t| ImageReport {
                    source: t.source.display().to_string(),
                    ms: t.elapsed.as_secs_f64() * 1000.0,
                    succeeded: t.succeeded,
                })
                .collect(),
            stats,
        };
        serde_json::to_string_pretty(&report)
    }
}
