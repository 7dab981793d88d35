//! Modification-time staleness checks for derivatives.
//!
//! A derivative is rebuilt when it is missing or strictly older than its
//! source. Anything newer or equal is left alone, which makes re-runs over an
//! unchanged tree write nothing and incremental runs touch only the photos
//! that changed.
//!
//! Any error reading the derivative's metadata (missing file, a concurrent
//! delete, permissions) counts as "needs regeneration"; the subsequent write
//! reports a real problem if there is one.

use std::path::Path;
use std::time::SystemTime;

/// Whether the derivative at `derivative` must be (re)generated.
pub fn needs_regeneration(derivative: &Path, source_modified: SystemTime) -> bool {
    match std::fs::metadata(derivative).and_then(|m| m.modified()) {
        Ok(modified) => modified < source_modified,
        Err(_) => true,
    }
}
