//! Source directory walk.
//!
//! Produces the ordered stream of `(path, modified)` pairs the pipeline
//! consumes. The walk is recursive, yields files only, and visits each
//! directory's entries in lexical filename order so traversal order (and with
//! it the gallery cover) is reproducible across runs and platforms.
//!
//! When the output directory lies inside the source tree it is pruned from
//! the walk, so published full-size copies are never picked up as new
//! sources. If the output directory *is* the source root nothing is pruned;
//! derivative suffixes keep generated files out in that case.
//!
//! Symbolic links are followed, so a linked photo or a linked directory of
//! photos is walked like a real one; link loops are reported by the walker
//! and skipped.
//!
//! Unreadable entries below the root are logged and skipped. Only a failure
//! to read the root itself is an error.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read source directory {path}: {source}")]
    Root {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// A file found by the walk.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Walk `root` and return every regular file in traversal order.
///
/// `exclude` names a directory to prune (typically the output directory).
pub fn scan(root: &Path, exclude: Option<&Path>) -> Result<Vec<SourceFile>, ScanError> {
    let excluded = exclude.and_then(|p| p.canonicalize().ok());
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded(entry, excluded.as_deref()));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(ScanError::Root {
                    path: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => files.push(SourceFile {
                path: entry.into_path(),
                modified,
            }),
            Ok(Err(e)) => warn!(path = %entry.path().display(), "no modification time: {e}"),
            Err(e) => warn!(path = %entry.path().display(), "cannot stat: {e}"),
        }
    }
    Ok(files)
}

fn is_excluded(entry: &walkdir::DirEntry, excluded: Option<&Path>) -> bool {
    let Some(excluded) = excluded else {
        return false;
    };
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let hit = entry
        .path()
        .canonicalize()
        .is_ok_and(|p| p == excluded);
    if hit {
        debug!(path = %entry.path().display(), "pruning output directory from walk");
    }
    hit
}
