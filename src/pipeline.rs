//! Whole-run orchestration.
//!
//! ```text
//! create output dir ─► scan ─► classify ─► dedupe names ─► build (rayon) ─► assemble ─► index.md
//! ```
//!
//! ## Failure policy
//!
//! | Failure | Effect |
//! |---|---|
//! | Output directory cannot be created | run fails |
//! | Source root unreadable | run fails |
//! | Decode / encode / IO for one photo | logged, photo left out, run continues |
//! | Thumbnail crop impossible | logged, small still produced, photo kept |
//! | No photo built | run fails, no `index.md` written |
//!
//! ## Ordering
//!
//! Candidates are built in parallel but collected by index, so manifest
//! order is traversal order no matter which worker finishes first. Progress
//! events are sent as builds complete and carry the traversal index.
//!
//! ## Name collisions
//!
//! The output directory is flat, so `2023/a.jpg` and `2024/a.jpg` would both
//! publish `a.jpg`. The first in traversal order wins; later ones are skipped
//! with a warning. Every artifact therefore has exactly one writer.
//!
//! One exception: when the output directory is inside the walk (output ==
//! source), a file sitting directly in it may be the full-size copy of a
//! nested photo published by an earlier run. If a nested photo claims the
//! same name, the nested one is the source and the copy is ignored.

use crate::builder::{
    BuildOutcome, BuildSettings, DerivativeBuilder, Publish, VariantInfo, VariantStatus,
};
use crate::config::GalleryConfig;
use crate::gallery::{GalleryError, Manifest, assemble};
use crate::imaging::{ImageBackend, RustBackend};
use crate::naming::{CandidateName, Classification, classify};
use crate::render::{self, RenderError};
use crate::scan::{self, ScanError, SourceFile};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not create output dir {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Progress reported while the run is in flight.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Sent once, after scanning and before any build starts.
    Started { candidates: usize },
    ImageBuilt {
        /// 1-based position in traversal order.
        index: usize,
        source_path: String,
        publish: Publish,
        variants: Vec<VariantInfo>,
    },
    ImageFailed {
        index: usize,
        source_path: String,
        error: String,
    },
}

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunStats {
    /// Photos that made it into the manifest.
    pub photos: u32,
    /// Derivatives resampled and written.
    pub encoded: u32,
    /// Derivatives left untouched because they were newer than the source.
    pub fresh: u32,
    /// Thumbnails not written because no crop fits.
    pub crop_unsupported: u32,
    /// Photos that failed to build.
    pub failed: u32,
    /// Candidates dropped because an earlier source claimed the same name.
    pub duplicates: u32,
    /// Walked files that are not source photos.
    pub ignored: u32,
}

impl RunStats {
    fn record(&mut self, outcome: &BuildOutcome) {
        self.photos += 1;
        for variant in &outcome.variants {
            match variant.status {
                VariantStatus::Encoded => self.encoded += 1,
                VariantStatus::Fresh => self.fresh += 1,
                VariantStatus::CropUnsupported => self.crop_unsupported += 1,
            }
        }
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} photo{}: {} encoded, {} fresh",
            self.photos,
            if self.photos == 1 { "" } else { "s" },
            self.encoded,
            self.fresh
        )?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.crop_unsupported > 0 {
            write!(f, ", {} without thumbnail", self.crop_unsupported)?;
        }
        if self.duplicates > 0 {
            write!(f, ", {} duplicate names skipped", self.duplicates)?;
        }
        if self.ignored > 0 {
            write!(f, ", {} other files ignored", self.ignored)?;
        }
        Ok(())
    }
}

/// Wall time spent building one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTiming {
    pub source: PathBuf,
    pub elapsed: Duration,
    pub succeeded: bool,
}

/// Everything a successful run produced.
#[derive(Debug)]
pub struct RunResult {
    pub manifest: Manifest,
    pub index_path: PathBuf,
    pub stats: RunStats,
    /// One per built candidate, traversal order.
    pub timings: Vec<ImageTiming>,
}

/// Run the pipeline with the production codec backend.
pub fn run(
    source_dir: &Path,
    output_dir: &Path,
    config: &GalleryConfig,
    date: NaiveDate,
    events: Option<Sender<PipelineEvent>>,
) -> Result<RunResult, PipelineError> {
    let backend = RustBackend::new();
    run_with_backend(&backend, source_dir, output_dir, config, date, events)
}

/// Run the pipeline using a specific backend (allows testing with mock).
pub fn run_with_backend(
    backend: &impl ImageBackend,
    source_dir: &Path,
    output_dir: &Path,
    config: &GalleryConfig,
    date: NaiveDate,
    events: Option<Sender<PipelineEvent>>,
) -> Result<RunResult, PipelineError> {
    std::fs::create_dir_all(output_dir).map_err(|source| PipelineError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let files = scan::scan(source_dir, Some(output_dir))?;
    let mut stats = RunStats::default();
    let candidates = select_candidates(files, output_dir, &mut stats);
    info!(
        source = %source_dir.display(),
        output = %output_dir.display(),
        candidates = candidates.len(),
        "building gallery"
    );
    if let Some(tx) = &events {
        tx.send(PipelineEvent::Started {
            candidates: candidates.len(),
        })
        .ok();
    }

    let settings = BuildSettings::from_config(config);
    let builder = DerivativeBuilder::new(backend, output_dir, &settings);

    let results: Vec<_> = candidates
        .par_iter()
        .enumerate()
        .map(|(i, (file, name))| {
            let started = Instant::now();
            let result = builder.build(&file.path, name, file.modified);
            let elapsed = started.elapsed();
            if let Some(tx) = &events {
                let source_path = file.path.display().to_string();
                let event = match &result {
                    Ok(outcome) => PipelineEvent::ImageBuilt {
                        index: i + 1,
                        source_path,
                        publish: outcome.publish,
                        variants: outcome.variants.clone(),
                    },
                    Err(e) => PipelineEvent::ImageFailed {
                        index: i + 1,
                        source_path,
                        error: e.to_string(),
                    },
                };
                tx.send(event).ok();
            }
            (result, elapsed)
        })
        .collect();

    let mut entries = Vec::with_capacity(results.len());
    let mut timings = Vec::with_capacity(results.len());
    for ((file, _), (result, elapsed)) in candidates.iter().zip(results) {
        timings.push(ImageTiming {
            source: file.path.clone(),
            elapsed,
            succeeded: result.is_ok(),
        });
        match result {
            Ok(outcome) => {
                stats.record(&outcome);
                entries.push(outcome.entry);
            }
            Err(e) => {
                warn!("skipping photo: {e}");
                stats.failed += 1;
            }
        }
    }

    let manifest = assemble(entries, &config.title, date)?;
    let index_path = render::write_index(&manifest, output_dir)?;
    info!(path = %index_path.display(), photos = manifest.entries.len(), "wrote manifest");

    Ok(RunResult {
        manifest,
        index_path,
        stats,
        timings,
    })
}

/// Classify walked files and drop any whose output names are already claimed.
fn select_candidates(
    files: Vec<SourceFile>,
    output_dir: &Path,
    stats: &mut RunStats,
) -> Vec<(SourceFile, CandidateName)> {
    let output_canonical = output_dir.canonicalize().ok();
    let in_output_dir = |file: &SourceFile| {
        file.path.parent().is_some_and(|parent| {
            parent == output_dir
                || output_canonical
                    .as_deref()
                    .is_some_and(|out| parent.canonicalize().is_ok_and(|p| p == out))
        })
    };

    let mut claimed: HashMap<String, usize> = HashMap::new();
    let mut slots: Vec<Option<(SourceFile, CandidateName)>> = Vec::new();
    for file in files {
        let name = match classify(&file.path) {
            Classification::Skip(reason) => {
                debug!(path = %file.path.display(), "ignored: {reason}");
                stats.ignored += 1;
                continue;
            }
            Classification::Candidate(name) => name,
        };
        let filename = name.filename();
        let held = claimed.get(&filename).copied();
        let Some(held) = held else {
            claimed.insert(filename, slots.len());
            slots.push(Some((file, name)));
            continue;
        };
        let held_is_copy = slots[held]
            .as_ref()
            .is_some_and(|(f, _)| in_output_dir(f));
        if held_is_copy && !in_output_dir(&file) {
            if let Some((copy, _)) = slots[held].take() {
                debug!(
                    path = %copy.path.display(),
                    source = %file.path.display(),
                    "ignored: published copy of a nested photo"
                );
            }
            stats.ignored += 1;
            claimed.insert(filename, slots.len());
            slots.push(Some((file, name)));
        } else {
            warn!(
                path = %file.path.display(),
                "skipping: an earlier photo already publishes {filename}"
            );
            stats.duplicates += 1;
        }
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{set_mtime, write_file};
    use std::fs;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn source_tree(files: &[(&str, &[u8])]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (name, bytes) in files {
            let path = tmp.path().join("src").join(name);
            write_file(&path, bytes);
            set_mtime(&path, 1_000);
        }
        tmp
    }

    fn filenames(result: &RunResult) -> Vec<&str> {
        result
            .manifest
            .entries
            .iter()
            .map(|e| e.filename.as_str())
            .collect()
    }

    // =========================================================================
    // Candidate selection
    // =========================================================================

    fn file(path: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(path),
            modified: std::time::SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn select_skips_non_photos_and_derivatives() {
        let mut stats = RunStats::default();
        let selected = select_candidates(
            vec![file("a.jpg"), file("notes.txt"), file("a_small.jpg"), file("b.png")],
            Path::new("out"),
            &mut stats,
        );
        let names: Vec<String> = selected.iter().map(|(_, n)| n.filename()).collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
        assert_eq!(stats.ignored, 2);
    }

    #[test]
    fn select_first_duplicate_wins() {
        let mut stats = RunStats::default();
        let selected = select_candidates(
            vec![file("2023/a.jpg"), file("2024/a.jpg"), file("2024/b.jpg")],
            Path::new("out"),
            &mut stats,
        );
        let paths: Vec<&Path> = selected.iter().map(|(f, _)| f.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("2023/a.jpg"), Path::new("2024/b.jpg")]);
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn select_prefers_nested_photo_over_its_published_copy() {
        let mut stats = RunStats::default();
        let selected = select_candidates(
            vec![
                file("photos/a.jpg"),
                file("photos/b.jpg"),
                file("photos/sub/a.jpg"),
                file("photos/sub/c.jpg"),
            ],
            Path::new("photos"),
            &mut stats,
        );
        let paths: Vec<&Path> = selected.iter().map(|(f, _)| f.path.as_path()).collect();
        assert_eq!(
            paths,
            vec![
                Path::new("photos/b.jpg"),
                Path::new("photos/sub/a.jpg"),
                Path::new("photos/sub/c.jpg"),
            ]
        );
        assert_eq!(stats.duplicates, 0);
        assert_eq!(stats.ignored, 1);
    }

    #[test]
    fn select_keeps_first_of_two_nested_duplicates_over_a_copy() {
        let mut stats = RunStats::default();
        let selected = select_candidates(
            vec![
                file("photos/a.jpg"),
                file("photos/2023/a.jpg"),
                file("photos/2024/a.jpg"),
            ],
            Path::new("photos"),
            &mut stats,
        );
        let paths: Vec<&Path> = selected.iter().map(|(f, _)| f.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("photos/2023/a.jpg")]);
        assert_eq!(stats.duplicates, 1);
    }

    // =========================================================================
    // Runs with mock backend
    // =========================================================================

    #[test]
    fn run_preserves_traversal_order_and_cover() {
        let tmp = source_tree(&[("c.jpg", b"x"), ("a.jpg", b"x"), ("b.jpg", b"x")]);
        let backend = MockBackend::new((1000, 800));
        let result = run_with_backend(
            &backend,
            &tmp.path().join("src"),
            &tmp.path().join("out"),
            &GalleryConfig::default(),
            date(),
            None,
        )
        .unwrap();

        assert_eq!(filenames(&result), vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(result.manifest.cover, "a.jpg");
        assert_eq!(result.index_path, tmp.path().join("out/index.md"));
        assert!(result.index_path.exists());
    }

    #[test]
    fn run_excludes_failed_photos() {
        let tmp = source_tree(&[("a.jpg", b"x"), ("bad.jpg", b"corrupt"), ("c.jpg", b"x")]);
        let backend = MockBackend::new((100, 100));
        let result = run_with_backend(
            &backend,
            &tmp.path().join("src"),
            &tmp.path().join("out"),
            &GalleryConfig::default(),
            date(),
            None,
        )
        .unwrap();

        assert_eq!(filenames(&result), vec!["a.jpg", "c.jpg"]);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.stats.photos, 2);
        assert_eq!(result.timings.len(), 3);
        assert!(!result.timings[1].succeeded);
    }

    #[test]
    fn run_with_no_photos_fails_without_manifest() {
        let tmp = source_tree(&[("notes.txt", b"x"), ("bad.jpg", b"corrupt")]);
        let backend = MockBackend::new((100, 100));
        let result = run_with_backend(
            &backend,
            &tmp.path().join("src"),
            &tmp.path().join("out"),
            &GalleryConfig::default(),
            date(),
            None,
        );

        assert!(matches!(
            result,
            Err(PipelineError::Gallery(GalleryError::Empty))
        ));
        assert!(!tmp.path().join("out/index.md").exists());
    }

    #[test]
    fn run_fails_when_output_dir_cannot_be_created() {
        let tmp = source_tree(&[("a.jpg", b"x")]);
        // A regular file where the output directory should go
        let blocker = tmp.path().join("out");
        fs::write(&blocker, b"file").unwrap();
        let backend = MockBackend::new((100, 100));

        let result = run_with_backend(
            &backend,
            &tmp.path().join("src"),
            &blocker.join("gallery"),
            &GalleryConfig::default(),
            date(),
            None,
        );

        assert!(matches!(result, Err(PipelineError::OutputDir { .. })));
    }

    #[test]
    fn run_sends_events() {
        let tmp = source_tree(&[("a.jpg", b"x"), ("bad.jpg", b"corrupt")]);
        let backend = MockBackend::new((100, 100));
        let (tx, rx) = std::sync::mpsc::channel();

        run_with_backend(
            &backend,
            &tmp.path().join("src"),
            &tmp.path().join("out"),
            &GalleryConfig::default(),
            date(),
            Some(tx),
        )
        .unwrap();

        let events: Vec<PipelineEvent> = rx.iter().collect();
        assert!(matches!(events[0], PipelineEvent::Started { candidates: 2 }));
        assert_eq!(events.len(), 3);
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::ImageBuilt { index: 1, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::ImageFailed { index: 2, .. }
        )));
    }

    #[test]
    fn run_uses_configured_title_and_sizes() {
        let tmp = source_tree(&[("a.jpg", b"x")]);
        let backend = MockBackend::new((1000, 800));
        let mut config = GalleryConfig::default();
        config.title = "Trip".into();
        config.thumbnail.width = 100;
        config.thumbnail.height = 50;

        let result = run_with_backend(
            &backend,
            &tmp.path().join("src"),
            &tmp.path().join("out"),
            &config,
            date(),
            None,
        )
        .unwrap();

        assert_eq!(result.manifest.title, "Trip");
        let entry = &result.manifest.entries[0];
        assert_eq!((entry.thumbnail_width, entry.thumbnail_height), (100, 50));
    }

    #[test]
    fn output_inside_source_not_rescanned() {
        let tmp = source_tree(&[("a.jpg", b"x")]);
        let src = tmp.path().join("src");
        let out = src.join("gallery");
        let backend = MockBackend::new((100, 100));

        for _ in 0..2 {
            let result = run_with_backend(
                &backend,
                &src,
                &out,
                &GalleryConfig::default(),
                date(),
                None,
            )
            .unwrap();
            assert_eq!(filenames(&result), vec!["a.jpg"]);
            assert_eq!(result.stats.duplicates, 0);
        }
    }

    // =========================================================================
    // RunStats
    // =========================================================================

    #[test]
    fn stats_display_minimal() {
        let stats = RunStats {
            photos: 3,
            encoded: 6,
            ..Default::default()
        };
        assert_eq!(stats.to_string(), "3 photos: 6 encoded, 0 fresh");
    }

    #[test]
    fn stats_display_with_problems() {
        let stats = RunStats {
            photos: 2,
            encoded: 1,
            fresh: 2,
            crop_unsupported: 1,
            failed: 1,
            duplicates: 1,
            ignored: 4,
        };
        assert_eq!(
            stats.to_string(),
            "2 photos: 1 encoded, 2 fresh, 1 failed, 1 without thumbnail, \
             1 duplicate names skipped, 4 other files ignored"
        );
    }
}
