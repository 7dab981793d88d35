//! # hugopix
//!
//! Turns a directory of photographs into the assets of a Hugo photo gallery:
//! a full-size copy, a bounded-size "small" and a content-aware cropped
//! thumbnail per photo, plus an `index.md` page that lists them.
//!
//! # Architecture: Incremental Derivative Pipeline
//!
//! ```text
//! scan        source/  →  (path, mtime) in traversal order
//! classify    path     →  candidate base name, or skip (non-photo / derivative)
//! build       photo    →  full-size + _small + _thm (each only if stale)
//! assemble    entries  →  manifest (cover = first entry)
//! render      manifest →  output/index.md
//! ```
//!
//! Re-running over an unchanged tree writes no derivatives and produces the
//! same page; touching one photo rebuilds only that photo's derivatives.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the source directory in lexical order, pruning the output directory |
//! | [`naming`] | Output filenames (`_small`, `_thm`) and derivative self-exclusion |
//! | [`freshness`] | mtime comparison deciding whether a derivative is rebuilt |
//! | [`imaging`] | Codec backend trait, dimension math, content-aware crop search |
//! | [`builder`] | Per-photo decode → publish → small → thumbnail |
//! | [`gallery`] | Ordered manifest assembly and cover selection |
//! | [`render`] | Hugo `index.md` sink (front matter + `photo` shortcodes) |
//! | [`pipeline`] | Whole-run orchestration, parallel builds, progress events, stats |
//! | [`config`] | `hugopix.toml` loading, merging, validation, CLI overrides |
//! | [`output`] | CLI output formatting |
//! | [`profile`] | `--cpuprofile` timing report |
//!
//! # Design Decisions
//!
//! ## Freshness by Modification Time
//!
//! A derivative is rebuilt only when missing or strictly older than its
//! source. There is no cache database to get out of sync: the output
//! directory itself is the state.
//!
//! ## Derivatives Keep the Source Format
//!
//! JPEG sources produce JPEG derivatives and PNG sources PNG ones, so
//! transparency survives and the extension always matches the content.
//!
//! ## Saliency-Scored Crops
//!
//! Thumbnails are cut from the window that maximises edge detail and skin
//! tones while avoiding blown-out or crushed regions, with a slight pull
//! toward the center. The weights live in `[crop]` config so unusual
//! collections can be tuned without code changes.

pub mod builder;
pub mod config;
pub mod freshness;
pub mod gallery;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod render;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
