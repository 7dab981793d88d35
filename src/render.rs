//! Hugo page sink: renders the manifest as `index.md`.
//!
//! ## Output Format
//!
//! ```text
//! +++
//! title = "Summer"
//! date = "2024-05-01"
//! categories = ["photos"]
//! cover = "a.jpg"
//! +++
//!
//! {{< wrap >}}
//! {{< photo
//!     href="a.jpg" largeDim="1000x800"
//!     smallUrl="a_small.jpg" smallDim="800x640"
//!     thumbSize="256x256" thumbUrl="a_thm.jpg"
//!     title=""
//!     caption=""
//!     alt=""
//!     copyright="Jane Doe" >}}
//! {{< /wrap >}}
//! ```
//!
//! The `wrap` and `photo` shortcodes are provided by the site theme.
//!
//! Every interpolated string is written as a double-quoted literal with `\`
//! and `"` escaped, which is valid both in TOML basic strings and in Hugo
//! shortcode parameters.

use crate::gallery::Manifest;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the page written into the output directory.
pub const INDEX_FILENAME: &str = "index.md";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Render the full page text.
pub fn render_index(manifest: &Manifest) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_index_text(&mut out, manifest);
    out
}

fn write_index_text(out: &mut String, manifest: &Manifest) -> std::fmt::Result {
    let categories = manifest
        .categories
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ");

    writeln!(out, "+++")?;
    writeln!(out, "title = {}", quoted(&manifest.title))?;
    writeln!(out, "date = \"{}\"", manifest.date.format("%Y-%m-%d"))?;
    writeln!(out, "categories = [{categories}]")?;
    writeln!(out, "cover = {}", quoted(&manifest.cover))?;
    writeln!(out, "+++")?;
    writeln!(out)?;
    writeln!(out, "{{{{< wrap >}}}}")?;
    for e in &manifest.entries {
        writeln!(out, "{{{{< photo")?;
        writeln!(
            out,
            "    href={} largeDim=\"{}x{}\"",
            quoted(&e.filename),
            e.width,
            e.height
        )?;
        writeln!(
            out,
            "    smallUrl={} smallDim=\"{}x{}\"",
            quoted(&e.small),
            e.small_width,
            e.small_height
        )?;
        writeln!(
            out,
            "    thumbSize=\"{}x{}\" thumbUrl={}",
            e.thumbnail_width,
            e.thumbnail_height,
            quoted(&e.thumbnail)
        )?;
        writeln!(out, "    title=\"\"")?;
        writeln!(out, "    caption=\"\"")?;
        writeln!(out, "    alt=\"\"")?;
        writeln!(out, "    copyright={} >}}}}", quoted(&e.copyright))?;
    }
    writeln!(out, "{{{{< /wrap >}}}}")?;
    Ok(())
}

/// `value` as a double-quoted literal with `\` and `"` escaped.
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Write `index.md` into `output_dir`, replacing any previous page.
pub fn write_index(manifest: &Manifest, output_dir: &Path) -> Result<PathBuf, RenderError> {
    let path = output_dir.join(INDEX_FILENAME);
    fs::write(&path, render_index(manifest)).map_err(|source| RenderError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
