//! Output filename derivation for source photos.
//!
//! Every source photo produces three files in the flat output directory:
//!
//! ```text
//! dawn.jpg          → dawn.jpg         (full-size copy)
//!                   → dawn_small.jpg   (bounded-size derivative)
//!                   → dawn_thm.jpg     (cropped thumbnail)
//! ```
//!
//! The suffix is inserted before the extension and the extension keeps its
//! original case, so distinct base names always give distinct derivative names.
//!
//! ## Self-exclusion
//!
//! When the output directory overlaps the source tree, earlier derivatives
//! show up in the walk. Any file whose stem already ends in a derivative
//! suffix is skipped, so `dawn_small.jpg` never becomes `dawn_small_small.jpg`.

use std::path::Path;

/// Extensions accepted as source photos (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// The two derivative roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivativeKind {
    Small,
    Thumbnail,
}

impl DerivativeKind {
    pub const ALL: [DerivativeKind; 2] = [DerivativeKind::Small, DerivativeKind::Thumbnail];

    /// Marker inserted between the base name and the extension.
    pub fn suffix(self) -> &'static str {
        match self {
            DerivativeKind::Small => "_small",
            DerivativeKind::Thumbnail => "_thm",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DerivativeKind::Small => "small",
            DerivativeKind::Thumbnail => "thumbnail",
        }
    }
}

/// Why a path was not treated as a source photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoExtension,
    UnsupportedExtension,
    /// Filename is not valid UTF-8 and cannot appear in the manifest.
    NonUtf8,
    /// Filename already carries a derivative suffix.
    Derivative(DerivativeKind),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoExtension => write!(f, "no extension"),
            SkipReason::UnsupportedExtension => write!(f, "not a supported image extension"),
            SkipReason::NonUtf8 => write!(f, "filename is not UTF-8"),
            SkipReason::Derivative(kind) => write!(f, "already a {} derivative", kind.label()),
        }
    }
}

/// A source photo's base name and extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateName {
    /// Filename without the extension, e.g. `dawn`.
    pub base: String,
    /// Extension without the dot, original case, e.g. `JPG`.
    pub extension: String,
}

impl CandidateName {
    /// Filename of the full-size copy, e.g. `dawn.jpg`.
    pub fn filename(&self) -> String {
        format!("{}.{}", self.base, self.extension)
    }

    /// Filename of a derivative, e.g. `dawn_thm.jpg`.
    pub fn derivative(&self, kind: DerivativeKind) -> String {
        format!("{}{}.{}", self.base, kind.suffix(), self.extension)
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Skip(SkipReason),
    Candidate(CandidateName),
}

/// Decide whether `path` is a source photo and, if so, split its filename.
pub fn classify(path: &Path) -> Classification {
    let Some(name) = path.file_name() else {
        return Classification::Skip(SkipReason::NoExtension);
    };
    let Some(name) = name.to_str() else {
        return Classification::Skip(SkipReason::NonUtf8);
    };
    let Some((base, extension)) = name.rsplit_once('.') else {
        return Classification::Skip(SkipReason::NoExtension);
    };
    if base.is_empty() {
        // Dotfiles like `.jpg` have no base name to build on
        return Classification::Skip(SkipReason::NoExtension);
    }
    if !IMAGE_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
    {
        return Classification::Skip(SkipReason::UnsupportedExtension);
    }
    if let Some(kind) = derivative_marker(base) {
        return Classification::Skip(SkipReason::Derivative(kind));
    }
    Classification::Candidate(CandidateName {
        base: base.to_string(),
        extension: extension.to_string(),
    })
}

fn derivative_marker(base: &str) -> Option<DerivativeKind> {
    let lower = base.to_ascii_lowercase();
    DerivativeKind::ALL
        .into_iter()
        .find(|kind| lower.ends_with(kind.suffix()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn candidate(path: &str) -> CandidateName {
        match classify(Path::new(path)) {
            Classification::Candidate(c) => c,
            other => panic!("expected candidate for {path}, got {other:?}"),
        }
    }

    fn skip_reason(path: &str) -> SkipReason {
        match classify(Path::new(path)) {
            Classification::Skip(reason) => reason,
            other => panic!("expected skip for {path}, got {other:?}"),
        }
    }

    #[test]
    fn jpeg_candidate_splits_base_and_extension() {
        let c = candidate("photos/foo.jpg");
        assert_eq!(c.base, "foo");
        assert_eq!(c.extension, "jpg");
        assert_eq!(c.filename(), "foo.jpg");
        assert_eq!(c.derivative(DerivativeKind::Small), "foo_small.jpg");
        assert_eq!(c.derivative(DerivativeKind::Thumbnail), "foo_thm.jpg");
    }

    #[test]
    fn extension_match_is_case_insensitive_and_preserved() {
        let c = candidate("IMG_0001.JPEG");
        assert_eq!(c.derivative(DerivativeKind::Small), "IMG_0001_small.JPEG");
        assert_eq!(candidate("x.Png").extension, "Png");
    }

    #[test]
    fn dots_in_base_name_are_kept() {
        let c = candidate("2024.05.01.beach.png");
        assert_eq!(c.base, "2024.05.01.beach");
        assert_eq!(c.derivative(DerivativeKind::Thumbnail), "2024.05.01.beach_thm.png");
    }

    #[test]
    fn non_image_extensions_skipped() {
        assert_eq!(skip_reason("notes.txt"), SkipReason::UnsupportedExtension);
        assert_eq!(skip_reason("index.md"), SkipReason::UnsupportedExtension);
        assert_eq!(skip_reason("raw.cr2"), SkipReason::UnsupportedExtension);
    }

    #[test]
    fn missing_extension_skipped() {
        assert_eq!(skip_reason("README"), SkipReason::NoExtension);
        assert_eq!(skip_reason(".jpg"), SkipReason::NoExtension);
    }

    #[test]
    fn derivatives_are_never_candidates() {
        assert_eq!(
            skip_reason("out/foo_small.jpg"),
            SkipReason::Derivative(DerivativeKind::Small)
        );
        assert_eq!(
            skip_reason("foo_thm.PNG"),
            SkipReason::Derivative(DerivativeKind::Thumbnail)
        );
        assert_eq!(
            skip_reason("FOO_THM.jpg"),
            SkipReason::Derivative(DerivativeKind::Thumbnail)
        );
    }

    #[test]
    fn marker_inside_name_is_not_a_derivative() {
        // Only a trailing marker identifies generated files
        assert_eq!(candidate("my_small_dog.jpg").base, "my_small_dog");
        assert_eq!(candidate("_thm_x.jpg").base, "_thm_x");
    }

    #[test]
    fn derived_names_classify_as_derivatives() {
        for name in ["a.jpg", "b.JPEG", "holiday.2019.png"] {
            let c = candidate(name);
            for kind in DerivativeKind::ALL {
                let derived = PathBuf::from(c.derivative(kind));
                assert_eq!(
                    classify(&derived),
                    Classification::Skip(SkipReason::Derivative(kind)),
                    "{derived:?}"
                );
            }
        }
    }

    #[test]
    fn derived_names_are_pairwise_distinct() {
        let sources = [
            "a.jpg", "b.jpg", "a.png", "a_b.jpg", "ab.jpg", "a.b.jpg", "A1.jpeg", "thm.jpg",
            "small.jpg",
        ];
        let mut outputs = HashSet::new();
        for source in sources {
            let c = candidate(source);
            assert!(outputs.insert(c.filename()), "{source} full-size collides");
            for kind in DerivativeKind::ALL {
                assert!(
                    outputs.insert(c.derivative(kind)),
                    "{source} {} collides",
                    kind.label()
                );
            }
        }
        assert_eq!(outputs.len(), sources.len() * 3);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_filename_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let path = Path::new(OsStr::from_bytes(b"caf\xe9.jpg"));
        assert_eq!(classify(path), Classification::Skip(SkipReason::NonUtf8));
    }
}
