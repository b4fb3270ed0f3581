//! Centralized filename conventions for the source tree.
//!
//! Directory and file names carry structural meaning:
//!
//! | Name                | Meaning                                             |
//! |---------------------|-----------------------------------------------------|
//! | `_page-1/`          | Canvas directory (one canvas of the parent manifest) |
//! | `+drafts/`, `!tmp/` | Excluded from traversal                             |
//! | `.git/`, `.DS_Store`| Hidden, never considered                            |
//! | `thumb.jpg`         | Explicit thumbnail for the enclosing node           |
//! | `info.yml`          | Descriptive metadata sidecar                        |
//! | `manifests.yml`     | Remote manifest references for a collection         |
//! | `*.yml` in `_x/`    | Custom annotation sidecar                           |
//!
//! ## Ordering
//!
//! Sibling entries are ordered with [`compare_natural`]: case-insensitive,
//! with runs of digits compared by numeric value, so `page2` sorts before
//! `page10`. Names that compare equal ignoring case fall back to a byte-wise
//! comparison so the order is total and stable across runs.

use std::cmp::Ordering;
use std::path::Path;

/// Prefix marking a directory as a canvas of its parent.
pub const CANVAS_PREFIX: char = '_';

/// Prefixes that exclude a directory from traversal entirely.
pub const EXCLUDED_PREFIXES: [char; 2] = ['+', '!'];

/// File stem of explicit thumbnails (`thumb.jpg`, `thumb.png`, ...).
pub const THUMBNAIL_STEM: &str = "thumb";

/// Name of every emitted document.
pub const DOCUMENT_NAME: &str = "index.json";

/// True for `_name` directories.
pub fn is_canvas_dir_name(name: &str) -> bool {
    name.starts_with(CANVAS_PREFIX)
}

/// True for `+name` and `!name` entries.
pub fn is_excluded_name(name: &str) -> bool {
    name.starts_with(EXCLUDED_PREFIXES)
}

/// True for dotfiles (`.DS_Store`, `.git`).
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// True for `thumb.<ext>` files.
pub fn is_thumbnail_name(name: &str) -> bool {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem == THUMBNAIL_STEM)
        && extension_of(name).is_some()
}

/// True for YAML sidecars (`*.yml`, `*.yaml`).
pub fn is_yaml_name(name: &str) -> bool {
    matches!(extension_of(name).as_deref(), Some("yml" | "yaml"))
}

/// Lowercased extension of a file name, URL, or free-form reference.
///
/// Query strings and fragments are ignored, and only the last path segment
/// is considered. An "extension" containing anything other than ASCII
/// letters and digits is not treated as one, so a sentence such as
/// `"Nice. Very nice"` yields `None`.
///
/// - `"page.JPG"` → `Some("jpg")`
/// - `"https://host/iiif/info.json"` → `Some("json")`
/// - `"clip.mp4#t=10"` → `Some("mp4")`
/// - `".hidden"` → `None`
/// - `"no-extension"` → `None`
pub fn extension_of(reference: &str) -> Option<String> {
    let without_fragment = reference.split(['#', '?']).next().unwrap_or(reference);
    let last_segment = without_fragment
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(without_fragment);
    let dot = last_segment.rfind('.')?;
    if dot == 0 {
        return None;
    }
    let ext = &last_segment[dot + 1..];
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// File name of a path as a `&str`, or an empty string for odd paths.
pub fn file_name_str(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// File stem of a path as a `&str`, or an empty string for odd paths.
pub fn file_stem_str(path: &Path) -> &str {
    path.file_stem().and_then(|n| n.to_str()).unwrap_or("")
}

/// Natural, case-insensitive ordering of two names.
///
/// Digit runs compare by numeric value (`"2" < "10"`, `"007" == "7"`), other
/// characters compare by their lowercase form. Ties are broken byte-wise.
pub fn compare_natural(a: &str, b: &str) -> Ordering {
    compare_ignoring_case(a, b).then_with(|| a.cmp(b))
}

/// Sort paths by their file names using [`compare_natural`].
pub fn sort_natural<P: AsRef<Path>>(paths: &mut [P]) {
    paths.sort_by(|a, b| compare_natural(file_name_str(a.as_ref()), file_name_str(b.as_ref())));
}

fn compare_ignoring_case(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let lhs = take_digits(&mut left);
                let rhs = take_digits(&mut right);
                let ord = compare_digit_runs(&lhs, &rhs);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
