//! Identifier resolution: from filesystem paths to published URLs.
//!
//! Every node is published under a URL derived from the base URL the build
//! was started with. Most ids are built by appending segments to a parent
//! URL ([`join_segment`], [`document_id`], [`canvas_id`]). Files that must
//! be referenced from anywhere in the tree (thumbnails) go through a
//! two-step resolution instead:
//!
//! 1. **Virtual path substitution.** The real names of the directories from
//!    the root down to the current node are replaced with their virtual
//!    (published) names, keeping the tail of the path untouched. The chain
//!    of directories is a [`Lineage`]: a stack-allocated list of frames
//!    that each borrow their parent.
//! 2. **Path merge.** The virtual path is overlaid onto the node's URL
//!    ([`merge_paths`]): the path is scanned backwards for the URL's last
//!    segment, and everything after that anchor is appended to the URL.
//!
//! ```text
//! url   http://host/a/b
//! path  /data/a/b/_c/thumb.jpg
//!                 ^ anchor "b"
//! id    http://host/a/b/_c/thumb.jpg
//! ```

use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum IdentifierError {
    #[error("invalid URL `{url}`: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("URL `{0}` cannot carry path segments")]
    CannotBeABase(String),
}

/// Parse the base URL of a build.
pub fn parse_base(url: &str) -> Result<Url, IdentifierError> {
    let parsed = Url::parse(url).map_err(|source| IdentifierError::Parse {
        url: url.to_string(),
        source,
    })?;
    if parsed.cannot_be_a_base() {
        return Err(IdentifierError::CannotBeABase(url.to_string()));
    }
    Ok(parsed)
}

/// Append one path segment to a URL, percent-encoding as needed.
///
/// A trailing slash on the parent is absorbed: `http://h/a/` + `b` is
/// `http://h/a/b`.
pub fn join_segment(url: &Url, segment: &str) -> Result<Url, IdentifierError> {
    let mut joined = url.clone();
    joined
        .path_segments_mut()
        .map_err(|_| IdentifierError::CannotBeABase(url.to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(joined)
}

/// Last non-empty, percent-decoded path segment of a URL.
///
/// The binary uses it as the root's published name when none is given, so
/// the path merge always finds its anchor.
pub fn last_segment(url: &Url) -> Option<String> {
    url_parts(url).pop()
}

/// Id of the document published for a node: `<url>/index.json`.
pub fn document_id(url: &Url) -> String {
    format!(
        "{}/{}",
        url.as_str().trim_end_matches('/'),
        crate::naming::DOCUMENT_NAME
    )
}

/// `<document id>/canvas/<index>`.
pub fn canvas_id(document_id: &str, index: usize) -> String {
    format!("{document_id}/canvas/{index}")
}

/// `<canvas id>/annotation/<index>`.
pub fn annotation_id(canvas_id: &str, index: usize) -> String {
    format!("{canvas_id}/annotation/{index}")
}

/// `<canvas id>/annotationpage/0`.
pub fn annotation_page_id(canvas_id: &str) -> String {
    format!("{canvas_id}/annotationpage/0")
}

/// Synthetic body id for an annotation with no resolvable resource:
/// `<canvas id>/annotations/<sidecar name>`.
pub fn synthetic_body_id(canvas_id: &str, name: &str) -> String {
    format!("{canvas_id}/annotations/{name}")
}

/// Whether a sidecar value is already an absolute URL.
pub fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| url.has_host())
}

/// Resolve a sidecar value relative to the canvas directory URL.
///
/// Absolute URLs are returned verbatim. Relative references resolve as a
/// browser would against `<canvas url>/`, so `cover.jpg` lands inside the
/// canvas directory and `../shared/cover.jpg` next to it.
pub fn resolve_reference(canvas_url: &Url, value: &str) -> Result<String, IdentifierError> {
    if is_absolute_url(value) {
        return Ok(value.to_string());
    }
    let mut base = canvas_url.clone();
    base.path_segments_mut()
        .map_err(|_| IdentifierError::CannotBeABase(canvas_url.to_string()))?
        .pop_if_empty()
        .push("");
    base.join(value)
        .map(String::from)
        .map_err(|source| IdentifierError::Parse {
            url: value.to_string(),
            source,
        })
}

/// Everything before the last `/` of an id, used for image service ids.
pub fn strip_last_segment(id: &str) -> &str {
    let without_fragment = id.split('#').next().unwrap_or(id);
    match without_fragment.rfind('/') {
        Some(pos) => &without_fragment[..pos],
        None => without_fragment,
    }
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// =============================================================================
// Virtual paths
// =============================================================================

/// One directory in the chain from the build root to the current node.
///
/// Frames live on the stack of the recursive walk; each borrows its parent,
/// so the chain is always valid while a node is being built.
#[derive(Debug, Clone, Copy)]
pub struct Lineage<'a> {
    pub path: &'a Path,
    /// Published name; defaults to the real directory name.
    pub virtual_name: Option<&'a str>,
    pub parent: Option<&'a Lineage<'a>>,
}

impl<'a> Lineage<'a> {
    pub fn root(path: &'a Path, virtual_name: Option<&'a str>) -> Self {
        Self {
            path,
            virtual_name,
            parent: None,
        }
    }

    pub fn child(&'a self, path: &'a Path) -> Lineage<'a> {
        Lineage {
            path,
            virtual_name: None,
            parent: Some(self),
        }
    }

    fn real_name(&self) -> &'a str {
        crate::naming::file_name_str(self.path)
    }

    fn published_name(&self) -> &'a str {
        self.virtual_name.unwrap_or_else(|| self.real_name())
    }

    /// Published names from the root down to this frame.
    pub fn published_names(&self) -> Vec<&'a str> {
        let mut names = Vec::new();
        let mut frame = Some(self);
        while let Some(current) = frame {
            names.push(current.published_name());
            frame = current.parent;
        }
        names.reverse();
        names
    }
}

/// Substitute virtual names into a path beneath the lineage's directory.
///
/// The `depth` directory names ending at `lineage.path` are replaced by the
/// published names of the chain; whatever lies below `lineage.path` is kept.
/// Paths outside the lineage are returned unchanged. Separators are
/// normalized to `/`.
pub fn virtual_file_path(file: &Path, lineage: &Lineage<'_>) -> String {
    let Ok(tail) = file.strip_prefix(lineage.path) else {
        return to_slash(file);
    };
    let published = lineage.published_names();
    let keep = lineage
        .path
        .components()
        .count()
        .saturating_sub(published.len());

    let mut parts: Vec<String> = lineage
        .path
        .components()
        .take(keep)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.extend(published.iter().map(|name| name.to_string()));
    parts.extend(
        tail.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    join_slash(&parts)
}

fn to_slash(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    join_slash(&parts)
}

fn join_slash(parts: &[String]) -> String {
    let mut out = String::new();
    for part in parts {
        if part == "/" || part == "\\" {
            out.push('/');
            continue;
        }
        if !out.is_empty() && !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

// =============================================================================
// Path merge
// =============================================================================

fn url_parts(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

/// Overlay a (virtual) filesystem path onto a URL.
///
/// The path is scanned backwards for the URL's last segment. Once found,
/// the merged path is the URL's segments followed by the path's segments
/// after the anchor. Two degenerate shapes are handled explicitly:
///
/// - a URL with a single segment that never occurs in the path yields
///   `<origin>/<segment>/<file name>`;
/// - a URL with no path, or whose last segment is absent from a multi-part
///   path, yields the URL plus the file name.
pub fn merge_paths(url: &Url, file_path: &str) -> String {
    let url_parts = url_parts(url);
    let file_parts: Vec<&str> = file_path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();
    let file_name = file_parts.last().copied().unwrap_or_default();

    let merged: Vec<&str> = match url_parts.last() {
        None => vec![file_name],
        Some(anchor) => match file_parts.iter().rposition(|part| *part == anchor.as_str()) {
            Some(pos) => url_parts
                .iter()
                .map(String::as_str)
                .chain(file_parts[pos + 1..].iter().copied())
                .collect(),
            None => url_parts
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(file_name))
                .collect(),
        },
    };

    let mut out = url.clone();
    out.set_query(None);
    out.set_fragment(None);
    match out.path_segments_mut() {
        Ok(mut segments) => {
            segments.clear().extend(merged.iter().filter(|s| !s.is_empty()));
        }
        Err(()) => return format!("{}/{}", url.as_str().trim_end_matches('/'), merged.join("/")),
    }
    out.into()
}

/// Published id of a file: virtual substitution, then merge onto `url`.
pub fn file_id(url: &Url, file: &Path, lineage: &Lineage<'_>) -> String {
    merge_paths(url, &virtual_file_path(file, lineage))
}
