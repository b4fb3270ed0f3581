//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every node is shown by its semantic identity (positional index + label),
//! with the document it produced as secondary context. Paths are relative to
//! the build root so the summary reads as a content inventory.
//!
//! # Output Format
//!
//! ```text
//! Collection Archive → index.json
//! 001 Herbarium (Manifest, 2 canvases) → book/index.json
//!     001 Title page (1200×800)
//!         Source: book/_page-1/
//!     002 Audio guide (31.5s)
//!         Source: book/_page-2/
//! 002 Elsewhere (remote Manifest) → https://example.org/iiif/m1/manifest.json
//!
//! Wrote 2 documents: 1 collection, 1 manifest, 2 canvases
//! ```
//!
//! Advisories are listed after the tree, one per line, grouped by kind:
//!
//! ```text
//! Advisories (2)
//!     missing content: manifest has no canvases (empty)
//!     probe failure: cannot read image dimensions (book/_page-1/page.jpg)
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::advisory::Advisory;
use crate::canvas::{CanvasNode, CanvasSource};
use crate::walk::{DirectoryNode, NodeKind};
use std::path::Path;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    match (n, word.ends_with('s')) {
        (1, _) => format!("{n} {word}"),
        (_, true) => format!("{n} {word}es"),
        (_, false) => format!("{n} {word}s"),
    }
}

/// Path relative to the build root, `/`-separated, with a trailing slash
/// for directories.
fn relative(path: &Path, root: &Path, is_dir: bool) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut text = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if is_dir && !text.is_empty() {
        text.push('/');
    }
    text
}

/// Extent detail for a canvas line: `(1200×800)`, `(31.5s)`, or both.
fn extent(canvas: &CanvasNode) -> Option<String> {
    let mut parts = Vec::new();
    if let (Some(w), Some(h)) = (canvas.width, canvas.height) {
        parts.push(format!("{w}×{h}"));
    }
    if let Some(d) = canvas.duration {
        parts.push(format!("{d}s"));
    }
    (!parts.is_empty()).then(|| format!("({})", parts.join(", ")))
}

// ============================================================================
// Build summary
// ============================================================================

#[derive(Debug, Default, PartialEq, Eq)]
struct Totals {
    collections: usize,
    manifests: usize,
    canvases: usize,
}

fn tally(node: &DirectoryNode, totals: &mut Totals) {
    match node.kind {
        NodeKind::Collection => totals.collections += 1,
        NodeKind::Manifest => totals.manifests += 1,
    }
    totals.canvases += node.canvases.len();
    for child in &node.children {
        tally(child, totals);
    }
}

fn format_node(
    node: &DirectoryNode,
    root: &Path,
    index: usize,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let document = relative(&node.document_path, root, false);
    let detail = match node.kind {
        NodeKind::Collection => format!(
            "Collection, {}",
            plural(node.children.len() + node.remote_manifests.len(), "item")
        ),
        NodeKind::Manifest => format!("Manifest, {}", plural(node.canvases.len(), "canvas")),
    };
    lines.push(format!(
        "{}{} {} ({}) → {}",
        indent(depth),
        format_index(index),
        node.label,
        detail,
        document
    ));
    format_contents(node, root, depth + 1, lines);
}

fn format_contents(node: &DirectoryNode, root: &Path, depth: usize, lines: &mut Vec<String>) {
    for (i, canvas) in node.canvases.iter().enumerate() {
        let header = match extent(canvas) {
            Some(detail) => format!("{} {} {}", format_index(i + 1), canvas.label, detail),
            None => format!("{} {}", format_index(i + 1), canvas.label),
        };
        lines.push(format!("{}{}", indent(depth), header));
        let is_dir = matches!(canvas.source, CanvasSource::Directory(_));
        lines.push(format!(
            "{}Source: {}",
            indent(depth + 1),
            relative(canvas.source.path(), root, is_dir)
        ));
    }
    for (i, child) in node.children.iter().enumerate() {
        format_node(child, root, i + 1, depth, lines);
    }
    let offset = node.children.len();
    for (i, remote) in node.remote_manifests.iter().enumerate() {
        lines.push(format!(
            "{}{} {} (remote Manifest) → {}",
            indent(depth),
            format_index(offset + i + 1),
            remote.display_label(),
            remote.id
        ));
    }
}

/// Format the tree of a finished build.
pub fn format_build_summary(node: &DirectoryNode, root: &Path) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {} → {}",
        node.kind.as_str(),
        node.label,
        relative(&node.document_path, root, false)
    )];
    format_contents(node, root, 0, &mut lines);

    let mut totals = Totals::default();
    tally(node, &mut totals);
    lines.push(String::new());
    lines.push(format!(
        "Wrote {}: {}, {}, {}",
        plural(node.node_count(), "document"),
        plural(totals.collections, "collection"),
        plural(totals.manifests, "manifest"),
        plural(totals.canvases, "canvas"),
    ));
    lines
}

pub fn print_build_summary(node: &DirectoryNode, root: &Path) {
    for line in format_build_summary(node, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Advisories
// ============================================================================

/// Format advisories, grouped by kind, with paths relative to the root.
pub fn format_advisories(advisories: &[Advisory], root: &Path) -> Vec<String> {
    if advisories.is_empty() {
        return vec!["No advisories".to_string()];
    }
    let mut sorted: Vec<&Advisory> = advisories.iter().collect();
    sorted.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.path.cmp(&b.path)));

    let mut lines = vec![format!("Advisories ({})", advisories.len())];
    for advisory in sorted {
        let path = relative(&advisory.path, root, false);
        let path = if path.is_empty() { ".".to_string() } else { path };
        lines.push(format!(
            "{}{}: {} ({})",
            indent(1),
            advisory.kind,
            advisory.message,
            path
        ));
    }
    lines
}

pub fn print_advisories(advisories: &[Advisory], root: &Path) {
    for line in format_advisories(advisories, root) {
        println!("{}", line);
    }
}
