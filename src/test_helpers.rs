//! Shared test utilities for the simple-iiif test suite.
//!
//! Provides fixture writers, a one-call build against the mock backend and
//! an in-memory writer, and lookup helpers over the resulting node tree.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "book/_p1/page.jpg", b"x");
//!
//! let (node, writer, sink) =
//!     build_with(tmp.path(), "http://host/root", None, &config, &backend);
//!
//! let book = find_child(&node, "book");
//! assert_eq!(canvas_labels(book), vec!["_p1"]);
//! ```

use crate::advisory::RecordingSink;
use crate::config::SiteConfig;
use crate::media::backend::tests::MockBackend;
use crate::walk::{self, BuildContext, DirectoryNode};
use crate::writer::MemoryWriter;
use serde_json::Value;
use std::path::Path;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `contents` to `dir/rel`, creating intermediate directories.
pub fn write_file(dir: &Path, rel: &str, contents: &[u8]) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Create `dir/rel` and its parents.
pub fn mkdir(dir: &Path, rel: &str) {
    std::fs::create_dir_all(dir.join(rel)).unwrap();
}

// =========================================================================
// Builds
// =========================================================================

/// Build `root` into memory. Panics on a fatal build error.
pub fn build_with(
    root: &Path,
    base_url: &str,
    virtual_name: Option<&str>,
    config: &SiteConfig,
    backend: &MockBackend,
) -> (DirectoryNode, MemoryWriter, RecordingSink) {
    std::fs::create_dir_all(root).unwrap();
    let writer = MemoryWriter::new();
    let sink = RecordingSink::new();
    let ctx = BuildContext {
        config,
        backend,
        writer: &writer,
        advisories: &sink,
    };
    let node = walk::build(root, base_url, virtual_name, &ctx)
        .unwrap_or_else(|e| panic!("build of {} failed: {e}", root.display()));
    (node, writer, sink)
}

/// Parse the document written at `path`. Accepts the un-canonicalized path
/// used to set up the fixture.
pub fn read_document(writer: &MemoryWriter, path: &Path) -> Value {
    let canonical = path
        .parent()
        .and_then(|dir| dir.canonicalize().ok())
        .and_then(|dir| path.file_name().map(|name| dir.join(name)))
        .unwrap_or_else(|| path.to_path_buf());
    let contents = writer.get(&canonical).unwrap_or_else(|| {
        panic!(
            "no document at {}. Written: {:?}",
            canonical.display(),
            writer.paths()
        )
    });
    serde_json::from_str(&contents).unwrap()
}

// =========================================================================
// Node lookups — panics with a clear message on miss
// =========================================================================

/// Find a direct child by label. Panics if not found.
pub fn find_child<'a>(node: &'a DirectoryNode, label: &str) -> &'a DirectoryNode {
    node.children
        .iter()
        .find(|c| c.label == label)
        .unwrap_or_else(|| {
            let labels = child_labels(node);
            panic!("child '{label}' not found under '{}'. Available: {labels:?}", node.label)
        })
}

/// Direct child labels in walk order.
pub fn child_labels(node: &DirectoryNode) -> Vec<&str> {
    node.children.iter().map(|c| c.label.as_str()).collect()
}

/// Canvas labels in manifest order.
pub fn canvas_labels(node: &DirectoryNode) -> Vec<&str> {
    node.canvases.iter().map(|c| c.label.as_str()).collect()
}
