//! Tree walking, classification, and document emission.
//!
//! ## Directory Structure
//!
//! ```text
//! archive/                         # Collection (has child directories)
//! ├── config.toml                  # Site configuration (optional)
//! ├── info.yml                     # Label, metadata (optional)
//! ├── manifests.yml                # Remote manifests (optional)
//! ├── thumb.jpg                    # Explicit thumbnail (optional)
//! ├── book/                        # Manifest (has canvas directories)
//! │   ├── info.yml                 # Label, description, attribution, behavior
//! │   ├── _page-1/                 # Canvas
//! │   │   ├── page.jpg             # Default painting annotation
//! │   │   ├── page.hocr            # seeAlso cross-reference
//! │   │   └── comment.yml          # Custom annotation
//! │   └── _page-2/
//! │       └── page.jpg
//! ├── plates/                      # Manifest (flat gallery)
//! │   ├── plate-1.jpg              # One canvas per file
//! │   └── plate-2.jpg
//! └── +drafts/                     # Excluded, never traversed
//! ```
//!
//! ## Classification
//!
//! | Contents | Kind |
//! |---|---|
//! | any `_*` directory | Manifest (canvas directories) |
//! | child directories or `manifests.yml` | Collection |
//! | otherwise | Manifest (each paintable file is a canvas) |
//!
//! Canvas directories win when both kinds of subdirectory coexist. The plain
//! directories are still walked and emit their own documents but the
//! manifest does not reference them (an advisory says so).
//!
//! ## Ordering
//!
//! Entries are read in natural, case-insensitive order. Canvas ids are
//! `<manifest id>/canvas/<n>` in that order. Collection items are sorted by
//! label.
//!
//! ## Concurrency
//!
//! Each level joins its canvases and child directories on the rayon pool;
//! a node's document is written only after everything below it is done.

use crate::advisory::{Advisory, AdvisoryKind, AdvisorySink};
use crate::canvas::{CanvasBuilder, CanvasError, CanvasNode, CanvasSource, is_paintable};
use crate::config::SiteConfig;
use crate::identifier::{
    IdentifierError, Lineage, canvas_id, document_id, join_segment, last_segment, parse_base,
};
use crate::iiif::{
    self, Document, LanguageMap, MetadataEntry, PRESENTATION_CONTEXT, Reference,
    RequiredStatement, Resource,
};
use crate::media::MediaBackend;
use crate::naming::{
    DOCUMENT_NAME, compare_natural, file_name_str, is_canvas_dir_name, is_excluded_name,
    is_hidden_name, sort_natural,
};
use crate::sidecar::{
    self, InfoSidecar, RemoteManifest, RemoteThumbnail, SidecarError, resolve,
};
use crate::thumbnail;
use crate::writer::DocumentWriter;
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Sidecar(#[from] SidecarError),
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("cannot serialize document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Shared, read-only collaborators of one build.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a SiteConfig,
    pub backend: &'a dyn MediaBackend,
    pub writer: &'a dyn DocumentWriter,
    pub advisories: &'a dyn AdvisorySink,
}

impl BuildContext<'_> {
    fn advise(&self, kind: AdvisoryKind, path: &Path, message: impl Into<String>) {
        self.advisories.advise(Advisory::new(kind, path, message));
    }
}

// ============================================================================
// Directory entries
// ============================================================================

/// Visible entries of one directory, split and naturally sorted.
#[derive(Debug, Default)]
pub(crate) struct Entries {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

pub(crate) fn read_entries(dir: &Path) -> io::Result<Entries> {
    let mut entries = Entries::default();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        let name = entry.file_name().to_string_lossy();
        if is_hidden_name(&name) {
            continue;
        }
        if entry.file_type().is_dir() {
            entries.dirs.push(entry.into_path());
        } else if entry.file_type().is_file() {
            entries.files.push(entry.into_path());
        }
    }
    sort_natural(&mut entries.dirs);
    sort_natural(&mut entries.files);
    Ok(entries)
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Collection,
    Manifest,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Collection => "Collection",
            NodeKind::Manifest => "Manifest",
        }
    }
}

/// One emitted directory and everything beneath it.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    pub path: PathBuf,
    pub url: Url,
    pub virtual_name: Option<String>,
    pub kind: NodeKind,
    pub label: String,
    pub info: InfoSidecar,
    /// Child directories in natural order. For a manifest these are the
    /// unreferenced plain directories beside its canvas directories.
    pub children: Vec<DirectoryNode>,
    pub canvases: Vec<CanvasNode>,
    pub remote_manifests: Vec<RemoteManifest>,
    pub thumbnail: Option<Resource>,
    /// Where the node's `index.json` was written.
    pub document_path: PathBuf,
}

impl DirectoryNode {
    pub fn id(&self) -> String {
        document_id(&self.url)
    }

    /// Number of nodes in this subtree, including itself.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DirectoryNode::node_count).sum::<usize>()
    }

    fn reference(&self) -> Reference {
        Reference {
            id: self.id(),
            kind: self.kind.as_str().to_string(),
            label: LanguageMap::none(self.label.as_str()),
            thumbnail: self.thumbnail.iter().cloned().collect(),
        }
    }
}

// ============================================================================
// Walk
// ============================================================================

/// Build and emit the documents for the tree rooted at `root`.
///
/// `base_url` is the published URL of `root`; `virtual_name` replaces the
/// root directory's real name when file ids are computed. Without one, the
/// URL's last path segment stands in for the root's name.
pub fn build(
    root: &Path,
    base_url: &str,
    virtual_name: Option<&str>,
    ctx: &BuildContext<'_>,
) -> Result<DirectoryNode, BuildError> {
    let root = root.canonicalize().map_err(|source| BuildError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    let url = parse_base(base_url)?;
    let virtual_name = virtual_name
        .filter(|name| !name.is_empty())
        .map(String::from)
        .or_else(|| last_segment(&url));
    let lineage = Lineage::root(&root, virtual_name.as_deref());
    tracing::debug!(root = %root.display(), url = %url, "building tree");
    walk_directory(&root, url, &lineage, ctx)
}

/// What a directory was classified as, with the sources it draws on.
struct Layout {
    kind: NodeKind,
    canvases: Vec<CanvasSource>,
    /// Directories walked on their own.
    children: Vec<PathBuf>,
    remote: Vec<RemoteManifest>,
}

fn classify(
    dir: &Path,
    entries: &Entries,
    remote: Option<sidecar::ManifestsSidecar>,
    ctx: &BuildContext<'_>,
) -> Layout {
    let (canvas_dirs, plain_dirs): (Vec<&PathBuf>, Vec<&PathBuf>) = entries
        .dirs
        .iter()
        .filter(|d| !is_excluded_name(file_name_str(d)))
        .partition(|d| is_canvas_dir_name(file_name_str(d)));
    let loose: Vec<&PathBuf> = entries
        .files
        .iter()
        .filter(|f| is_paintable(&ctx.config.annotation, f))
        .collect();
    let children: Vec<PathBuf> = plain_dirs.iter().map(|d| d.to_path_buf()).collect();

    if !canvas_dirs.is_empty() {
        if !plain_dirs.is_empty() {
            let names: Vec<&str> = plain_dirs.iter().map(|d| file_name_str(d)).collect();
            ctx.advise(
                AdvisoryKind::AmbiguousStructure,
                dir,
                format!(
                    "canvas directories beside plain directories; not referenced: {}",
                    names.join(", ")
                ),
            );
        }
        if remote.is_some() {
            ctx.advise(
                AdvisoryKind::AmbiguousStructure,
                dir,
                format!("{} ignored beside canvas directories", sidecar::MANIFESTS_SIDECAR),
            );
        }
        if !loose.is_empty() {
            ctx.advise(
                AdvisoryKind::AmbiguousStructure,
                dir,
                format!("{} loose file(s) ignored beside canvas directories", loose.len()),
            );
        }
        return Layout {
            kind: NodeKind::Manifest,
            canvases: canvas_dirs
                .into_iter()
                .map(|d| CanvasSource::Directory(d.clone()))
                .collect(),
            children,
            remote: Vec::new(),
        };
    }

    if !plain_dirs.is_empty() || remote.is_some() {
        if !loose.is_empty() {
            ctx.advise(
                AdvisoryKind::AmbiguousStructure,
                dir,
                format!("{} loose file(s) ignored in a collection", loose.len()),
            );
        }
        return Layout {
            kind: NodeKind::Collection,
            canvases: Vec::new(),
            children,
            remote: remote.map(|r| r.manifests).unwrap_or_default(),
        };
    }

    Layout {
        kind: NodeKind::Manifest,
        canvases: loose
            .into_iter()
            .map(|f| CanvasSource::File(f.clone()))
            .collect(),
        children: Vec::new(),
        remote: Vec::new(),
    }
}

fn walk_directory(
    dir: &Path,
    url: Url,
    lineage: &Lineage<'_>,
    ctx: &BuildContext<'_>,
) -> Result<DirectoryNode, BuildError> {
    let entries = read_entries(dir).map_err(|source| BuildError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let info = sidecar::read_info(dir)?;
    let remote = sidecar::read_manifests(dir)?;
    let layout = classify(dir, &entries, remote, ctx);
    tracing::debug!(
        path = %dir.display(),
        kind = layout.kind.as_str(),
        canvases = layout.canvases.len(),
        children = layout.children.len(),
        "classified directory"
    );

    let doc_id = document_id(&url);
    let explicit_thumbnail = thumbnail::explicit_in(&entries.files);
    let builder =
        CanvasBuilder::new(ctx, &url, lineage).with_shared_thumbnail(explicit_thumbnail);

    let (canvases, children) = rayon::join(
        || {
            layout
                .canvases
                .par_iter()
                .enumerate()
                .map(|(index, source)| builder.build(source, canvas_id(&doc_id, index)))
                .collect::<Result<Vec<_>, _>>()
        },
        || {
            layout
                .children
                .par_iter()
                .map(|child| {
                    let child_url = join_segment(&url, file_name_str(child))?;
                    let frame = lineage.child(child);
                    walk_directory(child, child_url, &frame, ctx)
                })
                .collect::<Result<Vec<_>, BuildError>>()
        },
    );
    let mut canvases = canvases?;
    let children = children?;
    canvases.sort_by(|a, b| compare_natural(&a.id, &b.id));

    if layout.kind == NodeKind::Manifest && canvases.is_empty() {
        ctx.advise(AdvisoryKind::MissingContent, dir, "manifest has no canvases");
    }

    let label = resolve(&[info.label.as_deref(), Some(file_name_str(dir))]).unwrap_or_default();
    let explicit = explicit_thumbnail
        .map(|file| thumbnail::resource_for(file, &url, lineage, &ctx.config.annotation));

    let mut node = DirectoryNode {
        path: dir.to_path_buf(),
        document_path: dir.join(DOCUMENT_NAME),
        url,
        virtual_name: lineage.virtual_name.map(String::from),
        kind: layout.kind,
        label,
        info,
        children,
        canvases,
        remote_manifests: layout.remote,
        thumbnail: None,
    };

    let document = match node.kind {
        NodeKind::Manifest => {
            node.thumbnail = explicit.or_else(|| {
                node.canvases
                    .iter()
                    .find_map(|canvas| canvas.thumbnail.clone())
            });
            Document::Manifest(manifest_document(&node))
        }
        NodeKind::Collection => {
            let items = collection_items(&node);
            node.thumbnail = explicit.or_else(|| {
                items
                    .iter()
                    .find_map(|item| item.thumbnail.first().cloned())
            });
            Document::Collection(collection_document(&node, items))
        }
    };

    let json = document.to_json()?;
    ctx.writer
        .write(&node.document_path, &json)
        .map_err(|source| BuildError::Write {
            path: node.document_path.clone(),
            source,
        })?;
    tracing::info!(
        kind = node.kind.as_str(),
        id = %node.id(),
        "wrote {}",
        node.document_path.display()
    );

    Ok(node)
}

// ============================================================================
// Documents
// ============================================================================

fn manifest_document(node: &DirectoryNode) -> iiif::Manifest {
    iiif::Manifest {
        context: PRESENTATION_CONTEXT.to_string(),
        id: node.id(),
        kind: "Manifest".to_string(),
        label: LanguageMap::none(node.label.as_str()),
        metadata: MetadataEntry::from_pairs(&node.info.metadata),
        summary: node.info.description.as_deref().map(LanguageMap::none),
        required_statement: node
            .info
            .attribution
            .as_deref()
            .map(RequiredStatement::attribution),
        behavior: node.info.behavior.clone(),
        thumbnail: node.thumbnail.iter().cloned().collect(),
        items: node.canvases.iter().map(CanvasNode::to_iiif).collect(),
    }
}

fn remote_reference(remote: &RemoteManifest) -> Reference {
    Reference {
        id: remote.id.clone(),
        kind: "Manifest".to_string(),
        label: LanguageMap::none(remote.display_label()),
        thumbnail: remote
            .thumbnail
            .as_ref()
            .map(RemoteThumbnail::resources)
            .unwrap_or_default(),
    }
}

/// Child documents and remote manifests, sorted by label.
fn collection_items(node: &DirectoryNode) -> Vec<Reference> {
    let mut items: Vec<Reference> = node
        .children
        .iter()
        .map(DirectoryNode::reference)
        .chain(node.remote_manifests.iter().map(remote_reference))
        .collect();
    items.sort_by(|a, b| {
        compare_natural(
            a.label.first().unwrap_or_default(),
            b.label.first().unwrap_or_default(),
        )
    });
    items
}

fn collection_document(node: &DirectoryNode, items: Vec<Reference>) -> iiif::Collection {
    iiif::Collection {
        context: PRESENTATION_CONTEXT.to_string(),
        id: node.id(),
        kind: "Collection".to_string(),
        label: LanguageMap::none(node.label.as_str()),
        metadata: MetadataEntry::from_pairs(&node.info.metadata),
        thumbnail: node.thumbnail.iter().cloned().collect(),
        items,
    }
}
