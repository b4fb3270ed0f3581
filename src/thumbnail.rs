//! Thumbnail resolution.
//!
//! Every collection, manifest, and canvas may carry a thumbnail. Sources,
//! in priority order:
//!
//! 1. **Explicit**: a `thumb.<ext>` file in the node's directory.
//! 2. **Generated** (canvases only, when `thumbnails.generate` is on): a
//!    scaled copy of the canvas's first local painted image.
//!    - canvas directory `_p1/page.jpg` → `_p1/thumb.jpg`
//!    - standalone canvas `book/page.jpg` → `book/!thumbs/page.jpg`
//! 3. **Propagated** (manifests and collections): the first item's
//!    thumbnail.
//!
//! Generated files that already exist are reused, so rebuilding never
//! re-encodes. Ids go through virtual-path substitution and the path merge
//! in [`identifier`](crate::identifier).

use crate::advisory::{Advisory, AdvisoryKind};
use crate::identifier::{Lineage, file_id};
use crate::iiif::Resource;
use crate::mapping::AnnotationMapping;
use crate::media::{Outcome, ThumbnailParams, ensure_thumbnail};
use crate::naming::{extension_of, file_name_str, is_thumbnail_name};
use crate::walk::BuildContext;
use std::path::{Path, PathBuf};
use url::Url;

/// Directory collecting generated thumbnails of standalone canvases.
pub const STANDALONE_THUMBS_DIR: &str = "!thumbs";

/// First `thumb.*` among a directory's (naturally sorted) files.
pub fn explicit_in(files: &[PathBuf]) -> Option<&Path> {
    files
        .iter()
        .find(|f| is_thumbnail_name(file_name_str(f)))
        .map(PathBuf::as_path)
}

/// Thumbnail resource for a file published under `url`.
pub fn resource_for(
    file: &Path,
    url: &Url,
    lineage: &Lineage<'_>,
    mapping: &AnnotationMapping,
) -> Resource {
    let format = extension_of(file_name_str(file))
        .and_then(|ext| mapping.painting_default(&ext))
        .map(|tf| tf.format.clone());
    Resource::image(file_id(url, file, lineage), format)
}

/// Where a canvas directory's generated thumbnail goes: `thumb.<ext>`.
pub fn canvas_dir_output(dir: &Path, source: &Path) -> Option<PathBuf> {
    let ext = extension_of(file_name_str(source))?;
    Some(dir.join(format!("{}.{ext}", crate::naming::THUMBNAIL_STEM)))
}

/// Where a standalone canvas's generated thumbnail goes.
pub fn standalone_output(manifest_dir: &Path, source: &Path) -> PathBuf {
    manifest_dir
        .join(STANDALONE_THUMBS_DIR)
        .join(file_name_str(source))
}

/// Produce (or reuse) a thumbnail of `source` at `output`.
///
/// Failures become a [`AdvisoryKind::ProbeFailure`] and yield `None`.
pub fn generate(
    ctx: &BuildContext<'_>,
    source: &Path,
    output: PathBuf,
    url: &Url,
    lineage: &Lineage<'_>,
) -> Option<Resource> {
    let params = ThumbnailParams {
        source: source.to_path_buf(),
        output,
        width: ctx.config.thumbnails.width,
    };
    match ensure_thumbnail(ctx.backend, &params) {
        Ok(outcome) => {
            match outcome {
                Outcome::Created => {
                    tracing::debug!(output = %params.output.display(), "generated thumbnail")
                }
                Outcome::Reused => {
                    tracing::debug!(output = %params.output.display(), "reusing thumbnail")
                }
            }
            Some(resource_for(
                &params.output,
                url,
                lineage,
                &ctx.config.annotation,
            ))
        }
        Err(e) => {
            ctx.advisories.advise(Advisory::new(
                AdvisoryKind::ProbeFailure,
                source,
                format!("cannot generate thumbnail: {e}"),
            ));
            None
        }
    }
}
