//! Parameter types for media operations.
//!
//! These structs describe *what* to produce, not *how*. They are the
//! interface between the [`operations`](super::operations) that decide what
//! derived files a build needs and the [`backend`](super::backend) that
//! does the pixel work, so tests can swap in a mock backend.

use std::path::PathBuf;

/// A thumbnail: `source` scaled to `width` pixels wide, written to `output`.
///
/// The output format follows the output extension. Sources narrower than
/// `width` are copied at their own size.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub width: u32,
}

/// A static IIIF Image API level 0 tile pyramid.
///
/// Tiles and `info.json` are written under `output_dir`; `service_id` is
/// the published URL of that directory and becomes the `@id` of
/// `info.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileParams {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub tile_size: u32,
    pub service_id: String,
}
