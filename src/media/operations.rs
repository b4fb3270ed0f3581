//! High-level media operations.
//!
//! These wrap backend calls with the filesystem policy of the build:
//! derived files that already exist are reused, never regenerated, and
//! output directories are created on demand.

use super::backend::{BackendError, MediaBackend};
use super::params::{ThumbnailParams, TileParams};
use std::fs;

/// Result type for media operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Name of the Image API descriptor inside a tile directory.
pub const TILE_INFO: &str = "info.json";

/// Whether a derived file was produced by this call or found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Reused,
}

/// Create a thumbnail unless one already exists at the output path.
pub fn ensure_thumbnail(backend: &dyn MediaBackend, params: &ThumbnailParams) -> Result<Outcome> {
    if params.output.exists() {
        return Ok(Outcome::Reused);
    }
    if let Some(parent) = params.output.parent() {
        fs::create_dir_all(parent)?;
    }
    backend.thumbnail(params)?;
    Ok(Outcome::Created)
}

/// Create a tile pyramid unless its `info.json` already exists.
pub fn ensure_tiles(backend: &dyn MediaBackend, params: &TileParams) -> Result<Outcome> {
    if params.output_dir.join(TILE_INFO).exists() {
        return Ok(Outcome::Reused);
    }
    fs::create_dir_all(&params.output_dir)?;
    backend.tiles(params)?;
    Ok(Outcome::Created)
}
