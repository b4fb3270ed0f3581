//! Media backend trait and shared types.
//!
//! The [`MediaBackend`] trait defines the four operations the build needs
//! from media files: identify (pixel dimensions), duration, thumbnail, and
//! tiles. Everything else in the crate is backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on `image` and
//! `symphonia`. Tests use the mock in this module's `tests`.

use super::params::{ThumbnailParams, TileParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for media backends.
///
/// Called concurrently from the build's worker threads.
pub trait MediaBackend: Sync {
    /// Pixel dimensions of an image.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Duration in seconds of an audio or video file.
    fn duration(&self, path: &Path) -> Result<f64, BackendError>;

    /// Write a scaled-down copy of an image.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;

    /// Write a level 0 tile pyramid and its `info.json`.
    fn tiles(&self, params: &TileParams) -> Result<(), BackendError>;
}
