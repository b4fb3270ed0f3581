//! Media probing and derived images.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Duration** | `symphonia` format probe |
//! | **Thumbnail** | `resize_exact`, aspect preserved, never upscaled |
//! | **Tiles** | static Image API level 0 pyramid |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing media operations
//! - **Backend**: [`MediaBackend`] trait + [`RustBackend`]
//! - **Operations**: Reuse-or-create policy on top of the backend

pub mod backend;
pub mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, MediaBackend};
pub use operations::{Outcome, ensure_thumbnail, ensure_tiles};
pub use params::{ThumbnailParams, TileParams};
pub use rust_backend::RustBackend;
