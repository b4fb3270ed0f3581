//! Pure dimension math for thumbnails and tile pyramids.
//!
//! All functions here are pure and testable without any I/O or images.

/// Thumbnail dimensions for a fixed target width, preserving aspect ratio.
///
/// Images narrower than the target are never upscaled. Neither edge drops
/// below one pixel.
///
/// ```
/// # use simple_iiif::media::calculations::thumbnail_dimensions;
/// assert_eq!(thumbnail_dimensions((2000, 1000), 200), (200, 100));
/// assert_eq!(thumbnail_dimensions((120, 80), 200), (120, 80));
/// ```
pub fn thumbnail_dimensions(source: (u32, u32), width: u32) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 || src_w <= width {
        return (src_w.max(1), src_h.max(1));
    }
    let h = (src_h as f64 * width as f64 / src_w as f64).round() as u32;
    (width.max(1), h.max(1))
}

/// Scale factors of a tile pyramid: 1, 2, 4, ... until a single tile
/// covers the whole image.
pub fn scale_factors(dims: (u32, u32), tile_size: u32) -> Vec<u32> {
    let (w, h) = dims;
    let tile_size = tile_size.max(1);
    let mut factors = vec![1];
    let mut scale = 1u32;
    while w.div_ceil(scale) > tile_size || h.div_ceil(scale) > tile_size {
        scale = match scale.checked_mul(2) {
            Some(next) => next,
            None => break,
        };
        factors.push(scale);
    }
    factors
}

/// One tile of a pyramid level, in full-resolution coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Output size after scaling down by the level's factor.
    pub scaled_width: u32,
    pub scaled_height: u32,
}

impl TileRegion {
    /// Image API 2 request path for this tile, relative to the service.
    pub fn request_path(&self) -> String {
        format!(
            "{},{},{},{}/{},/0/default.jpg",
            self.x, self.y, self.width, self.height, self.scaled_width
        )
    }
}

/// Tiles covering the image at one scale factor, row by row.
pub fn tile_regions(dims: (u32, u32), tile_size: u32, scale: u32) -> Vec<TileRegion> {
    let (w, h) = dims;
    let step = tile_size.max(1).saturating_mul(scale.max(1));
    let scale = scale.max(1);
    let mut regions = Vec::new();
    let mut y = 0;
    while y < h {
        let height = step.min(h - y);
        let mut x = 0;
        while x < w {
            let width = step.min(w - x);
            regions.push(TileRegion {
                x,
                y,
                width,
                height,
                scaled_width: width.div_ceil(scale),
                scaled_height: height.div_ceil(scale),
            });
            x = x.saturating_add(step);
        }
        y = y.saturating_add(step);
    }
    regions
}
