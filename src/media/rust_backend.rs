//! Pure Rust media backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (JPEG, PNG, TIFF, WebP, GIF) | `image::image_dimensions` (header only) |
//! | Duration (MP3, FLAC, AAC/MP4, Vorbis, WAV) | `symphonia` probe + track `n_frames` |
//! | Thumbnail | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Tiles | `crop_imm` + `resize_exact` per tile, JPEG out |

use super::backend::{BackendError, Dimensions, MediaBackend};
use super::calculations::{scale_factors, thumbnail_dimensions, tile_regions};
use super::operations::TILE_INFO;
use super::params::{ThumbnailParams, TileParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::{self, File};
use std::path::Path;
use symphonia::core::formats::{FormatOptions, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const IMAGE_CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
const IMAGE_PROTOCOL: &str = "http://iiif.io/api/image";
const LEVEL0_PROFILE: &str = "http://iiif.io/api/image/2/level0.json";

/// Backend using the `image` and `symphonia` crates.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Seconds covered by a track, from its frame count and time base.
fn track_seconds(track: &Track) -> Option<f64> {
    let params = &track.codec_params;
    let frames = params.n_frames?;
    if let Some(time_base) = params.time_base {
        let time = time_base.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    let rate = params.sample_rate?;
    Some(frames as f64 / f64::from(rate))
}

impl MediaBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn duration(&self, path: &Path) -> Result<f64, BackendError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                BackendError::ProcessingFailed(format!(
                    "Failed to probe {}: {}",
                    path.display(),
                    e
                ))
            })?;

        probed
            .format
            .tracks()
            .iter()
            .filter_map(track_seconds)
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .reduce(f64::max)
            .ok_or_else(|| {
                BackendError::ProcessingFailed(format!(
                    "No timed track in {}",
                    path.display()
                ))
            })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let (width, height) = thumbnail_dimensions((img.width(), img.height()), params.width);
        let scaled = img.resize_exact(width, height, FilterType::Lanczos3);
        scaled.save(&params.output).map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "Failed to save {}: {}",
                params.output.display(),
                e
            ))
        })
    }

    fn tiles(&self, params: &TileParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let dims = (img.width(), img.height());
        let factors = scale_factors(dims, params.tile_size);

        for &scale in &factors {
            for region in tile_regions(dims, params.tile_size, scale) {
                let output = params.output_dir.join(region.request_path());
                if let Some(parent) = output.parent() {
                    fs::create_dir_all(parent)?;
                }
                img.crop_imm(region.x, region.y, region.width, region.height)
                    .resize_exact(
                        region.scaled_width,
                        region.scaled_height,
                        FilterType::Lanczos3,
                    )
                    .to_rgb8()
                    .save_with_format(&output, ImageFormat::Jpeg)
                    .map_err(|e| {
                        BackendError::ProcessingFailed(format!(
                            "Failed to save tile {}: {}",
                            output.display(),
                            e
                        ))
                    })?;
            }
        }

        let info = serde_json::json!({
            "@context": IMAGE_CONTEXT,
            "@id": params.service_id,
            "protocol": IMAGE_PROTOCOL,
            "width": dims.0,
            "height": dims.1,
            "profile": [LEVEL0_PROFILE],
            "tiles": [{ "width": params.tile_size, "scaleFactors": factors }],
        });
        let text = serde_json::to_string_pretty(&info)
            .map_err(|e| BackendError::ProcessingFailed(e.to_string()))?;
        fs::write(params.output_dir.join(TILE_INFO), text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn create_test_png(path: &Path, width: u32, height: u32) {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn identify_synthetic_png() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("page.png");
        create_test_png(&path, 320, 240);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 320, height: 240 });
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/page.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn duration_of_garbage_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clip.mp3");
        fs::write(&path, b"definitely not audio").unwrap();
        assert!(RustBackend::new().duration(&path).is_err());
    }

    #[test]
    fn thumbnail_scales_to_width() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("page.png");
        let output = tmp.path().join("thumb.png");
        create_test_png(&source, 400, 300);

        RustBackend::new()
            .thumbnail(&ThumbnailParams {
                source,
                output: output.clone(),
                width: 200,
            })
            .unwrap();

        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 150));
    }

    #[test]
    fn tiles_write_pyramid_and_info() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("page.png");
        create_test_png(&source, 300, 200);
        let output_dir = tmp.path().join("!tiles/page");
        fs::create_dir_all(&output_dir).unwrap();

        RustBackend::new()
            .tiles(&TileParams {
                source,
                output_dir: output_dir.clone(),
                tile_size: 256,
                service_id: "http://host/!tiles/page".into(),
            })
            .unwrap();

        let info: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output_dir.join(TILE_INFO)).unwrap())
                .unwrap();
        assert_eq!(info["@id"], "http://host/!tiles/page");
        assert_eq!(info["width"], 300);
        assert_eq!(info["tiles"][0]["scaleFactors"], serde_json::json!([1, 2]));
        assert!(output_dir.join("0,0,256,200/256,/0/default.jpg").is_file());
        assert!(output_dir.join("0,0,300,200/150,/0/default.jpg").is_file());
    }
}
