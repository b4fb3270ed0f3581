//! Build configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are the base layer; a `config.toml` in the source root overrides any
//! subset of them.
//!
//! ## Config File Location
//!
//! ```text
//! source/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── info.yml
//! └── _page-1/
//!     └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [thumbnails]
//! width = 200               # Width of generated thumbnails in pixels
//! generate = true           # Generate thumbnails when none is provided
//!
//! [tiles]
//! enabled = false           # Write static level 0 tile pyramids for images
//! tile_size = 256           # Tile edge in pixels
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [annotation.motivations.painting]
//! heic = [{ type = "Image", format = "image/heic" }]
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Annotation tables merge extension by
//! extension, so adding `heic` keeps every stock extension:
//!
//! ```toml
//! [annotation.motivations.painting]
//! heic = [{ type = "Image", format = "image/heic" }]
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::mapping::AnnotationMapping;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name of the build configuration.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Thumbnail generation settings.
    pub thumbnails: ThumbnailsConfig,
    /// Tile pyramid generation settings.
    pub tiles: TilesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Motivation → extension → (type, format) mapping.
    pub annotation: AnnotationMapping,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.width == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width must be non-zero".into(),
            ));
        }
        if self.tiles.tile_size == 0 {
            return Err(ConfigError::Validation(
                "tiles.tile_size must be non-zero".into(),
            ));
        }
        self.annotation.validate().map_err(ConfigError::Validation)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Thumbnail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Width of generated thumbnails in pixels. Height follows the source.
    pub width: u32,
    /// Generate a thumbnail from the first painted image when no
    /// `thumb.*` file is provided.
    pub generate: bool,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            width: 200,
            generate: true,
        }
    }
}

/// Tile pyramid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TilesConfig {
    pub enabled: bool,
    pub tile_size: u32,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tile_size: 256,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# simple-iiif configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the root of the source tree. Unknown keys will cause
# an error.

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Width in pixels of generated thumbnails. Height keeps the aspect ratio.
width = 200

# Generate a thumbnail from the first painted image of a canvas when the
# canvas has no thumb.* file. Existing generated thumbnails are reused.
generate = true

# ---------------------------------------------------------------------------
# Tiles
# ---------------------------------------------------------------------------
[tiles]
# Write a static IIIF Image API level 0 tile pyramid for every painted image
# and reference it as the image's service.
enabled = false

# Tile edge in pixels.
tile_size = 256

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Annotation mapping
# ---------------------------------------------------------------------------
# Motivation -> file extension -> ordered (type, format) candidates.
# The stock mapping covers common image, audio, video, text and 3D formats
# for `painting`, plus text for `commenting`, `tagging` and `transcribing`.
# Tables here merge over it extension by extension.
#
# [annotation.motivations.painting]
# heic = [{ type = "Image", format = "image/heic" }]
#
# [annotation.motivations.describing]
# txt = [{ type = "TextualBody", format = "text/plain" }]
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{PAINTING, TypeFormat};
    use tempfile::TempDir;

    #[test]
    fn default_config_has_thumbnail_settings() {
        let config = SiteConfig::default();
        assert_eq!(config.thumbnails.width, 200);
        assert!(config.thumbnails.generate);
    }

    #[test]
    fn default_config_disables_tiles() {
        let config = SiteConfig::default();
        assert!(!config.tiles.enabled);
        assert_eq!(config.tiles.tile_size, 256);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[thumbnails]
width = 320
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.thumbnails.width, 320);
        assert!(config.thumbnails.generate);
        assert!(config.annotation.is_recognized(PAINTING));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.thumbnails.width, 200);
        assert_eq!(config.annotation, AnnotationMapping::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[tiles]\nenabled = true\ntile_size = 512\n",
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert!(config.tiles.enabled);
        assert_eq!(config.tiles.tile_size, 512);
        assert_eq!(config.thumbnails.width, 200);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Annotation mapping merge tests
    // =========================================================================

    #[test]
    fn annotation_extension_added_keeps_stock_entries() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[annotation.motivations.painting]
heic = [{ type = "Image", format = "image/heic" }]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(
            config.annotation.painting_default("heic"),
            Some(&TypeFormat::new("Image", "image/heic"))
        );
        assert!(config.annotation.painting_default("jpg").is_some());
    }

    #[test]
    fn annotation_extension_override_replaces_candidates() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[annotation.motivations.painting]
mp4 = [{ type = "Sound", format = "audio/mp4" }]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.annotation.candidates(PAINTING, "mp4").len(), 1);
        assert_eq!(config.annotation.type_by_extension(PAINTING, "mp4"), Some("Sound"));
    }

    #[test]
    fn annotation_new_motivation() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[annotation.motivations.describing]
txt = [{ type = "TextualBody", format = "text/plain" }]
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert!(config.annotation.is_recognized("describing"));
        assert!(config.annotation.is_recognized("commenting"));
    }

    #[test]
    fn annotation_candidate_with_unknown_key_rejected() {
        let toml = r#"
[annotation.motivations.painting]
heic = [{ type = "Image", format = "image/heic", colour = "red" }]
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn default_processing_config() {
        let config = ProcessingConfig::default();
        assert_eq!(config.max_processes, None);
    }

    #[test]
    fn effective_threads_auto() {
        let config = ProcessingConfig {
            max_processes: None,
        };
        let threads = effective_threads(&config);
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(threads, cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base: toml::Value = toml::from_str("[x.y]\np = 1\nq = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[x.y]\nq = 9").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["x"]["y"]["p"].as_integer(), Some(1));
        assert_eq!(merged["x"]["y"]["q"].as_integer(), Some(9));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml = r#"
[thumbnails]
widht = 300
"#;
        let result: Result<SiteConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[colors]\nbackground = \"#fff\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[tiles]\nsize = 512\n").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_thumbnail_width_zero() {
        let mut config = SiteConfig::default();
        config.thumbnails.width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_tile_size_zero() {
        let mut config = SiteConfig::default();
        config.tiles.tile_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_validates_annotation_keys() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[annotation.motivations.painting]
HEIC = [{ type = "Image", format = "image/heic" }]
"#,
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // Stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value = toml::from_str(stock_config_toml()).unwrap();
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.thumbnails.width, 200);
        assert!(config.thumbnails.generate);
        assert!(!config.tiles.enabled);
        assert_eq!(config.tiles.tile_size, 256);
        assert_eq!(config.processing.max_processes, None);
        assert_eq!(config.annotation, AnnotationMapping::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let value = stock_defaults_value();
        let table = value.as_table().unwrap();
        assert!(table.contains_key("thumbnails"));
        assert!(table.contains_key("tiles"));
        assert!(table.contains_key("processing"));
        assert!(table["annotation"]["motivations"]["painting"]
            .as_table()
            .unwrap()
            .contains_key("jpg"));
    }
}
