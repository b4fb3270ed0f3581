//! Annotation mapping: motivation → extension → candidate (type, format) pairs.
//!
//! The mapping is the single source of truth for everything the generator
//! knows about media kinds. It answers questions like "what IIIF type is a
//! `.mp4` painted onto a canvas?" or "which extension produces
//! `image/tiff`?". It is configurable through `[annotation.motivations.*]`
//! tables in `config.toml`; the stock table below is the base layer.
//!
//! ```toml
//! [annotation.motivations.painting]
//! jpg = [{ type = "Image", format = "image/jpeg" }]
//! mp4 = [
//!     { type = "Video", format = "video/mp4" },
//!     { type = "Sound", format = "audio/mp4" },
//! ]
//! ```
//!
//! Extensions are stored lowercase without the leading dot. Maps are
//! `BTreeMap`s so every reverse lookup walks extensions in ascending order
//! and always gives the same answer for the same mapping.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The motivation whose annotations paint content onto a canvas.
pub const PAINTING: &str = "painting";

/// One candidate interpretation of an extension under a motivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
}

impl TypeFormat {
    pub fn new(kind: &str, format: &str) -> Self {
        Self {
            kind: kind.to_string(),
            format: format.to_string(),
        }
    }
}

/// Extension → ordered candidates, for a single motivation.
pub type ExtensionTable = BTreeMap<String, Vec<TypeFormat>>;

/// Motivation-keyed annotation mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationMapping {
    pub motivations: BTreeMap<String, ExtensionTable>,
}

/// Stock rows: (motivation, extension, type, format). Rows sharing a
/// motivation and extension become an ordered candidate list.
const STOCK_ROWS: &[(&str, &str, &str, &str)] = &[
    (PAINTING, "jpg", "Image", "image/jpeg"),
    (PAINTING, "jpeg", "Image", "image/jpeg"),
    (PAINTING, "png", "Image", "image/png"),
    (PAINTING, "gif", "Image", "image/gif"),
    (PAINTING, "webp", "Image", "image/webp"),
    (PAINTING, "tif", "Image", "image/tiff"),
    (PAINTING, "tiff", "Image", "image/tiff"),
    // An image service reference (`info.json`).
    (PAINTING, "json", "Image", "image/jpeg"),
    (PAINTING, "mp3", "Sound", "audio/mp3"),
    (PAINTING, "m4a", "Sound", "audio/mp4"),
    (PAINTING, "flac", "Sound", "audio/flac"),
    (PAINTING, "ogg", "Sound", "audio/ogg"),
    (PAINTING, "wav", "Sound", "audio/wav"),
    (PAINTING, "mp4", "Video", "video/mp4"),
    (PAINTING, "mp4", "Sound", "audio/mp4"),
    (PAINTING, "webm", "Video", "video/webm"),
    (PAINTING, "pdf", "Text", "application/pdf"),
    (PAINTING, "glb", "Model", "model/gltf-binary"),
    (PAINTING, "gltf", "Model", "model/gltf+json"),
    (PAINTING, "obj", "Model", "text/plain"),
    (PAINTING, "ply", "Model", "application/ply"),
    (PAINTING, "usdz", "Model", "model/vnd.usdz+zip"),
    ("commenting", "txt", "TextualBody", "text/plain"),
    ("commenting", "md", "TextualBody", "text/markdown"),
    ("commenting", "html", "TextualBody", "text/html"),
    ("tagging", "txt", "TextualBody", "text/plain"),
    ("transcribing", "txt", "TextualBody", "text/plain"),
    ("transcribing", "vtt", "Text", "text/vtt"),
];

impl Default for AnnotationMapping {
    fn default() -> Self {
        let mut motivations: BTreeMap<String, ExtensionTable> = BTreeMap::new();
        for &(motivation, ext, kind, format) in STOCK_ROWS {
            motivations
                .entry(motivation.to_string())
                .or_default()
                .entry(ext.to_string())
                .or_default()
                .push(TypeFormat::new(kind, format));
        }
        Self { motivations }
    }
}

impl AnnotationMapping {
    /// Whether the motivation has an entry in the mapping.
    pub fn is_recognized(&self, motivation: &str) -> bool {
        self.motivations.contains_key(motivation)
    }

    /// Ordered candidates for an extension under a motivation.
    pub fn candidates(&self, motivation: &str, ext: &str) -> &[TypeFormat] {
        self.motivations
            .get(motivation)
            .and_then(|table| table.get(ext))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First candidate for a painted file, if the extension is paintable.
    pub fn painting_default(&self, ext: &str) -> Option<&TypeFormat> {
        self.candidates(PAINTING, ext).first()
    }

    /// Type of the first candidate for `ext`.
    pub fn type_by_extension(&self, motivation: &str, ext: &str) -> Option<&str> {
        self.candidates(motivation, ext)
            .first()
            .map(|tf| tf.kind.as_str())
    }

    /// Format of the first candidate for `ext`.
    pub fn format_by_extension(&self, motivation: &str, ext: &str) -> Option<&str> {
        self.candidates(motivation, ext)
            .first()
            .map(|tf| tf.format.as_str())
    }

    /// Format of the candidate for `ext` whose type matches `kind`.
    pub fn format_by_extension_and_type(
        &self,
        motivation: &str,
        ext: &str,
        kind: &str,
    ) -> Option<&str> {
        self.candidates(motivation, ext)
            .iter()
            .find(|tf| tf.kind.eq_ignore_ascii_case(kind))
            .map(|tf| tf.format.as_str())
    }

    /// Type of the first candidate, across all extensions, declaring `format`.
    pub fn type_by_format(&self, motivation: &str, format: &str) -> Option<&str> {
        self.motivations
            .get(motivation)?
            .values()
            .flatten()
            .find(|tf| tf.format.eq_ignore_ascii_case(format))
            .map(|tf| tf.kind.as_str())
    }

    /// Format implied by a motivation alone.
    ///
    /// Only answers when the motivation has exactly one extension with
    /// exactly one candidate; anything wider is ambiguous.
    pub fn format_by_type(&self, motivation: &str) -> Option<&str> {
        let table = self.motivations.get(motivation)?;
        if table.len() != 1 {
            return None;
        }
        match table.values().next()?.as_slice() {
            [only] => Some(only.format.as_str()),
            _ => None,
        }
    }

    /// Structural checks run by config validation.
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_recognized(PAINTING) {
            return Err(format!(
                "annotation.motivations must define `{PAINTING}`"
            ));
        }
        for (motivation, table) in &self.motivations {
            for (ext, candidates) in table {
                if ext.is_empty() || ext.starts_with('.') || ext.to_ascii_lowercase() != *ext {
                    return Err(format!(
                        "annotation.motivations.{motivation}: extension `{ext}` must be lowercase without a leading dot"
                    ));
                }
                if candidates.is_empty() {
                    return Err(format!(
                        "annotation.motivations.{motivation}.{ext} has no candidates"
                    ));
                }
            }
        }
        Ok(())
    }
}
