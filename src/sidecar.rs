//! YAML sidecar files.
//!
//! Three kinds of sidecar sit next to content:
//!
//! - **`info.yml`**: descriptive metadata for a collection, manifest, or
//!   canvas directory ([`InfoSidecar`]).
//! - **`manifests.yml`**: references to externally hosted manifests that a
//!   collection lists alongside its own children ([`ManifestsSidecar`]).
//! - **any other `*.yml` in a canvas directory**: one custom annotation
//!   ([`AnnotationSidecar`]).
//!
//! ```yaml
//! # info.yml
//! label: Vertebra
//! description: A single lumbar vertebra.
//! attribution: Provided by the Natural History Museum
//! behavior: [paged]
//! metadata:
//!   Creator: A. Smith
//!   Date: 1921
//! ```
//!
//! ## Resolution priority
//!
//! Labels are resolved with [`resolve`]: the first non-empty value wins, so
//! `info.yml`'s `label` beats the directory name, which beats nothing.
//!
//! ## Scalars
//!
//! YAML happily types `label: 1984` as a number and `label: yes` as a bool.
//! Text fields accept any scalar and keep its textual form. A sidecar that
//! is missing is not an error; one that fails to parse is fatal.

use crate::iiif::Resource;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const INFO_SIDECAR: &str = "info.yml";
pub const MANIFESTS_SIDECAR: &str = "manifests.yml";

#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Resolve a field from multiple sources.
///
/// Takes a list of optional values in priority order and returns the first
/// non-None, non-empty value.
///
/// ```text
/// label: resolve(&[info_label, directory_name])
/// ```
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Read and parse a YAML sidecar.
///
/// Returns `Ok(None)` when the file does not exist and the default value
/// when it exists but is empty.
pub fn read_yaml<T>(path: &Path) -> Result<Option<T>, SidecarError>
where
    T: DeserializeOwned + Default,
{
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| SidecarError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Some(T::default()));
    }
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|source| SidecarError::Yaml {
            path: path.to_path_buf(),
            source,
        })
}

/// Textual form of a YAML scalar. Sequences and mappings have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn text(value: Option<Value>) -> Option<String> {
    value.as_ref().and_then(scalar_text)
}

fn number(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn dimension(value: Option<Value>) -> Option<u32> {
    number(value)
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n.round() as u32)
}

// =============================================================================
// info.yml
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawInfo {
    label: Option<Value>,
    description: Option<Value>,
    attribution: Option<Value>,
    behavior: Option<Value>,
    metadata: Option<serde_yaml::Mapping>,
    width: Option<Value>,
    height: Option<Value>,
    duration: Option<Value>,
}

/// Descriptive metadata from `info.yml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoSidecar {
    pub label: Option<String>,
    pub description: Option<String>,
    pub attribution: Option<String>,
    /// Always a list; a single string is promoted.
    pub behavior: Vec<String>,
    /// Key/value pairs in document order.
    pub metadata: Vec<(String, String)>,
    /// Canvas-only: declared size, used when nothing can be probed.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
}

impl<'de> Deserialize<'de> for InfoSidecar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawInfo::deserialize(deserializer)?;
        let behavior = match raw.behavior {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
            other => text(other).into_iter().collect(),
        };
        let metadata = raw
            .metadata
            .unwrap_or_default()
            .iter()
            .filter_map(|(key, value)| Some((scalar_text(key)?, scalar_text(value)?)))
            .collect();
        Ok(Self {
            label: text(raw.label),
            description: text(raw.description),
            attribution: text(raw.attribution),
            behavior,
            metadata,
            width: dimension(raw.width),
            height: dimension(raw.height),
            duration: number(raw.duration).filter(|d| d.is_finite() && *d > 0.0),
        })
    }
}

/// Read `info.yml` from a directory; absent means empty.
pub fn read_info(dir: &Path) -> Result<InfoSidecar, SidecarError> {
    Ok(read_yaml(&dir.join(INFO_SIDECAR))?.unwrap_or_default())
}

// =============================================================================
// manifests.yml
// =============================================================================

/// A `manifests.yml` file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ManifestsSidecar {
    pub manifests: Vec<RemoteManifest>,
}

/// A reference to an externally hosted manifest.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteManifest {
    pub id: String,
    #[serde(default, deserialize_with = "scalar_field")]
    pub label: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<RemoteThumbnail>,
}

/// A thumbnail as written in `manifests.yml`: a bare id or full resources.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RemoteThumbnail {
    Id(String),
    Resources(Vec<ThumbnailRef>),
    Resource(ThumbnailRef),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ThumbnailRef {
    pub id: String,
    #[serde(rename = "type", default = "default_thumbnail_type")]
    pub kind: String,
    #[serde(default)]
    pub format: Option<String>,
}

fn default_thumbnail_type() -> String {
    "Image".to_string()
}

impl From<&ThumbnailRef> for Resource {
    fn from(r: &ThumbnailRef) -> Self {
        Resource {
            id: r.id.clone(),
            kind: r.kind.clone(),
            format: r.format.clone(),
        }
    }
}

impl RemoteThumbnail {
    /// Thumbnail entries as published in a collection's `items`.
    pub fn resources(&self) -> Vec<Resource> {
        match self {
            RemoteThumbnail::Id(id) => vec![Resource::image(id.as_str(), None)],
            RemoteThumbnail::Resource(r) => vec![r.into()],
            RemoteThumbnail::Resources(all) => all.iter().map(Resource::from).collect(),
        }
    }
}

fn scalar_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(text(value))
}

impl RemoteManifest {
    /// Label, falling back to the last meaningful segment of the id.
    ///
    /// `https://host/iiif/book-1/manifest.json` → `book-1`;
    /// `https://host/iiif/book-1/` → `book-1`.
    pub fn display_label(&self) -> String {
        if let Some(label) = resolve(&[self.label.as_deref()]) {
            return label;
        }
        let path = self
            .id
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.id);
        let path = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let meaningful = match segments.as_slice() {
            [.., parent, last] if last.to_ascii_lowercase().ends_with(".json") => Some(*parent),
            [.., last] => Some(*last),
            [] => None,
        };
        meaningful.unwrap_or(self.id.as_str()).to_string()
    }
}

/// Read `manifests.yml` from a directory.
pub fn read_manifests(dir: &Path) -> Result<Option<ManifestsSidecar>, SidecarError> {
    read_yaml(&dir.join(MANIFESTS_SIDECAR))
}

// =============================================================================
// Annotation sidecars
// =============================================================================

/// A custom annotation declared in a canvas directory.
///
/// ```yaml
/// motivation: painting
/// value: https://iiif.example.org/images/page-1/info.json
/// xywh: 0,0,1200,800
/// label: Overlay
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnotationSidecar {
    #[serde(deserialize_with = "scalar_field")]
    pub motivation: Option<String>,
    #[serde(deserialize_with = "scalar_field")]
    pub value: Option<String>,
    #[serde(deserialize_with = "scalar_field")]
    pub xywh: Option<String>,
    #[serde(rename = "type", deserialize_with = "scalar_field")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "scalar_field")]
    pub format: Option<String>,
    #[serde(deserialize_with = "scalar_field")]
    pub label: Option<String>,
}
