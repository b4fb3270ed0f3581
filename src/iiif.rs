//! IIIF Presentation 3.0 document types.
//!
//! These are the shapes written to every `index.json`. Only the subset the
//! generator emits is modelled. Optional fields are omitted when empty so
//! documents stay minimal and stable across rebuilds.
//!
//! Text goes through [`LanguageMap`]; the generator has no language
//! information, so every value sits under the `none` key:
//!
//! ```json
//! { "label": { "none": ["Vertebra"] } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";

/// Language key used for all values.
pub const NO_LANGUAGE: &str = "none";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageMap(pub BTreeMap<String, Vec<String>>);

impl LanguageMap {
    pub fn none(value: impl Into<String>) -> Self {
        Self(BTreeMap::from([(NO_LANGUAGE.to_string(), vec![value.into()])]))
    }

    /// First value under any language, for display and sorting.
    pub fn first(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: LanguageMap,
    pub value: LanguageMap,
}

impl MetadataEntry {
    pub fn from_pairs(pairs: &[(String, String)]) -> Vec<Self> {
        pairs
            .iter()
            .map(|(label, value)| Self {
                label: LanguageMap::none(label.as_str()),
                value: LanguageMap::none(value.as_str()),
            })
            .collect()
    }
}

/// Content resource reference, used for thumbnails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Resource {
    pub fn image(id: impl Into<String>, format: Option<String>) -> Self {
        Self {
            id: id.into(),
            kind: "Image".to_string(),
            format,
        }
    }
}

/// Image service attached to an image body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub profile: String,
}

impl Service {
    /// A level 2 image service hosted elsewhere.
    pub fn level2(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "ImageService2".to_string(),
            profile: "level2".to_string(),
        }
    }

    /// A static level 0 tile pyramid.
    pub fn level0(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "ImageService2".to_string(),
            profile: "level0".to_string(),
        }
    }
}

/// Machine-readable companion resource (hOCR).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeeAlso {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub profile: String,
}

impl SeeAlso {
    pub fn hocr(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "Dataset".to_string(),
            format: "text/vnd.hocr+html".to_string(),
            profile: "http://kba.cloud/hocr-spec/1.1/".to_string(),
        }
    }
}

/// Annotation body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LanguageMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub motivation: String,
    pub target: String,
    pub body: Body,
}

impl Annotation {
    pub fn new(id: String, motivation: String, target: String, body: Body) -> Self {
        Self {
            id,
            kind: "Annotation".to_string(),
            motivation,
            target,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub items: Vec<Annotation>,
}

impl AnnotationPage {
    pub fn new(id: String, items: Vec<Annotation>) -> Self {
        Self {
            id,
            kind: "AnnotationPage".to_string(),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<Resource>,
    #[serde(rename = "seeAlso", default, skip_serializing_if = "Vec::is_empty")]
    pub see_also: Vec<SeeAlso>,
    pub items: Vec<AnnotationPage>,
}

/// Attribution as a IIIF 3 `requiredStatement`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredStatement {
    pub label: LanguageMap,
    pub value: LanguageMap,
}

impl RequiredStatement {
    pub fn attribution(text: &str) -> Self {
        Self {
            label: LanguageMap::none("Attribution"),
            value: LanguageMap::none(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LanguageMap>,
    #[serde(
        rename = "requiredStatement",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub required_statement: Option<RequiredStatement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behavior: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<Resource>,
    pub items: Vec<Canvas>,
}

/// An entry in a collection's `items`: a child manifest or collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<Resource>,
    pub items: Vec<Reference>,
}

/// Any emitted document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    Collection(Collection),
    Manifest(Manifest),
}

impl Document {
    /// Serialize with two-space indentation, as written to disk.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
