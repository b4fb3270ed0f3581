//! Canvas construction.
//!
//! A canvas comes from one of two sources:
//!
//! - a **canvas directory** (`_page-1/`) holding any number of custom
//!   annotation sidecars (`*.yml` other than `info.yml`) and paintable
//!   media files;
//! - a **standalone file** in a flat gallery, which becomes exactly one
//!   painting annotation.
//!
//! ## Pipeline
//!
//! ```text
//! sidecars  ──par──► drafts ┐
//!                           ├─► commit in order ─► CanvasNode
//! media     ──par──► drafts ┘
//! ```
//!
//! Drafts are resolved concurrently (sidecar parsing, inference, blocking
//! probes) and committed sequentially: custom annotations first, then
//! default painting annotations, each in natural filename order. Annotation
//! ids are assigned at commit from the final position, and the canvas's
//! width, height, and duration are the maxima over its annotation bodies.
//!
//! ## Custom annotations
//!
//! ```yaml
//! # _page-1/overlay.yml
//! motivation: painting
//! value: https://iiif.example.org/images/page-1/info.json
//! xywh: 0,0,1200,800
//! ```
//!
//! The body id is the resolved `value` when it names a file (painting or
//! unrecognized motivations), else a synthetic anchor
//! `<canvas id>/annotations/<sidecar name>`. Type and format go through
//! [`inference`](crate::inference).

use crate::advisory::{Advisory, AdvisoryKind};
use crate::identifier::{
    IdentifierError, Lineage, annotation_id, annotation_page_id, is_absolute_url,
    join_segment, normalize_path, resolve_reference, strip_last_segment, synthetic_body_id,
};
use crate::iiif::{self, Annotation, AnnotationPage, Body, LanguageMap, MetadataEntry, Resource, SeeAlso, Service};
use crate::inference::{Facts, Inferred, infer_format, infer_type, normalize_motivation};
use crate::mapping::{AnnotationMapping, PAINTING};
use crate::media::{TileParams, ensure_tiles};
use crate::naming::{
    DOCUMENT_NAME, extension_of, file_name_str, file_stem_str, is_thumbnail_name, is_yaml_name,
};
use crate::sidecar::{self, AnnotationSidecar, INFO_SIDECAR, InfoSidecar, SidecarError, resolve};
use crate::thumbnail;
use crate::walk::{BuildContext, read_entries};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Directory holding generated tile pyramids beside their images.
pub const TILES_DIR: &str = "!tiles";

const HOCR_EXTENSION: &str = "hocr";

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Sidecar(#[from] SidecarError),
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}

/// Where a canvas's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasSource {
    Directory(PathBuf),
    File(PathBuf),
}

impl CanvasSource {
    pub fn path(&self) -> &Path {
        match self {
            CanvasSource::Directory(p) | CanvasSource::File(p) => p,
        }
    }
}

/// A fully populated canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasNode {
    pub source: CanvasSource,
    pub id: String,
    pub label: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
    pub metadata: Vec<(String, String)>,
    pub annotations: Vec<Annotation>,
    pub see_also: Option<SeeAlso>,
    pub thumbnail: Option<Resource>,
}

/// An annotation resolved but not yet placed.
#[derive(Debug)]
struct Draft {
    motivation: String,
    body: Body,
    /// Sidecar label that replaces the canvas label.
    label_override: Option<String>,
    /// Local file behind a painted image, usable as a thumbnail source.
    local_image: Option<PathBuf>,
}

fn max_of<T: PartialOrd + Copy>(current: Option<T>, candidate: Option<T>) -> Option<T> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(if b > a { b } else { a }),
        (a, b) => a.or(b),
    }
}

impl CanvasNode {
    fn allocate(source: CanvasSource, id: String, label: String, info: &InfoSidecar) -> Self {
        Self {
            source,
            id,
            label,
            width: None,
            height: None,
            duration: None,
            metadata: info.metadata.clone(),
            annotations: Vec::new(),
            see_also: None,
            thumbnail: None,
        }
    }

    /// Place drafts in order, assigning ids and aggregating extents.
    /// Declared `info.yml` sizes fill in whatever no body provides.
    fn commit(&mut self, drafts: Vec<Draft>, info: &InfoSidecar) {
        for (index, draft) in drafts.into_iter().enumerate() {
            if let Some(label) = draft.label_override {
                self.label = label;
            }
            self.width = max_of(self.width, draft.body.width);
            self.height = max_of(self.height, draft.body.height);
            self.duration = max_of(self.duration, draft.body.duration);
            self.annotations.push(Annotation::new(
                annotation_id(&self.id, index),
                draft.motivation,
                self.id.clone(),
                draft.body,
            ));
        }
        self.width = self.width.or(info.width);
        self.height = self.height.or(info.height);
        self.duration = self.duration.or(info.duration);
    }

    /// The canvas as it appears in a manifest's `items`.
    pub fn to_iiif(&self) -> iiif::Canvas {
        iiif::Canvas {
            id: self.id.clone(),
            kind: "Canvas".to_string(),
            label: LanguageMap::none(self.label.as_str()),
            width: self.width,
            height: self.height,
            duration: self.duration,
            metadata: MetadataEntry::from_pairs(&self.metadata),
            thumbnail: self.thumbnail.iter().cloned().collect(),
            see_also: self.see_also.iter().cloned().collect(),
            items: vec![AnnotationPage::new(
                annotation_page_id(&self.id),
                self.annotations.clone(),
            )],
        }
    }
}

/// Builds the canvases of one manifest.
pub struct CanvasBuilder<'a> {
    ctx: &'a BuildContext<'a>,
    manifest_url: &'a Url,
    lineage: &'a Lineage<'a>,
    /// Explicit `thumb.*` of the manifest directory, shared by standalone
    /// canvases.
    shared_thumbnail: Option<&'a Path>,
}

impl<'a> CanvasBuilder<'a> {
    pub fn new(ctx: &'a BuildContext<'a>, manifest_url: &'a Url, lineage: &'a Lineage<'a>) -> Self {
        Self {
            ctx,
            manifest_url,
            lineage,
            shared_thumbnail: None,
        }
    }

    pub fn with_shared_thumbnail(mut self, thumbnail: Option<&'a Path>) -> Self {
        self.shared_thumbnail = thumbnail;
        self
    }

    /// Populate the canvas allocated under `id`.
    pub fn build(&self, source: &CanvasSource, id: String) -> Result<CanvasNode, CanvasError> {
        match source {
            CanvasSource::Directory(dir) => self.build_directory(dir, id),
            CanvasSource::File(file) => self.build_file(file, id),
        }
    }

    fn advise(&self, kind: AdvisoryKind, path: &Path, message: impl Into<String>) {
        self.ctx
            .advisories
            .advise(Advisory::new(kind, path, message));
    }

    fn build_directory(&self, dir: &Path, id: String) -> Result<CanvasNode, CanvasError> {
        let frame = self.lineage.child(dir);
        let dir_name = file_name_str(dir);
        let info = sidecar::read_info(dir)?;
        let label = resolve(&[info.label.as_deref(), Some(dir_name)]).unwrap_or_default();
        let dir_url = join_segment(self.manifest_url, dir_name)?;
        let entries = read_entries(dir).map_err(|source| CanvasError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let sidecars: Vec<&PathBuf> = entries
            .files
            .iter()
            .filter(|f| {
                let name = file_name_str(f);
                is_yaml_name(name) && name != INFO_SIDECAR
            })
            .collect();
        let media: Vec<&PathBuf> = entries
            .files
            .iter()
            .filter(|f| is_paintable(&self.ctx.config.annotation, f))
            .collect();

        let (custom, defaults) = rayon::join(
            || {
                sidecars
                    .par_iter()
                    .map(|path| self.custom_annotation(path, &id, &dir_url, &label))
                    .collect::<Result<Vec<_>, _>>()
            },
            || {
                media
                    .par_iter()
                    .map(|path| self.default_annotation(path, &dir_url, &label))
                    .collect::<Result<Vec<_>, _>>()
            },
        );
        let mut drafts = custom?;
        drafts.extend(defaults?);

        let thumbnail_source = drafts.iter().find_map(|d| d.local_image.clone());
        let mut canvas = CanvasNode::allocate(
            CanvasSource::Directory(dir.to_path_buf()),
            id,
            label,
            &info,
        );
        canvas.commit(drafts, &info);

        if let Some(hocr) = entries
            .files
            .iter()
            .find(|f| extension_of(file_name_str(f)).as_deref() == Some(HOCR_EXTENSION))
        {
            let hocr_url = join_segment(&dir_url, file_name_str(hocr))?;
            canvas.see_also = Some(SeeAlso::hocr(hocr_url.as_str()));
        }

        if canvas.annotations.is_empty() {
            self.advise(
                AdvisoryKind::MissingContent,
                dir,
                "canvas directory has no annotations and no paintable files",
            );
        }

        canvas.thumbnail = match thumbnail::explicit_in(&entries.files) {
            Some(explicit) => Some(thumbnail::resource_for(
                explicit,
                self.manifest_url,
                &frame,
                &self.ctx.config.annotation,
            )),
            None if self.ctx.config.thumbnails.generate => thumbnail_source.and_then(|source| {
                let output = thumbnail::canvas_dir_output(dir, &source)?;
                thumbnail::generate(self.ctx, &source, output, self.manifest_url, &frame)
            }),
            None => None,
        };

        Ok(canvas)
    }

    fn build_file(&self, file: &Path, id: String) -> Result<CanvasNode, CanvasError> {
        let label = file_stem_str(file).to_string();
        let info = InfoSidecar::default();
        let draft = self.default_annotation(file, self.manifest_url, &label)?;
        let thumbnail_source = draft.local_image.clone();

        let mut canvas = CanvasNode::allocate(CanvasSource::File(file.to_path_buf()), id, label, &info);
        canvas.commit(vec![draft], &info);

        let hocr = file.with_extension(HOCR_EXTENSION);
        if hocr.is_file() {
            let hocr_url = join_segment(self.manifest_url, file_name_str(&hocr))?;
            canvas.see_also = Some(SeeAlso::hocr(hocr_url.as_str()));
        }

        canvas.thumbnail = match self.shared_thumbnail {
            Some(explicit) => Some(thumbnail::resource_for(
                explicit,
                self.manifest_url,
                self.lineage,
                &self.ctx.config.annotation,
            )),
            None if self.ctx.config.thumbnails.generate => thumbnail_source.and_then(|source| {
                let output = thumbnail::standalone_output(self.lineage.path, &source);
                thumbnail::generate(self.ctx, &source, output, self.manifest_url, self.lineage)
            }),
            None => None,
        };

        Ok(canvas)
    }

    // =========================================================================
    // Default painting annotations
    // =========================================================================

    fn default_annotation(
        &self,
        file: &Path,
        base_url: &Url,
        label: &str,
    ) -> Result<Draft, CanvasError> {
        let name = file_name_str(file);
        let candidate = extension_of(name)
            .and_then(|ext| self.ctx.config.annotation.painting_default(&ext))
            .cloned();
        let body_url = join_segment(base_url, name)?;
        let mut body = Body {
            id: body_url.to_string(),
            kind: candidate.as_ref().map(|tf| tf.kind.clone()),
            format: candidate.map(|tf| tf.format),
            label: Some(LanguageMap::none(label)),
            ..Body::default()
        };

        let is_image = body
            .kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("image"));
        self.probe(&mut body, file);
        if is_image && self.ctx.config.tiles.enabled {
            self.attach_tiles(&mut body, file, base_url)?;
        }

        Ok(Draft {
            motivation: PAINTING.to_string(),
            body,
            label_override: None,
            local_image: is_image.then(|| file.to_path_buf()),
        })
    }

    fn attach_tiles(&self, body: &mut Body, file: &Path, base_url: &Url) -> Result<(), CanvasError> {
        let stem = file_stem_str(file);
        let Some(parent) = file.parent() else {
            return Ok(());
        };
        let service_url = join_segment(&join_segment(base_url, TILES_DIR)?, stem)?;
        let params = TileParams {
            source: file.to_path_buf(),
            output_dir: parent.join(TILES_DIR).join(stem),
            tile_size: self.ctx.config.tiles.tile_size,
            service_id: service_url.to_string(),
        };
        match ensure_tiles(self.ctx.backend, &params) {
            Ok(_) => body.service.push(Service::level0(params.service_id)),
            Err(e) => self.advise(
                AdvisoryKind::ProbeFailure,
                file,
                format!("cannot generate tiles: {e}"),
            ),
        }
        Ok(())
    }

    // =========================================================================
    // Custom annotations
    // =========================================================================

    fn custom_annotation(
        &self,
        path: &Path,
        canvas_id: &str,
        canvas_url: &Url,
        canvas_label: &str,
    ) -> Result<Draft, CanvasError> {
        let sidecar: AnnotationSidecar = sidecar::read_yaml(path)?.unwrap_or_default();
        let mapping = &self.ctx.config.annotation;

        let motivation = match sidecar
            .motivation
            .as_deref()
            .map(normalize_motivation)
            .filter(|m| !m.is_empty())
        {
            Some(m) => m,
            None => {
                self.advise(
                    AdvisoryKind::ConfigurationGap,
                    path,
                    "annotation has no motivation; assuming painting",
                );
                PAINTING.to_string()
            }
        };
        let painting = motivation == PAINTING;
        let recognized = mapping.is_recognized(&motivation);

        let value = sidecar
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let extension = value.and_then(extension_of);

        let id = match value {
            Some(v) if extension.is_some() && (painting || !recognized) => {
                let mut id = resolve_reference(canvas_url, v)?;
                if let Some(xywh) = sidecar.xywh.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    id.push_str("#xywh=");
                    id.push_str(xywh);
                }
                id
            }
            _ => synthetic_body_id(canvas_id, file_stem_str(path)),
        };

        let mut facts = Facts {
            motivation: &motivation,
            extension: extension.as_deref(),
            explicit_type: sidecar.kind.as_deref(),
            explicit_format: sidecar.format.as_deref(),
            resolved_type: None,
        };
        let kind = infer_type(mapping, &facts);
        self.report_inference(path, "type", kind.as_ref());
        facts.resolved_type = kind.as_ref().map(|k| k.value.as_str());
        let format = infer_format(mapping, &facts);
        self.report_inference(path, "format", format.as_ref());

        let mut body = Body {
            id,
            kind: kind.map(|k| k.value),
            format: format.map(|f| f.value),
            label: resolve(&[sidecar.label.as_deref(), Some(canvas_label)])
                .map(LanguageMap::none),
            ..Body::default()
        };

        let is_image = body
            .kind
            .as_deref()
            .is_some_and(|k| k.eq_ignore_ascii_case("image"));
        let is_service = extension_of(&body.id).as_deref() == Some("json");
        if is_image && is_service {
            body.service
                .push(Service::level2(strip_last_segment(&body.id)));
        }

        if recognized && !painting {
            body.value = value.map(String::from);
        }

        let mut local_image = None;
        if let Some(v) = value
            && !is_absolute_url(v)
            && body.kind.is_some()
            && !is_service
            && is_probeable(body.kind.as_deref())
        {
            let sidecar_dir = path.parent().unwrap_or(Path::new(""));
            let local = normalize_path(&sidecar_dir.join(v));
            if local.is_file() {
                self.probe(&mut body, &local);
                if painting && is_image {
                    local_image = Some(local);
                }
            } else {
                self.advise(
                    AdvisoryKind::ProbeFailure,
                    path,
                    format!("referenced file {} not found", local.display()),
                );
            }
        }

        Ok(Draft {
            motivation,
            body,
            label_override: sidecar.label.filter(|l| !l.trim().is_empty()),
            local_image,
        })
    }

    fn report_inference(&self, path: &Path, field: &str, inferred: Option<&Inferred>) {
        match inferred {
            Some(value) if value.is_guess() => tracing::debug!(
                path = %path.display(),
                field,
                value = %value.value,
                source = ?value.source,
                "inferred annotation {field}"
            ),
            Some(_) => {}
            None => self.advise(
                AdvisoryKind::ConfigurationGap,
                path,
                format!("unable to determine annotation {field}"),
            ),
        }
    }

    // =========================================================================
    // Probes
    // =========================================================================

    /// Fill in body extents from the media backend. Failures are advisories.
    fn probe(&self, body: &mut Body, file: &Path) {
        if extension_of(file_name_str(file)).as_deref() == Some("json") {
            return;
        }
        match body.kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("image") => match self.ctx.backend.identify(file) {
                Ok(dims) => {
                    body.width = Some(dims.width);
                    body.height = Some(dims.height);
                }
                Err(e) => self.advise(
                    AdvisoryKind::ProbeFailure,
                    file,
                    format!("cannot read image dimensions: {e}"),
                ),
            },
            Some("sound" | "video") => match self.ctx.backend.duration(file) {
                Ok(seconds) => body.duration = Some(seconds),
                Err(e) => self.advise(
                    AdvisoryKind::ProbeFailure,
                    file,
                    format!("cannot read duration: {e}"),
                ),
            },
            _ => {}
        }
    }
}

/// Whether a file in a canvas directory (or flat gallery) gets a default
/// painting annotation.
pub fn is_paintable(mapping: &AnnotationMapping, file: &Path) -> bool {
    let name = file_name_str(file);
    if is_thumbnail_name(name) || is_yaml_name(name) || name == DOCUMENT_NAME {
        return false;
    }
    match extension_of(name) {
        // Service descriptions are only referenced from sidecars.
        Some(ext) if ext == "json" => false,
        Some(ext) => mapping.painting_default(&ext).is_some(),
        None => false,
    }
}

fn is_probeable(kind: Option<&str>) -> bool {
    kind.is_some_and(|k| {
        ["image", "sound", "video"]
            .iter()
            .any(|probed| k.eq_ignore_ascii_case(probed))
    })
}
