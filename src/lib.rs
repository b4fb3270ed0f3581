//! # Simple IIIF
//!
//! Turns a directory tree of media files and YAML sidecars into static
//! [IIIF Presentation 3.0](https://iiif.io/api/presentation/3.0/) documents:
//! one `index.json` per directory, next to the content it describes.
//!
//! ```text
//! archive/                  → Collection   archive/index.json
//! ├── book/                 → Manifest     archive/book/index.json
//! │   ├── _page-1/          →   Canvas     …/index.json/canvas/0
//! │   │   ├── page.jpg      →     painting annotation
//! │   │   └── comment.yml   →     custom annotation
//! │   └── _page-2/          →   Canvas     …/index.json/canvas/1
//! └── plates/               → Manifest     archive/plates/index.json
//!     ├── plate-1.jpg       →   Canvas (one per file)
//!     └── plate-2.jpg
//! ```
//!
//! # Build Flow
//!
//! ```text
//! walk ─► classify ─► canvases ∥ children ─► emit index.json
//!                        │
//!                        └─► sidecars ∥ media ─► inference ─► ids
//! ```
//!
//! A directory is classified once, before anything below it is built. Its
//! canvases and child directories are then built concurrently on the rayon
//! pool, and its own document is written after all of them have finished.
//! Ids are derived from the base URL and relative paths only, so rebuilding
//! an unchanged tree writes byte-identical documents.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Tree walker and classifier; emits Collection and Manifest documents |
//! | [`canvas`] | Canvas builder: custom annotation sidecars and default painting annotations |
//! | [`inference`] | Prioritized rule chains that infer annotation body type and format |
//! | [`mapping`] | Motivation → extension → `{type, format}` candidates |
//! | [`identifier`] | URL joins, fixed id shapes, virtual names, and the path merge |
//! | [`sidecar`] | `info.yml`, `manifests.yml`, and custom annotation sidecars |
//! | [`iiif`] | Serde model of the emitted documents |
//! | [`thumbnail`] | Explicit `thumb.*` files and generated thumbnails |
//! | [`media`] | Media probes and derived images behind the [`media::MediaBackend`] trait |
//! | [`advisory`] | Non-fatal diagnostics and the sinks that receive them |
//! | [`writer`] | Document destinations (filesystem or memory) |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`naming`] | Reserved name prefixes and natural ordering |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//!
//! # Naming Conventions
//!
//! | Name | Meaning |
//! |------|---------|
//! | `_name/` | Canvas directory |
//! | `+name`, `!name` | Excluded from the walk (`!thumbs/`, `!tiles/` hold generated files) |
//! | `.name` | Hidden, ignored |
//! | `thumb.<ext>` | Explicit thumbnail of the enclosing node |
//! | `info.yml` | Label and descriptive metadata |
//! | `manifests.yml` | Remote manifests listed in a collection |
//! | `*.hocr` | OCR cross-reference (`seeAlso`) of a canvas |
//!
//! # Advisories
//!
//! Problems the build can work around (an undeterminable format, an empty
//! manifest, an unreadable audio file) never fail the run. They are handed
//! to an [`advisory::AdvisorySink`], which the binary logs and `check` lists.
//! Only unreadable input and unwritable output are errors.

pub mod advisory;
pub mod canvas;
pub mod config;
pub mod identifier;
pub mod iiif;
pub mod inference;
pub mod logging;
pub mod mapping;
pub mod media;
pub mod naming;
pub mod output;
pub mod sidecar;
pub mod thumbnail;
pub mod walk;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;
