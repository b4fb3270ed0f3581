//! End-to-end builds with the real media backend and the filesystem writer.
//!
//! Fixtures are generated on the fly: small PNG/JPEG images through the
//! `image` crate and a PCM WAV file written byte by byte.

use serde_json::Value;
use simple_iiif::advisory::{AdvisoryKind, RecordingSink};
use simple_iiif::config::SiteConfig;
use simple_iiif::media::RustBackend;
use simple_iiif::walk::{self, BuildContext, DirectoryNode, NodeKind};
use simple_iiif::writer::FsWriter;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Fixtures
// =========================================================================

fn write_image(dir: &Path, rel: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbImage::from_pixel(width, height, image::Rgb([120, 80, 40]))
        .save(&path)
        .unwrap();
    path
}

fn write_text(dir: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// One second of 8 kHz mono 16-bit silence.
fn write_wav(dir: &Path, rel: &str) -> PathBuf {
    let sample_rate: u32 = 8000;
    let data_len: u32 = sample_rate * 2;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);

    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, bytes).unwrap();
    path
}

struct Built {
    node: DirectoryNode,
    sink: RecordingSink,
}

fn build(root: &Path, url: &str, virtual_name: Option<&str>, config: &SiteConfig) -> Built {
    let backend = RustBackend::new();
    let sink = RecordingSink::new();
    let ctx = BuildContext {
        config,
        backend: &backend,
        writer: &FsWriter,
        advisories: &sink,
    };
    let node = walk::build(root, url, virtual_name, &ctx).unwrap();
    Built { node, sink }
}

fn no_thumbnails() -> SiteConfig {
    let mut config = SiteConfig::default();
    config.thumbnails.generate = false;
    config
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap()
}

/// Every `index.json` under `root`, keyed by relative path.
fn snapshot(root: &Path) -> Vec<(PathBuf, String)> {
    let mut docs: Vec<(PathBuf, String)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_name() == "index.json")
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read_to_string(e.path()).unwrap())
        })
        .collect();
    docs.sort();
    docs
}

fn archive_fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("archive");
    write_image(&root, "book/_page-1/page.png", 64, 48);
    write_image(&root, "book/_page-2/page.png", 32, 96);
    write_text(&root, "book/_page-2/note.yml", "motivation: commenting\nvalue: Water damage\nformat: text/plain\n");
    write_text(&root, "book/info.yml", "label: Herbarium\nattribution: Example Library\n");
    write_image(&root, "plates/plate-10.png", 20, 20);
    write_image(&root, "plates/plate-2.png", 20, 20);
    write_wav(&root, "plates/narration.wav");
    write_text(
        &root,
        "manifests.yml",
        "manifests:\n  - id: https://example.org/iiif/atlas/manifest.json\n",
    );
    tmp
}

// =========================================================================
// Classification and ids
// =========================================================================

#[test]
fn archive_tree_is_classified_and_written() {
    let tmp = archive_fixture();
    let root = tmp.path().join("archive");

    let built = build(&root, "http://host/archive", None, &no_thumbnails());

    assert_eq!(built.node.kind, NodeKind::Collection);
    let kinds: Vec<(&str, NodeKind)> = built
        .node
        .children
        .iter()
        .map(|c| (c.label.as_str(), c.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![("Herbarium", NodeKind::Manifest), ("plates", NodeKind::Manifest)]
    );
    for rel in ["index.json", "book/index.json", "plates/index.json"] {
        assert!(root.join(rel).is_file(), "{rel} not written");
    }

    let collection = read_json(&root.join("index.json"));
    assert_eq!(collection["type"], "Collection");
    assert_eq!(collection["id"], "http://host/archive/index.json");
    let labels: Vec<&str> = collection["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["label"]["none"][0].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["atlas", "Herbarium", "plates"]);
}

#[test]
fn canvas_ids_are_contiguous_in_discovery_order() {
    let tmp = archive_fixture();
    let root = tmp.path().join("archive");

    build(&root, "http://host/archive", None, &no_thumbnails());

    let book = read_json(&root.join("book/index.json"));
    let ids: Vec<&str> = book["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "http://host/archive/book/index.json/canvas/0",
            "http://host/archive/book/index.json/canvas/1",
        ]
    );
    assert_eq!(book["requiredStatement"]["value"]["none"][0], "Example Library");

    let second = &book["items"][1];
    let annotations = second["items"][0]["items"].as_array().unwrap();
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0]["motivation"], "commenting");
    assert_eq!(annotations[0]["body"]["value"], "Water damage");
    assert_eq!(annotations[1]["motivation"], "painting");
    assert_eq!(
        annotations[1]["id"],
        "http://host/archive/book/index.json/canvas/1/annotation/1"
    );
    assert_eq!((second["width"].as_u64(), second["height"].as_u64()), (Some(32), Some(96)));
}

#[test]
fn flat_gallery_orders_files_naturally_and_probes_audio() {
    let tmp = archive_fixture();
    let root = tmp.path().join("archive");

    build(&root, "http://host/archive", None, &no_thumbnails());

    let plates = read_json(&root.join("plates/index.json"));
    let labels: Vec<&str> = plates["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["label"]["none"][0].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["narration", "plate-2", "plate-10"]);

    let narration = &plates["items"][0];
    let duration = narration["duration"].as_f64().unwrap();
    assert!((duration - 1.0).abs() < 0.01, "duration was {duration}");
    let body = &narration["items"][0]["items"][0]["body"];
    assert_eq!(body["type"], "Sound");
    assert_eq!(body["format"], "audio/wav");
    assert_eq!(body["id"], "http://host/archive/plates/narration.wav");
}

#[test]
fn single_page_canvas_directory() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("book");
    write_image(&root, "_chapter1/page.jpg", 40, 30);

    let built = build(&root, "http://host/book", None, &no_thumbnails());

    assert_eq!(built.node.kind, NodeKind::Manifest);
    let manifest = read_json(&root.join("index.json"));
    let annotations = manifest["items"][0]["items"][0]["items"].as_array().unwrap();
    assert_eq!(annotations.len(), 1);
    let body = &annotations[0]["body"];
    assert!(body["id"].as_str().unwrap().ends_with("/page.jpg"));
    assert_eq!(body["type"], "Image");
    assert_eq!(body["format"], "image/jpeg");
    assert_eq!(body["width"], 40);
    assert_eq!(body["height"], 30);
    assert!(built.sink.is_empty(), "{:?}", built.sink.advisories());
}

// =========================================================================
// Custom annotations
// =========================================================================

#[test]
fn explicit_type_and_format_survive_inference() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("book");
    write_image(&root, "_p1/scan.png", 10, 10);
    write_text(
        &root,
        "_p1/scan.yml",
        "motivation: painting\nvalue: scan.png\ntype: Dataset\nformat: application/octet-stream\n",
    );

    build(&root, "http://host/book", None, &no_thumbnails());

    let manifest = read_json(&root.join("index.json"));
    let body = &manifest["items"][0]["items"][0]["items"][0]["body"];
    assert_eq!(body["id"], "http://host/book/_p1/scan.png");
    assert_eq!(body["type"], "Dataset");
    assert_eq!(body["format"], "application/octet-stream");
}

#[test]
fn format_only_sidecar_infers_image_type() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("book");
    write_image(&root, "assets/cover.jpg", 24, 36);
    write_text(
        &root,
        "_p1/cover.yml",
        "format: image/jpeg\nvalue: ../assets/cover.jpg\n",
    );

    let built = build(&root, "http://host/book", None, &no_thumbnails());

    let manifest = read_json(&root.join("index.json"));
    let canvas = &manifest["items"][0];
    let body = &canvas["items"][0]["items"][0]["body"];
    assert_eq!(body["id"], "http://host/book/assets/cover.jpg");
    assert_eq!(body["type"], "Image");
    assert_eq!(body["format"], "image/jpeg");
    assert_eq!(canvas["width"], 24);
    assert_eq!(canvas["height"], 36);
    // The plain `assets/` directory beside a canvas directory is reported.
    assert_eq!(built.sink.of_kind(AdvisoryKind::AmbiguousStructure).len(), 1);
}

// =========================================================================
// Thumbnails, virtual names, idempotence
// =========================================================================

#[test]
fn generated_thumbnails_propagate_through_virtual_names() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("xYz123");
    write_image(&root, "book/_p1/page.png", 400, 200);
    write_image(&root, "book/_p2/page.png", 400, 200);

    let built = build(&root, "http://host/my-book", Some("my-book"), &SiteConfig::default());

    let thumb = root.join("book/_p1/thumb.png");
    assert!(thumb.is_file());
    assert_eq!(image::image_dimensions(&thumb).unwrap(), (200, 100));

    let expected = "http://host/my-book/book/_p1/thumb.png";
    let book = read_json(&root.join("book/index.json"));
    assert_eq!(book["items"][0]["thumbnail"][0]["id"], expected);
    assert_eq!(book["thumbnail"][0]["id"], expected);
    let collection = read_json(&root.join("index.json"));
    assert_eq!(collection["items"][0]["thumbnail"][0]["id"], expected);
    assert_eq!(built.node.thumbnail.unwrap().id, expected);
}

#[test]
fn rebuilding_writes_identical_documents() {
    let tmp = archive_fixture();
    let root = tmp.path().join("archive");
    let config = SiteConfig::default();

    build(&root, "http://host/archive", None, &config);
    let first = snapshot(&root);
    build(&root, "http://host/archive", None, &config);
    let second = snapshot(&root);

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[test]
fn tiles_are_generated_beside_images() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("book");
    write_image(&root, "_p1/page.png", 300, 200);
    let mut config = no_thumbnails();
    config.tiles.enabled = true;
    config.tiles.tile_size = 128;

    build(&root, "http://host/book", None, &config);

    let info = read_json(&root.join("_p1/!tiles/page/info.json"));
    assert_eq!(info["width"], 300);
    assert_eq!(info["@id"], "http://host/book/_p1/!tiles/page");
    assert!(root.join("_p1/!tiles/page/0,0,128,128/128,/0/default.jpg").is_file());

    let manifest = read_json(&root.join("index.json"));
    let service = &manifest["items"][0]["items"][0]["items"][0]["body"]["service"][0];
    assert_eq!(service["id"], "http://host/book/_p1/!tiles/page");
    assert_eq!(service["profile"], "level0");
}
