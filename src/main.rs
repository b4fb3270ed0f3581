use clap::{Parser, Subcommand};
use simple_iiif::advisory::{RecordingSink, TracingSink};
use simple_iiif::logging::{self, Verbosity};
use simple_iiif::media::RustBackend;
use simple_iiif::walk::{self, BuildContext};
use simple_iiif::writer::{FsWriter, MemoryWriter};
use simple_iiif::{config, output};
use std::path::PathBuf;

/// Source, URL, and naming flags shared by `build` and `check`.
#[derive(clap::Args, Clone)]
struct TreeArgs {
    /// Content directory
    source: PathBuf,

    /// Published URL of the content directory
    url: String,

    /// Name published in place of the content directory's real name
    /// (defaults to the URL's last path segment)
    #[arg(long)]
    virtual_name: Option<String>,
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    #[command(flatten)]
    tree: TreeArgs,

    /// Do not generate thumbnails (explicit thumb.* files are still used)
    #[arg(long)]
    no_thumbs: bool,
}

#[derive(Parser)]
#[command(name = "simple-iiif")]
#[command(about = "Static IIIF Presentation 3.0 generator")]
#[command(long_about = "\
Static IIIF Presentation 3.0 generator

Your filesystem is the data source. Directories become collections and
manifests, underscore-prefixed directories become canvases, and YAML
sidecars add labels, metadata, and custom annotations.

Content structure:

  archive/
  ├── config.toml                  # Site config (optional)
  ├── info.yml                     # Label, description, metadata
  ├── manifests.yml                # Remote manifests listed in this collection
  ├── book/                        # Manifest (has canvas directories)
  │   ├── thumb.jpg                # Explicit thumbnail
  │   ├── _page-1/                 # Canvas
  │   │   ├── page.jpg             # Painting annotation
  │   │   ├── page.hocr            # OCR cross-reference
  │   │   └── comment.yml          # Custom annotation
  │   └── _page-2/
  │       └── page.jpg
  ├── plates/                      # Manifest (one canvas per file)
  │   ├── plate-1.jpg
  │   └── plate-2.jpg
  └── +drafts/                     # Excluded

Every directory gets an index.json written next to its content.

Run 'simple-iiif gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Log discovery and inference details
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write index.json documents for the whole tree
    Build(BuildArgs),
    /// Run the full build in memory and list every advisory
    Check(TreeArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet));

    match cli.command {
        Command::Build(args) => {
            let tree = &args.tree;
            let mut site_config = config::load_config(&tree.source)?;
            if args.no_thumbs {
                site_config.thumbnails.generate = false;
            }
            init_thread_pool(&site_config.processing);

            println!("==> Building {} → {}", tree.source.display(), tree.url);
            let backend = RustBackend::new();
            let sink = TracingSink::new();
            let ctx = BuildContext {
                config: &site_config,
                backend: &backend,
                writer: &FsWriter,
                advisories: &sink,
            };
            let node = walk::build(&tree.source, &tree.url, tree.virtual_name.as_deref(), &ctx)?;
            output::print_build_summary(&node, &node.path);
            println!("==> Build complete: {} advisories", sink.count());
        }
        Command::Check(tree) => {
            let mut site_config = config::load_config(&tree.source)?;
            site_config.thumbnails.generate = false;
            site_config.tiles.enabled = false;
            init_thread_pool(&site_config.processing);

            println!("==> Checking {}", tree.source.display());
            let backend = RustBackend::new();
            let sink = RecordingSink::new();
            let writer = MemoryWriter::new();
            let ctx = BuildContext {
                config: &site_config,
                backend: &backend,
                writer: &writer,
                advisories: &sink,
            };
            let node = walk::build(&tree.source, &tree.url, tree.virtual_name.as_deref(), &ctx)?;
            output::print_build_summary(&node, &node.path);
            println!();
            output::print_advisories(&sink.advisories(), &node.path);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
