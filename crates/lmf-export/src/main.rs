//! Large Mesh Format exporter.
//!
//! Reads a mesh (JSON buffers or a generated demo grid), partitions it with a
//! KD tree and writes the result as a text or binary LMF file.
//!
//! Settings are resolved in order: built-in defaults, then the `--config`
//! TOML file, then individual flags.

mod config;
mod scene;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lmf_tree::{
    Encoding, ExportSettings, FnVisitor, IndexedMesh, KdNode, KdTree, MeshData, SplitCriterion,
    VertexFormat,
};

use config::SettingsFile;

/// Partitions a mesh and writes it as an LMF file.
#[derive(Parser, Debug)]
#[command(name = "lmf-export")]
#[command(about = "Partitions a triangle mesh with a KD tree and writes a Large Mesh Format file")]
struct Args {
    /// Mesh buffers as JSON.
    #[arg(short, long, conflicts_with = "demo", required_unless_present = "demo")]
    input: Option<PathBuf>,

    /// Export a generated grid of N x N cubes instead of reading a file.
    #[arg(long, value_name = "N")]
    demo: Option<u32>,

    /// Destination file.
    #[arg(short, long)]
    output: PathBuf,

    /// Settings TOML file, applied before the flags below.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum tree depth (4 to 32).
    #[arg(long)]
    max_depth: Option<i32>,

    /// Split criterion: polycount, volume, area or extent.
    #[arg(long)]
    criterion: Option<SplitCriterion>,

    /// Criterion value above which a node is split.
    #[arg(long)]
    threshold: Option<f64>,

    /// Vertex channels, e.g. "pos,normal,uv0".
    #[arg(short, long)]
    format: Option<VertexFormat>,

    /// Output encoding: ascii or binary.
    #[arg(short, long)]
    encoding: Option<Encoding>,

    /// Print the tree after export.
    #[arg(long)]
    dump_tree: bool,

    /// Log every leaf as it is extracted.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> Result<ExportSettings> {
        let mut settings = ExportSettings::default();
        if let Some(path) = &self.config {
            SettingsFile::load(path)?.apply(&mut settings)?;
        }
        if let Some(max_depth) = self.max_depth {
            settings.max_depth = max_depth;
        }
        if let Some(criterion) = self.criterion {
            settings.criterion = criterion;
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if let Some(format) = self.format {
            settings.vertex_format = format;
        }
        if let Some(encoding) = self.encoding {
            settings.encoding = encoding;
        }
        Ok(settings)
    }

    fn mesh_data(&self) -> Result<MeshData> {
        if let Some(side) = self.demo {
            return Ok(scene::generate_cube_grid(side, 2.0));
        }
        let Some(path) = &self.input else {
            anyhow::bail!("either --input or --demo is required");
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mesh file: {}", path.display()))?;
        let mut data: MeshData = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse mesh JSON: {}", path.display()))?;
        if data.name.is_empty() {
            data.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "mesh".to_owned());
        }
        Ok(data)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let settings = args.settings()?;
    log::info!(
        "settings: max depth {}, {} > {}, format {}, {}",
        settings.max_depth,
        settings.criterion,
        settings.threshold,
        settings.vertex_format,
        settings.encoding
    );

    let mesh = IndexedMesh::new(args.mesh_data()?).context("Invalid mesh buffers")?;
    let tree = lmf_tree::export(&mesh, &settings, &args.output)
        .with_context(|| format!("Failed to export {}", args.output.display()))?;

    println!(
        "Wrote {} ({} nodes, {} leaf meshes, depth {})",
        args.output.display(),
        tree.node_count(),
        tree.mesh_leaves().count(),
        tree.depth()
    );

    if args.dump_tree {
        dump_tree(&tree);
    }

    Ok(())
}

/// Prints one line per node, indented by depth, in depth-first order.
fn dump_tree(tree: &KdTree) {
    let mut visitor = FnVisitor::new(|node: &KdNode| {
        let indent = "  ".repeat(node.depth() as usize);
        let kind = if node.is_leaf() {
            format!("leaf, {} polygons", node.polygons().len())
        } else {
            format!("split {:?}", node.split_axis())
        };
        let parent = node.parent().map_or_else(|| "-".to_owned(), |p| p.to_string());
        println!("{indent}node {} (parent {parent}): {kind}", node.id());
    });
    tree.traverse_depth_first(&mut visitor);
}
