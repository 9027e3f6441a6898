//! End-to-end export: settings, validation, partitioning, and file output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::codec::{Encoding, LmfDocument};
use crate::geometry::validate_source;
use crate::kd::{KdTree, SplitCriterion, SplitLimit};
use crate::{Error, GeometrySource, Result, VertexFormat};

/// Depth range accepted at the export surface.
pub const MAX_DEPTH_RANGE: RangeInclusive<i32> = 4..=32;

/// Smallest criterion threshold accepted at the export surface.
pub const MIN_THRESHOLD: f64 = 1.0;

/// Settings for one export call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    pub max_depth: i32,
    pub criterion: SplitCriterion,
    pub threshold: f64,
    pub vertex_format: VertexFormat,
    pub encoding: Encoding,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            max_depth: 10,
            criterion: SplitCriterion::Polycount,
            threshold: 1000.0,
            vertex_format: VertexFormat::default(),
            encoding: Encoding::Ascii,
        }
    }
}

impl ExportSettings {
    /// Checks the ranges of the export surface and returns the tree limit.
    pub fn validate(&self) -> Result<SplitLimit> {
        if !MAX_DEPTH_RANGE.contains(&self.max_depth) {
            return Err(Error::Configuration(format!(
                "max depth {} outside {}..={}",
                self.max_depth,
                MAX_DEPTH_RANGE.start(),
                MAX_DEPTH_RANGE.end()
            )));
        }
        if !(self.threshold.is_finite() && self.threshold >= MIN_THRESHOLD) {
            return Err(Error::Configuration(format!(
                "threshold {} must be at least {MIN_THRESHOLD}",
                self.threshold
            )));
        }
        SplitLimit::new(self.max_depth, self.criterion, self.threshold)
    }
}

/// Partitions `source` and assembles the document to write.
///
/// Everything that can fail for reasons other than I/O fails here.
pub fn prepare<G: GeometrySource + ?Sized>(
    source: &G,
    settings: &ExportSettings,
) -> Result<(KdTree, LmfDocument)> {
    let limit = settings.validate()?;
    validate_source(source)?;
    settings.vertex_format.check_against(source)?;

    let tree = KdTree::from_source(source, &limit)?;
    let doc = LmfDocument::build(&tree, source, settings.vertex_format)?;
    doc.check_encodable(settings.encoding)?;
    log::info!(
        "partitioned '{}': {} polygons into {} nodes, {} leaf meshes",
        source.mesh_name(),
        source.polygon_count(),
        tree.node_count(),
        doc.meshes.len()
    );
    Ok((tree, doc))
}

/// Exports `source` into an arbitrary writer.
pub fn export_to_writer<G, W>(
    source: &G,
    settings: &ExportSettings,
    writer: &mut W,
) -> Result<KdTree>
where
    G: GeometrySource + ?Sized,
    W: Write,
{
    let (tree, doc) = prepare(source, settings)?;
    doc.write(settings.encoding, writer)?;
    writer.flush()?;
    Ok(tree)
}

/// Exports `source` into the file at `path`.
///
/// The file is only created once the tree and every leaf mesh have been
/// built, so configuration, input and format errors never leave a file
/// behind. An I/O error while writing can leave a partial file.
pub fn export<G, P>(source: &G, settings: &ExportSettings, path: P) -> Result<KdTree>
where
    G: GeometrySource + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let (tree, doc) = prepare(source, settings)?;

    {
        let mut writer = BufWriter::new(File::create(path)?);
        doc.write(settings.encoding, &mut writer)?;
        writer.flush()?;
    }

    log::info!("wrote {} file {}", settings.encoding, path.display());
    Ok(tree)
}
