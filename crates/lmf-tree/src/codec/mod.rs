//! Large Mesh Format (LMF) encoders.
//!
//! A file describes one partitioned mesh: a header, every KD node in
//! breadth-first order with its Y-up bounds, and the extracted mesh of each
//! non-empty leaf. The same content has two encodings:
//!
//! - [`Encoding::Ascii`]: line-oriented text meant for inspection
//! - [`Encoding::Binary`]: little-endian layout meant for streaming into a renderer
//!
//! Both are produced from an [`LmfDocument`], which gathers everything a
//! writer needs so that all validation happens before any byte is written.

mod ascii;
mod binary;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use rustc_hash::FxHashMap;

pub use ascii::write_ascii;
pub use binary::{
    read_binary, write_binary, FileMesh, FileNode, LmfFile, SubmeshRange, NAME_LEN, NODE_RECORD_LEN,
};

use crate::extract::{extract_all, LeafMesh};
use crate::kd::{KdTree, NodeId};
use crate::{Aabb, Error, GeometrySource, Result, VertexFormat};

/// Output encoding of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Human readable text.
    #[default]
    Ascii,
    /// Compact little-endian binary.
    Binary,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Ascii => "ascii",
            Encoding::Binary => "binary",
        })
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascii" | "text" => Ok(Encoding::Ascii),
            "binary" | "bin" => Ok(Encoding::Binary),
            other => Err(Error::Configuration(format!("unknown encoding '{other}'"))),
        }
    }
}

/// Topology record of one tree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeRecord {
    pub id: i32,
    /// Parent id, -1 for the root.
    pub parent_id: i32,
    /// Node bounds in the Y-up output frame.
    pub aabb: Aabb,
    /// Index into [`LmfDocument::meshes`], -1 for branches and empty leaves.
    pub mesh_id: i32,
}

/// Everything written to an LMF file.
#[derive(Debug, Clone, PartialEq)]
pub struct LmfDocument {
    pub name: String,
    pub format: VertexFormat,
    /// Submeshes per leaf mesh.
    pub material_count: u32,
    pub nodes: Vec<NodeRecord>,
    pub meshes: Vec<LeafMesh>,
}

impl LmfDocument {
    /// Extracts every mesh leaf of `tree` and assembles the document.
    pub fn build<G: GeometrySource + ?Sized>(
        tree: &KdTree,
        source: &G,
        format: VertexFormat,
    ) -> Result<Self> {
        let meshes = extract_all(tree, source, format)?;
        Self::from_parts(
            source.mesh_name().to_owned(),
            format,
            source.material_count(),
            tree,
            meshes,
        )
    }

    /// Assembles a document from a tree and its already extracted meshes.
    ///
    /// `meshes` must hold one mesh per non-empty leaf, in breadth-first order.
    pub fn from_parts(
        name: String,
        format: VertexFormat,
        material_count: u32,
        tree: &KdTree,
        meshes: Vec<LeafMesh>,
    ) -> Result<Self> {
        let leaf_ids: Vec<NodeId> = tree.mesh_leaves().map(|n| n.id()).collect();
        let mesh_ids: Vec<NodeId> = meshes.iter().map(|m| m.node_id).collect();
        if leaf_ids != mesh_ids {
            return Err(Error::InvalidInput(format!(
                "meshes for nodes {mesh_ids:?} do not match the tree's mesh leaves {leaf_ids:?}"
            )));
        }
        let by_node: FxHashMap<NodeId, usize> =
            mesh_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let nodes = tree
            .nodes()
            .iter()
            .map(|node| -> Result<NodeRecord> {
                Ok(NodeRecord {
                    id: to_i32("node id", node.id())?,
                    parent_id: node
                        .parent()
                        .map(|p| to_i32("node id", p))
                        .transpose()?
                        .unwrap_or(-1),
                    aabb: node.aabb().to_y_up(),
                    mesh_id: by_node
                        .get(&node.id())
                        .map(|&m| to_i32("mesh id", m))
                        .transpose()?
                        .unwrap_or(-1),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let doc = Self {
            name,
            format,
            material_count,
            nodes,
            meshes,
        };
        doc.check_channels()?;
        Ok(doc)
    }

    /// Checks that every vertex carries exactly the implemented channels of
    /// [`LmfDocument::format`], which is what the stride in the header promises.
    pub fn check_channels(&self) -> Result<()> {
        let expected = self.format & VertexFormat::SUPPORTED;
        for mesh in &self.meshes {
            if let Some(vertex) = mesh.vertices.iter().find(|v| v.format() != expected) {
                return Err(Error::FormatMismatch(format!(
                    "mesh of node {} has a vertex with channels '{}', expected '{expected}'",
                    mesh.node_id,
                    vertex.format()
                )));
            }
        }
        Ok(())
    }

    /// Checks that the document fits the fields of `encoding` without writing it.
    pub fn check_encodable(&self, encoding: Encoding) -> Result<()> {
        match encoding {
            Encoding::Ascii => self.check_channels(),
            Encoding::Binary => binary::check_limits(self).map(|_| ()),
        }
    }

    /// Writes the document with the given encoding.
    pub fn write<W: Write>(&self, encoding: Encoding, writer: &mut W) -> Result<()> {
        match encoding {
            Encoding::Ascii => write_ascii(self, writer),
            Encoding::Binary => write_binary(self, writer),
        }
    }
}

fn to_i32(what: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::CountOverflow { what, count: value })
}
