//! KD partitioning of triangle meshes and the Large Mesh Format (LMF).
//!
//! A mesh is split into spatially coherent chunks by a [`KdTree`]. Each
//! non-empty leaf is turned into a self-contained [`LeafMesh`] with
//! deduplicated vertices and one triangle list per material, and the whole
//! tree is written as an LMF file in text or binary form.
//!
//! ```ignore
//! use lmf_tree::{export, ExportSettings, IndexedMesh};
//!
//! let mesh = IndexedMesh::new(data)?;
//! let tree = export(&mesh, &ExportSettings::default(), "city.lmf")?;
//! ```

mod aabb;
pub mod codec;
mod error;
mod export;
pub mod extract;
mod format;
pub mod geometry;
pub mod kd;

pub use aabb::{Aabb, Axis};
pub use codec::{
    read_binary, write_ascii, write_binary, Encoding, FileMesh, FileNode, LmfDocument, LmfFile,
    NodeRecord, SubmeshRange,
};
pub use error::{Error, Result};
pub use export::{
    export, export_to_writer, prepare, ExportSettings, MAX_DEPTH_RANGE, MIN_THRESHOLD,
};
pub use extract::{extract_all, extract_leaf, DedupVertex, LeafMesh};
pub use format::VertexFormat;
pub use geometry::{validate_source, GeometrySource, IndexedMesh, MeshData, PolygonData, PolygonRef};
pub use kd::{
    CollectingVisitor, FnVisitor, KdNode, KdTree, KdVisitor, NodeId, SplitCriterion, SplitLimit,
};
