//! Text LMF encoding.
//!
//! One record per line; every real number is printed with two decimals.

use std::io::Write;

use crate::extract::{DedupVertex, LeafMesh};
use crate::Result;

use super::{LmfDocument, NodeRecord};

/// Writes `doc` as human readable text.
///
/// Fails with [`Error::FormatMismatch`](crate::Error::FormatMismatch) before
/// writing anything if a vertex does not carry the document's channels.
pub fn write_ascii<W: Write>(doc: &LmfDocument, writer: &mut W) -> Result<()> {
    doc.check_channels()?;

    writeln!(writer, "name: {}", doc.name)?;
    writeln!(writer, "node_count: {}", doc.nodes.len())?;
    writeln!(writer, "mesh_objects: {}", doc.meshes.len())?;
    writeln!(writer, "submesh_per_object: {}", doc.material_count)?;

    for node in &doc.nodes {
        write_node(writer, node)?;
    }

    for (mesh_id, mesh) in doc.meshes.iter().enumerate() {
        write_mesh(writer, mesh_id, mesh)?;
    }

    Ok(())
}

fn write_node<W: Write>(writer: &mut W, node: &NodeRecord) -> Result<()> {
    let (min, max) = (node.aabb.min(), node.aabb.max());
    writeln!(
        writer,
        "node[{}]: parent({}), aabb({:.2} {:.2} {:.2} | {:.2} {:.2} {:.2}) mesh_id({})",
        node.id, node.parent_id, min.x, min.y, min.z, max.x, max.y, max.z, node.mesh_id
    )?;
    Ok(())
}

fn write_mesh<W: Write>(writer: &mut W, mesh_id: usize, mesh: &LeafMesh) -> Result<()> {
    writeln!(
        writer,
        "mesh[{mesh_id}]: name({}) vertex_count({}) unique_verts({}) poly_count({})",
        mesh.name,
        mesh.source_vertex_count,
        mesh.vertices.len(),
        mesh.triangle_count()
    )?;

    for (i, vertex) in mesh.vertices.iter().enumerate() {
        writeln!(writer, "v[{i}]:{}", vertex_fields(vertex))?;
    }

    for (i, triangles) in mesh.submeshes.iter().enumerate() {
        writeln!(writer, "submesh[{i}]: tris({})", triangles.len())?;
        for (t, [a, b, c]) in triangles.iter().enumerate() {
            writeln!(writer, "t[{t}]: {a} {b} {c}")?;
        }
    }

    Ok(())
}

/// Formats the enabled channels of a vertex, each preceded by a space.
fn vertex_fields(v: &DedupVertex) -> String {
    let mut out = String::new();
    if let Some([x, y, z]) = v.position {
        out.push_str(&format!(" pos({x:.2} {y:.2} {z:.2})"));
    }
    if let Some([x, y, z]) = v.normal {
        out.push_str(&format!(" norm({x:.2} {y:.2} {z:.2})"));
    }
    if let Some([u, w]) = v.uv0 {
        out.push_str(&format!(" uv0({u:.2} {w:.2})"));
    }
    if let Some([tx, ty, tz, bx, by, bz]) = v.tangent_bitangent {
        out.push_str(&format!(
            " tgt({tx:.2} {ty:.2} {tz:.2} | {bx:.2} {by:.2} {bz:.2})"
        ));
    }
    if let Some([u, w]) = v.uv1 {
        out.push_str(&format!(" uv1({u:.2} {w:.2})"));
    }
    out
}
