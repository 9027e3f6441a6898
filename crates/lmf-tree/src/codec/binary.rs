//! Binary LMF encoding.
//!
//! All integers and floats are little-endian.
//!
//! ```text
//! header
//!   u8      vertex format flags
//!   u8      bytes per vertex
//!   u16     node count
//!   u16     leaf mesh count
//!   u16     submesh count (material count, shared by every leaf mesh)
//!   u8[32]  mesh name, UTF-8, zero padded
//! node (node count times, breadth-first, 36 bytes)
//!   i32     id
//!   i32     parent id, -1 for the root
//!   f32[6]  aabb min xyz, max xyz (Y-up)
//!   i32     leaf mesh id, -1 if none
//! leaf mesh (leaf mesh count times)
//!   u32     block size, bytes that follow in this block
//!   u16     vertex count
//!   u16     triangle count
//!   u16[2]  start triangle, element count (submesh count times)
//!   f32[]   vertex components (vertex count times: pos, normal, uv0, tangent+bitangent, uv1)
//!   u16[3]  vertex indices (triangle count times, in submesh order)
//! ```
//!
//! The file ends after the last leaf mesh.

use std::io::{self, Read, Write};

use crate::{Error, Result, VertexFormat};

use super::LmfDocument;

/// Size of the zero-padded name field.
pub const NAME_LEN: usize = 32;

/// Size of one node record.
pub const NODE_RECORD_LEN: usize = 36;

/// Writes `doc` in the binary layout.
///
/// Every count is checked against its 16-bit field, and every vertex against
/// the header's channels, before the first byte is written. An oversized
/// document fails with [`Error::CountOverflow`], a vertex with other channels
/// with [`Error::FormatMismatch`], and the writer is left untouched.
pub fn write_binary<W: Write>(doc: &LmfDocument, writer: &mut W) -> Result<()> {
    let counts = check_limits(doc)?;
    let bytes_per_vertex = doc.format.bytes_per_vertex();

    writer.write_all(&[doc.format.bits(), bytes_per_vertex])?;
    writer.write_all(&counts.nodes.to_le_bytes())?;
    writer.write_all(&counts.meshes.to_le_bytes())?;
    writer.write_all(&counts.submeshes.to_le_bytes())?;
    writer.write_all(&name_field(&doc.name))?;

    for node in &doc.nodes {
        writer.write_all(&node.id.to_le_bytes())?;
        writer.write_all(&node.parent_id.to_le_bytes())?;
        let (min, max) = (node.aabb.min(), node.aabb.max());
        for v in min.iter().chain(max.iter()) {
            writer.write_all(&(*v as f32).to_le_bytes())?;
        }
        writer.write_all(&node.mesh_id.to_le_bytes())?;
    }

    for mesh in &doc.meshes {
        let vertex_count = mesh.vertices.len();
        let triangle_count = mesh.triangle_count();
        let block_size = 4
            + mesh.submeshes.len() * 4
            + vertex_count * bytes_per_vertex as usize
            + triangle_count * 6;

        writer.write_all(&(block_size as u32).to_le_bytes())?;
        writer.write_all(&(vertex_count as u16).to_le_bytes())?;
        writer.write_all(&(triangle_count as u16).to_le_bytes())?;

        for (start, count) in mesh.submesh_ranges() {
            writer.write_all(&(start as u16).to_le_bytes())?;
            writer.write_all(&((count * 3) as u16).to_le_bytes())?;
        }
        for vertex in &mesh.vertices {
            for c in vertex.components() {
                writer.write_all(&(c as f32).to_le_bytes())?;
            }
        }
        for triangle in mesh.triangles() {
            for &index in triangle {
                writer.write_all(&(index as u16).to_le_bytes())?;
            }
        }
    }

    Ok(())
}

pub(super) struct HeaderCounts {
    nodes: u16,
    meshes: u16,
    submeshes: u16,
}

/// Verifies that every count, start offset and element count fits 16 bits.
pub(super) fn check_limits(doc: &LmfDocument) -> Result<HeaderCounts> {
    let counts = HeaderCounts {
        nodes: Error::check_u16("node count", doc.nodes.len())?,
        meshes: Error::check_u16("leaf mesh count", doc.meshes.len())?,
        submeshes: Error::check_u16("submesh count", doc.material_count as usize)?,
    };
    for mesh in &doc.meshes {
        if mesh.submeshes.len() != doc.material_count as usize {
            return Err(Error::InvalidInput(format!(
                "mesh of node {} has {} submeshes, expected {}",
                mesh.node_id,
                mesh.submeshes.len(),
                doc.material_count
            )));
        }
        Error::check_u16("vertex count", mesh.vertices.len())?;
        Error::check_u16("triangle count", mesh.triangle_count())?;
        for (start, count) in mesh.submesh_ranges() {
            Error::check_u16("submesh start", start)?;
            Error::check_u16("submesh element count", count * 3)?;
        }
    }
    doc.check_channels()?;
    Ok(counts)
}

/// Encodes a name as UTF-8, zero padded or cut to [`NAME_LEN`] bytes
/// without splitting a character.
fn name_field(name: &str) -> [u8; NAME_LEN] {
    let mut end = name.len().min(NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let mut field = [0u8; NAME_LEN];
    field[..end].copy_from_slice(&name.as_bytes()[..end]);
    field
}

/// A node record as stored in a binary file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileNode {
    pub id: i32,
    pub parent_id: i32,
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub mesh_id: i32,
}

/// Start and length of one submesh within a mesh's index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshRange {
    /// Index of the submesh's first triangle.
    pub start_triangle: u16,
    /// Number of indices, three per triangle.
    pub element_count: u16,
}

/// A leaf mesh block as stored in a binary file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMesh {
    pub block_size: u32,
    pub vertex_count: u16,
    pub submeshes: Vec<SubmeshRange>,
    /// Interleaved vertex components, `bytes_per_vertex / 4` per vertex.
    pub vertex_data: Vec<f32>,
    pub triangles: Vec<[u16; 3]>,
}

/// A decoded binary LMF file.
#[derive(Debug, Clone, PartialEq)]
pub struct LmfFile {
    pub format: VertexFormat,
    pub bytes_per_vertex: u8,
    pub submesh_count: u16,
    pub name: String,
    pub nodes: Vec<FileNode>,
    pub meshes: Vec<FileMesh>,
}

/// Decodes a binary LMF stream.
///
/// Truncated input, a stride that disagrees with the format flags, a block
/// size that disagrees with the block's contents, submesh ranges that do not
/// cover the triangle list, and bytes after the last mesh are reported as
/// [`Error::Malformed`].
pub fn read_binary<R: Read>(reader: &mut R) -> Result<LmfFile> {
    let mut r = LeReader { inner: reader };

    let format = VertexFormat::from_bits_retain(r.u8()?);
    let bytes_per_vertex = r.u8()?;
    if bytes_per_vertex != format.bytes_per_vertex() {
        return Err(Error::Malformed(format!(
            "bytes per vertex {bytes_per_vertex} but format '{format}' needs {}",
            format.bytes_per_vertex()
        )));
    }
    let node_count = r.u16()?;
    let mesh_count = r.u16()?;
    let submesh_count = r.u16()?;

    let mut name_bytes = [0u8; NAME_LEN];
    r.bytes(&mut name_bytes)?;
    let name_len = name_bytes.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    let name = std::str::from_utf8(&name_bytes[..name_len])
        .map_err(|e| Error::Malformed(format!("mesh name is not UTF-8: {e}")))?
        .to_owned();

    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let id = r.i32()?;
        let parent_id = r.i32()?;
        let min = [r.f32()?, r.f32()?, r.f32()?];
        let max = [r.f32()?, r.f32()?, r.f32()?];
        let mesh_id = r.i32()?;
        nodes.push(FileNode {
            id,
            parent_id,
            min,
            max,
            mesh_id,
        });
    }

    let floats_per_vertex = bytes_per_vertex as usize / 4;
    let mut meshes = Vec::with_capacity(mesh_count as usize);
    for mesh_index in 0..mesh_count {
        let block_size = r.u32()?;
        let vertex_count = r.u16()?;
        let triangle_count = r.u16()?;

        let expected = 4
            + submesh_count as usize * 4
            + vertex_count as usize * bytes_per_vertex as usize
            + triangle_count as usize * 6;
        if block_size as usize != expected {
            return Err(Error::Malformed(format!(
                "mesh {mesh_index}: block size {block_size} but contents need {expected} bytes"
            )));
        }

        let mut submeshes = Vec::with_capacity(submesh_count as usize);
        let mut next_start = 0usize;
        for _ in 0..submesh_count {
            let range = SubmeshRange {
                start_triangle: r.u16()?,
                element_count: r.u16()?,
            };
            if range.start_triangle as usize != next_start || range.element_count % 3 != 0 {
                return Err(Error::Malformed(format!(
                    "mesh {mesh_index}: submesh {range:?} does not start at triangle {next_start}"
                )));
            }
            next_start += range.element_count as usize / 3;
            submeshes.push(range);
        }
        if next_start != triangle_count as usize {
            return Err(Error::Malformed(format!(
                "mesh {mesh_index}: submeshes cover {next_start} of {triangle_count} triangles"
            )));
        }

        let vertex_data = (0..vertex_count as usize * floats_per_vertex)
            .map(|_| r.f32())
            .collect::<Result<Vec<_>>>()?;
        let triangles = (0..triangle_count)
            .map(|_| -> Result<[u16; 3]> { Ok([r.u16()?, r.u16()?, r.u16()?]) })
            .collect::<Result<Vec<_>>>()?;

        meshes.push(FileMesh {
            block_size,
            vertex_count,
            submeshes,
            vertex_data,
            triangles,
        });
    }

    r.expect_end()?;

    Ok(LmfFile {
        format,
        bytes_per_vertex,
        submesh_count,
        name,
        nodes,
        meshes,
    })
}

/// Little-endian primitive reader that reports short input as malformed.
struct LeReader<'a, R: Read> {
    inner: &'a mut R,
}

impl<R: Read> LeReader<'_, R> {
    fn bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::Malformed("unexpected end of file".into()),
            _ => Error::Io(e),
        })
    }

    fn expect_end(&mut self) -> Result<()> {
        let mut rest = [0u8; 1];
        loop {
            match self.inner.read(&mut rest) {
                Ok(0) => return Ok(()),
                Ok(_) => {
                    return Err(Error::Malformed("unexpected data after the last mesh".into()));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.bytes(&mut buf)?;
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }
}
