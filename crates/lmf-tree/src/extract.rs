//! Per-leaf mesh extraction with vertex deduplication.
//!
//! Each non-empty leaf becomes a self-contained mesh: a vertex buffer holding
//! every distinct loop-vertex of the leaf's polygons, and one triangle list
//! per material. Two loop-vertices merge only when every enabled channel is
//! bit-for-bit identical.

use std::hash::{Hash, Hasher};

use nalgebra::Vector3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::aabb::y_up;
use crate::kd::{KdNode, KdTree, NodeId};
use crate::{Error, GeometrySource, PolygonRef, Result, VertexFormat};

/// One output vertex, holding exactly the channels of the active format.
///
/// Vector channels are stored in the Y-up output frame. Equality and hashing
/// compare the bit patterns of the stored values, so `0.0` and `-0.0` are
/// different vertices.
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupVertex {
    pub position: Option<[f64; 3]>,
    pub normal: Option<[f64; 3]>,
    pub uv0: Option<[f64; 2]>,
    /// Tangent XYZ followed by bitangent XYZ.
    pub tangent_bitangent: Option<[f64; 6]>,
    pub uv1: Option<[f64; 2]>,
}

impl DedupVertex {
    /// Builds the vertex for one polygon corner.
    fn from_loop<G: GeometrySource + ?Sized>(
        source: &G,
        format: VertexFormat,
        polygon: PolygonRef,
        corner: usize,
        vertex: u32,
    ) -> Self {
        let frame = |v: Vector3<f64>| [v.x, v.z, -v.y];
        let mut out = Self::default();

        if format.contains(VertexFormat::POSITION) {
            let p = y_up(source.vertex_position(vertex));
            out.position = Some([p.x, p.y, p.z]);
        }
        if format.contains(VertexFormat::NORMAL) {
            out.normal = Some(frame(source.loop_normal(polygon, corner)));
        }
        if format.contains(VertexFormat::UV0) {
            let uv = source.loop_uv(0, polygon, corner);
            out.uv0 = Some([uv.x, uv.y]);
        }
        if format.contains(VertexFormat::TANGENT_BITANGENT) {
            let [tx, ty, tz] = frame(source.loop_tangent(polygon, corner));
            let [bx, by, bz] = frame(source.loop_bitangent(polygon, corner));
            out.tangent_bitangent = Some([tx, ty, tz, bx, by, bz]);
        }
        if format.contains(VertexFormat::UV1) {
            let uv = source.loop_uv(1, polygon, corner);
            out.uv1 = Some([uv.x, uv.y]);
        }
        out
    }

    /// All stored components in file order: pos, normal, uv0, tangent+bitangent, uv1.
    pub fn components(&self) -> impl Iterator<Item = f64> + '_ {
        self.position
            .iter()
            .flatten()
            .chain(self.normal.iter().flatten())
            .chain(self.uv0.iter().flatten())
            .chain(self.tangent_bitangent.iter().flatten())
            .chain(self.uv1.iter().flatten())
            .copied()
    }

    /// Channels present in this vertex.
    pub fn format(&self) -> VertexFormat {
        let mut format = VertexFormat::empty();
        format.set(VertexFormat::POSITION, self.position.is_some());
        format.set(VertexFormat::NORMAL, self.normal.is_some());
        format.set(VertexFormat::UV0, self.uv0.is_some());
        format.set(VertexFormat::TANGENT_BITANGENT, self.tangent_bitangent.is_some());
        format.set(VertexFormat::UV1, self.uv1.is_some());
        format
    }
}

impl PartialEq for DedupVertex {
    fn eq(&self, other: &Self) -> bool {
        self.format() == other.format()
            && self
                .components()
                .map(f64::to_bits)
                .eq(other.components().map(f64::to_bits))
    }
}

impl Eq for DedupVertex {}

impl Hash for DedupVertex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.format().bits().hash(state);
        for c in self.components() {
            c.to_bits().hash(state);
        }
    }
}

/// Vertex and index buffers of one non-empty leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafMesh {
    /// Id of the leaf this mesh was extracted from.
    pub node_id: NodeId,
    pub name: String,
    /// Distinct source vertices referenced by the leaf's polygons.
    pub source_vertex_count: usize,
    /// Deduplicated vertices in first-seen order.
    pub vertices: Vec<DedupVertex>,
    /// Triangles grouped by material index.
    pub submeshes: Vec<Vec<[u32; 3]>>,
}

impl LeafMesh {
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Vec::len).sum()
    }

    /// `(start triangle, triangle count)` of each submesh within the
    /// concatenated triangle list.
    pub fn submesh_ranges(&self) -> Vec<(usize, usize)> {
        let mut start = 0;
        self.submeshes
            .iter()
            .map(|tris| {
                let range = (start, tris.len());
                start += tris.len();
                range
            })
            .collect()
    }

    /// Triangles of all submeshes, in submesh order.
    pub fn triangles(&self) -> impl Iterator<Item = &[u32; 3]> {
        self.submeshes.iter().flatten()
    }
}

/// Extracts the deduplicated mesh of a non-empty leaf.
///
/// Polygons are walked in leaf order and corners in winding order; the
/// first occurrence of a vertex fixes its index.
pub fn extract_leaf<G: GeometrySource + ?Sized>(
    node: &KdNode,
    source: &G,
    format: VertexFormat,
) -> Result<LeafMesh> {
    if !node.has_mesh() {
        return Err(Error::InvalidInput(format!(
            "node {} is not a leaf with polygons",
            node.id()
        )));
    }
    format.check_against(source)?;

    let material_count = source.material_count() as usize;
    let mut submeshes: Vec<Vec<[u32; 3]>> = vec![Vec::new(); material_count];
    let mut vertices: Vec<DedupVertex> = Vec::new();
    let mut lookup: FxHashMap<DedupVertex, u32> = FxHashMap::default();
    let mut referenced: FxHashSet<u32> = FxHashSet::default();

    for &polygon in node.polygons() {
        let indices = source.polygon_vertex_indices(polygon);
        let &[a, b, c] = indices else {
            return Err(Error::InvalidInput(format!(
                "polygon {} has {} vertices, only triangles are supported",
                polygon.index(),
                indices.len()
            )));
        };

        let mut triangle = [0u32; 3];
        for (corner, vertex) in [a, b, c].into_iter().enumerate() {
            referenced.insert(vertex);
            let key = DedupVertex::from_loop(source, format, polygon, corner, vertex);
            triangle[corner] = *lookup.entry(key).or_insert_with(|| {
                vertices.push(key);
                (vertices.len() - 1) as u32
            });
        }

        let material = source.polygon_material_index(polygon) as usize;
        let bucket = submeshes.get_mut(material).ok_or_else(|| {
            Error::InvalidInput(format!(
                "polygon {} uses material {material} of {material_count}",
                polygon.index()
            ))
        })?;
        bucket.push(triangle);
    }

    let mesh = LeafMesh {
        node_id: node.id(),
        name: format!("{}_{}", source.mesh_name(), node.id()),
        source_vertex_count: referenced.len(),
        vertices,
        submeshes,
    };
    log::debug!(
        "leaf {}: {} triangles, {} unique of {} loop vertices",
        node.id(),
        mesh.triangle_count(),
        mesh.vertices.len(),
        mesh.triangle_count() * 3
    );
    Ok(mesh)
}

/// Extracts every mesh leaf of `tree`, in mesh id order.
pub fn extract_all<G: GeometrySource + ?Sized>(
    tree: &KdTree,
    source: &G,
    format: VertexFormat,
) -> Result<Vec<LeafMesh>> {
    format.check_against(source)?;
    tree.mesh_leaves()
        .map(|leaf| extract_leaf(leaf, source, format))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{IndexedMesh, MeshData, PolygonData};
    use crate::kd::{SplitCriterion, SplitLimit};

    fn make_triangle(vertices: [u32; 3], material: u32) -> PolygonData {
        PolygonData {
            vertices: vertices.to_vec(),
            material,
        }
    }

    /// Unit quad in the XY plane made of two triangles sharing an edge.
    fn make_quad(materials: [u32; 2]) -> MeshData {
        MeshData {
            name: "quad".into(),
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            polygons: vec![
                make_triangle([0, 1, 2], materials[0]),
                make_triangle([0, 2, 3], materials[1]),
            ],
            normals: Some(vec![[0.0, 0.0, 1.0]; 6]),
            ..Default::default()
        }
    }

    fn single_leaf(mesh: &IndexedMesh) -> KdTree {
        let limit = SplitLimit::new(4, SplitCriterion::Polycount, 100.0).unwrap();
        KdTree::from_source(mesh, &limit).unwrap()
    }

    #[test]
    fn shared_vertices_are_merged() {
        let mesh = IndexedMesh::new(make_quad([0, 0])).unwrap();
        let tree = single_leaf(&mesh);
        let leaf = extract_leaf(tree.root(), &mesh, VertexFormat::POSITION | VertexFormat::NORMAL)
            .unwrap();

        assert_eq!(leaf.vertices.len(), 4);
        assert!(leaf.vertices.len() < leaf.triangle_count() * 3);
        assert_eq!(leaf.source_vertex_count, 4);
        assert_eq!(leaf.submeshes, vec![vec![[0, 1, 2], [0, 2, 3]]]);
        assert_eq!(leaf.name, "quad_0");
    }

    #[test]
    fn distinct_channels_keep_vertices_apart() {
        let mut data = make_quad([0, 0]);
        // second triangle gets a different normal on every corner
        data.normals = Some(vec![
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let mesh = IndexedMesh::new(data).unwrap();
        let tree = single_leaf(&mesh);

        let format = VertexFormat::POSITION | VertexFormat::NORMAL;
        let with_normals = extract_leaf(tree.root(), &mesh, format).unwrap();
        assert_eq!(with_normals.vertices.len(), 6);
        assert_eq!(with_normals.vertices.len(), with_normals.triangle_count() * 3);

        // Dropping the normal channel makes the corners identical again
        let positions_only = extract_leaf(tree.root(), &mesh, VertexFormat::POSITION).unwrap();
        assert_eq!(positions_only.vertices.len(), 4);
    }

    #[test]
    fn channels_are_written_y_up() {
        let mut data = make_quad([0, 0]);
        data.positions[2] = [1.0, 2.0, 3.0];
        let mesh = IndexedMesh::new(data).unwrap();
        let tree = single_leaf(&mesh);
        let leaf = extract_leaf(tree.root(), &mesh, VertexFormat::POSITION | VertexFormat::NORMAL)
            .unwrap();

        let v = leaf.vertices[leaf.submeshes[0][0][2] as usize];
        assert_eq!(v.position, Some([1.0, 3.0, -2.0]));
        assert_eq!(v.normal, Some([0.0, 1.0, -0.0]));
        assert_eq!(v.components().collect::<Vec<_>>(), vec![1.0, 3.0, -2.0, 0.0, 1.0, -0.0]);
    }

    #[test]
    fn triangles_bucket_by_material() {
        let mesh = IndexedMesh::new(make_quad([1, 0])).unwrap();
        let tree = single_leaf(&mesh);
        let leaf = extract_leaf(tree.root(), &mesh, VertexFormat::POSITION).unwrap();

        assert_eq!(leaf.submeshes.len(), 2);
        assert_eq!(leaf.submeshes[0], vec![[0, 2, 3]]);
        assert_eq!(leaf.submeshes[1], vec![[0, 1, 2]]);
        assert_eq!(leaf.submesh_ranges(), vec![(0, 1), (1, 1)]);
        assert_eq!(leaf.triangles().count(), 2);
    }

    #[test]
    fn empty_materials_keep_their_bucket() {
        let mut data = make_quad([0, 0]);
        data.material_count = Some(3);
        let mesh = IndexedMesh::new(data).unwrap();
        let tree = single_leaf(&mesh);
        let leaf = extract_leaf(tree.root(), &mesh, VertexFormat::POSITION).unwrap();
        assert_eq!(leaf.submeshes.len(), 3);
        assert!(leaf.submeshes[1].is_empty() && leaf.submeshes[2].is_empty());
    }

    #[test]
    fn missing_uv_layers_are_format_mismatch() {
        let mesh = IndexedMesh::new(make_quad([0, 0])).unwrap();
        let tree = single_leaf(&mesh);
        let err = extract_leaf(tree.root(), &mesh, VertexFormat::POSITION | VertexFormat::UV0);
        assert!(matches!(err, Err(Error::FormatMismatch(_))));

        let mut data = make_quad([0, 0]);
        data.uv_layers = vec![vec![[0.0, 0.0]; 6]];
        let mesh = IndexedMesh::new(data).unwrap();
        let uv0 = VertexFormat::POSITION | VertexFormat::UV0;
        assert!(extract_leaf(tree.root(), &mesh, uv0).is_ok());
        let err = extract_leaf(tree.root(), &mesh, VertexFormat::POSITION | VertexFormat::UV1);
        assert!(matches!(err, Err(Error::FormatMismatch(_))));
    }

    #[test]
    fn reserved_channels_are_format_mismatch() {
        let mesh = IndexedMesh::new(make_quad([0, 0])).unwrap();
        let tree = single_leaf(&mesh);
        let err = extract_all(&tree, &mesh, VertexFormat::POSITION | VertexFormat::COLOR);
        assert!(matches!(err, Err(Error::FormatMismatch(_))));
    }

    #[test]
    fn branch_nodes_are_rejected() {
        let mesh = IndexedMesh::new(make_quad([0, 0])).unwrap();
        let limit = SplitLimit::new(1, SplitCriterion::Polycount, 1.0).unwrap();
        let tree = KdTree::from_source(&mesh, &limit).unwrap();
        assert!(matches!(
            extract_leaf(tree.root(), &mesh, VertexFormat::POSITION),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(extract_all(&tree, &mesh, VertexFormat::POSITION).unwrap().len(), 2);
    }
}
