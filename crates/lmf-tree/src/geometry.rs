//! Read-only access to the source mesh.
//!
//! Partitioning and extraction never own geometry. They read it through
//! [`GeometrySource`], which a host application implements over its own mesh
//! representation. [`IndexedMesh`] is a ready-made owned implementation.

use nalgebra::{Point3, Vector2, Vector3};

use crate::{Aabb, Error, Result};

/// Handle identifying one polygon of a [`GeometrySource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolygonRef(pub usize);

impl PolygonRef {
    /// Returns the polygon's position in the source.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Immutable snapshot of a triangulated mesh.
///
/// Per-loop accessors take a polygon and a corner position within that
/// polygon's vertex list. They are only called for channels the source
/// reports as available.
pub trait GeometrySource {
    /// Name written into the file header.
    fn mesh_name(&self) -> &str;

    fn vertex_count(&self) -> usize;

    fn polygon_count(&self) -> usize;

    /// Number of materials; polygon material indices are dense in `0..count`.
    fn material_count(&self) -> u32;

    fn uv_layer_count(&self) -> usize;

    fn has_loop_normals(&self) -> bool;

    fn has_loop_tangents(&self) -> bool;

    fn vertex_position(&self, vertex: u32) -> Point3<f64>;

    /// Vertex indices of a polygon, in winding order.
    fn polygon_vertex_indices(&self, polygon: PolygonRef) -> &[u32];

    fn polygon_material_index(&self, polygon: PolygonRef) -> u32;

    fn loop_normal(&self, polygon: PolygonRef, corner: usize) -> Vector3<f64>;

    /// UV coordinate from layer `layer` (0 = uv0, 1 = uv1).
    fn loop_uv(&self, layer: usize, polygon: PolygonRef, corner: usize) -> Vector2<f64>;

    fn loop_tangent(&self, polygon: PolygonRef, corner: usize) -> Vector3<f64>;

    fn loop_bitangent(&self, polygon: PolygonRef, corner: usize) -> Vector3<f64>;

    /// Handles for every polygon, in source order.
    fn polygons(&self) -> Vec<PolygonRef> {
        (0..self.polygon_count()).map(PolygonRef).collect()
    }

    /// Bounding box of a polygon's vertex positions.
    fn polygon_aabb(&self, polygon: PolygonRef) -> Option<Aabb> {
        Aabb::from_points(
            self.polygon_vertex_indices(polygon)
                .iter()
                .map(|&v| self.vertex_position(v)),
        )
    }
}

/// Checks that a source can be partitioned and exported.
///
/// Rejects sources without vertices, polygons that are not triangles, and
/// vertex or material indices out of range.
pub fn validate_source<G: GeometrySource + ?Sized>(source: &G) -> Result<()> {
    if source.vertex_count() == 0 {
        return Err(Error::InvalidInput(format!(
            "mesh '{}' has no vertices",
            source.mesh_name()
        )));
    }

    let vertex_count = source.vertex_count();
    let material_count = source.material_count();
    for polygon in source.polygons() {
        let indices = source.polygon_vertex_indices(polygon);
        if indices.len() != 3 {
            return Err(Error::InvalidInput(format!(
                "polygon {} has {} vertices, only triangles are supported",
                polygon.index(),
                indices.len()
            )));
        }
        if let Some(&v) = indices.iter().find(|&&v| v as usize >= vertex_count) {
            return Err(Error::InvalidInput(format!(
                "polygon {} references vertex {v} of {vertex_count}",
                polygon.index()
            )));
        }
        let material = source.polygon_material_index(polygon);
        if material >= material_count {
            return Err(Error::InvalidInput(format!(
                "polygon {} uses material {material} of {material_count}",
                polygon.index()
            )));
        }
    }
    Ok(())
}

/// One polygon of a [`MeshData`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PolygonData {
    pub vertices: Vec<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub material: u32,
}

/// Plain buffers describing a mesh, before validation.
///
/// Per-loop arrays (`normals`, each entry of `uv_layers`, `tangents`,
/// `bitangents`) hold one value per polygon corner, polygon after polygon.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f64; 3]>,
    pub polygons: Vec<PolygonData>,
    pub material_count: Option<u32>,
    pub normals: Option<Vec<[f64; 3]>>,
    pub uv_layers: Vec<Vec<[f64; 2]>>,
    pub tangents: Option<Vec<[f64; 3]>>,
    pub bitangents: Option<Vec<[f64; 3]>>,
}

/// Owned [`GeometrySource`] with per-loop attribute storage.
#[derive(Debug, Clone)]
pub struct IndexedMesh {
    data: MeshData,
    loop_starts: Vec<usize>,
    material_count: u32,
}

impl IndexedMesh {
    /// Validates buffer lengths and wraps `data`.
    pub fn new(data: MeshData) -> Result<Self> {
        let mut loop_starts = Vec::with_capacity(data.polygons.len());
        let mut loop_count = 0usize;
        for polygon in &data.polygons {
            loop_starts.push(loop_count);
            loop_count += polygon.vertices.len();
        }

        let check = |what: &str, len: Option<usize>| match len {
            Some(len) if len != loop_count => Err(Error::InvalidInput(format!(
                "{what} has {len} entries, expected one per loop ({loop_count})"
            ))),
            _ => Ok(()),
        };
        check("normals", data.normals.as_ref().map(Vec::len))?;
        check("tangents", data.tangents.as_ref().map(Vec::len))?;
        check("bitangents", data.bitangents.as_ref().map(Vec::len))?;
        for (i, layer) in data.uv_layers.iter().enumerate() {
            check(&format!("uv layer {i}"), Some(layer.len()))?;
        }
        if data.tangents.is_some() != data.bitangents.is_some() {
            return Err(Error::InvalidInput(
                "tangents and bitangents must be supplied together".into(),
            ));
        }

        let material_count = match data.material_count {
            Some(count) => count,
            None => match data.polygons.iter().map(|p| p.material).max() {
                Some(highest) => highest.checked_add(1).ok_or_else(|| {
                    Error::InvalidInput(format!("material index {highest} is out of range"))
                })?,
                None => 1,
            },
        };

        Ok(Self {
            data,
            loop_starts,
            material_count,
        })
    }

    #[inline]
    fn loop_index(&self, polygon: PolygonRef, corner: usize) -> usize {
        self.loop_starts[polygon.index()] + corner
    }
}

impl GeometrySource for IndexedMesh {
    fn mesh_name(&self) -> &str {
        &self.data.name
    }

    fn vertex_count(&self) -> usize {
        self.data.positions.len()
    }

    fn polygon_count(&self) -> usize {
        self.data.polygons.len()
    }

    fn material_count(&self) -> u32 {
        self.material_count
    }

    fn uv_layer_count(&self) -> usize {
        self.data.uv_layers.len()
    }

    fn has_loop_normals(&self) -> bool {
        self.data.normals.is_some()
    }

    fn has_loop_tangents(&self) -> bool {
        self.data.tangents.is_some() && self.data.bitangents.is_some()
    }

    fn vertex_position(&self, vertex: u32) -> Point3<f64> {
        Point3::from(self.data.positions[vertex as usize])
    }

    fn polygon_vertex_indices(&self, polygon: PolygonRef) -> &[u32] {
        &self.data.polygons[polygon.index()].vertices
    }

    fn polygon_material_index(&self, polygon: PolygonRef) -> u32 {
        self.data.polygons[polygon.index()].material
    }

    fn loop_normal(&self, polygon: PolygonRef, corner: usize) -> Vector3<f64> {
        let normals = self.data.normals.as_deref().unwrap_or_default();
        Vector3::from(normals[self.loop_index(polygon, corner)])
    }

    fn loop_uv(&self, layer: usize, polygon: PolygonRef, corner: usize) -> Vector2<f64> {
        Vector2::from(self.data.uv_layers[layer][self.loop_index(polygon, corner)])
    }

    fn loop_tangent(&self, polygon: PolygonRef, corner: usize) -> Vector3<f64> {
        let tangents = self.data.tangents.as_deref().unwrap_or_default();
        Vector3::from(tangents[self.loop_index(polygon, corner)])
    }

    fn loop_bitangent(&self, polygon: PolygonRef, corner: usize) -> Vector3<f64> {
        let bitangents = self.data.bitangents.as_deref().unwrap_or_default();
        Vector3::from(bitangents[self.loop_index(polygon, corner)])
    }
}
