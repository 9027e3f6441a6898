//! Procedural demo geometry.
//!
//! Produces a grid of cubes with every channel the exporter can write, so
//! that any vertex format can be tried without an input file.

use lmf_tree::{MeshData, PolygonData};
use nalgebra::{Point3, Rotation3, Vector3};

/// Face corners with counter-clockwise winding seen from outside.
const CUBE_FACES: [[usize; 4]; 6] = [
    [4, 5, 6, 7], // top (+Z)
    [1, 0, 3, 2], // bottom (-Z)
    [0, 4, 7, 3], // left (-X)
    [5, 1, 2, 6], // right (+X)
    [7, 6, 2, 3], // back (+Y)
    [0, 1, 5, 4], // front (-Y)
];

const FACE_UVS: [[f64; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Scale of the world-space second uv layer.
const LIGHTMAP_SCALE: f64 = 0.1;

/// Builds a `side` x `side` grid of cubes on the XY plane.
///
/// Cubes alternate between two materials and every other one is turned
/// around Z, which spreads triangle centers over the whole grid.
pub fn generate_cube_grid(side: u32, spacing: f64) -> MeshData {
    let mut data = MeshData {
        name: format!("demo_grid_{side}"),
        material_count: Some(2),
        normals: Some(Vec::new()),
        uv_layers: vec![Vec::new(), Vec::new()],
        tangents: Some(Vec::new()),
        bitangents: Some(Vec::new()),
        ..Default::default()
    };

    for row in 0..side {
        for col in 0..side {
            let center = Point3::new(col as f64 * spacing, row as f64 * spacing, 0.5);
            let angle = if (row + col) % 2 == 1 { 0.35 } else { 0.0 };
            let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), angle);
            push_cube(&mut data, center, 1.0, &rotation, (row + col) % 2);
        }
    }

    data
}

fn push_cube(
    data: &mut MeshData,
    center: Point3<f64>,
    size: f64,
    rotation: &Rotation3<f64>,
    material: u32,
) {
    let half = size / 2.0;
    let unit_corners = [
        Vector3::new(-half, -half, -half),
        Vector3::new(half, -half, -half),
        Vector3::new(half, half, -half),
        Vector3::new(-half, half, -half),
        Vector3::new(-half, -half, half),
        Vector3::new(half, -half, half),
        Vector3::new(half, half, half),
        Vector3::new(-half, half, half),
    ];

    let base = data.positions.len() as u32;
    let corners: Vec<Point3<f64>> = unit_corners.iter().map(|v| center + rotation * v).collect();
    data.positions.extend(corners.iter().map(|p| [p.x, p.y, p.z]));

    for face in CUBE_FACES {
        let [p0, p1, p2] = [corners[face[0]], corners[face[1]], corners[face[2]]];
        let tangent = (p1 - p0).normalize();
        let normal = (p1 - p0).cross(&(p2 - p0)).normalize();
        let bitangent = normal.cross(&tangent);

        for corners_of_triangle in [[0, 1, 2], [0, 2, 3]] {
            data.polygons.push(PolygonData {
                vertices: corners_of_triangle.map(|c| base + face[c] as u32).to_vec(),
                material,
            });
            for c in corners_of_triangle {
                let p = corners[face[c]];
                let lightmap_uv = [p.x * LIGHTMAP_SCALE, p.y * LIGHTMAP_SCALE];
                push_loop(data, normal, FACE_UVS[c], lightmap_uv, tangent, bitangent);
            }
        }
    }
}

fn push_loop(
    data: &mut MeshData,
    normal: Vector3<f64>,
    uv0: [f64; 2],
    uv1: [f64; 2],
    tangent: Vector3<f64>,
    bitangent: Vector3<f64>,
) {
    if let Some(normals) = data.normals.as_mut() {
        normals.push(normal.into());
    }
    data.uv_layers[0].push(uv0);
    data.uv_layers[1].push(uv1);
    if let Some(tangents) = data.tangents.as_mut() {
        tangents.push(tangent.into());
    }
    if let Some(bitangents) = data.bitangents.as_mut() {
        bitangents.push(bitangent.into());
    }
}
