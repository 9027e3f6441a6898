use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use lmf_tree::{
    export, read_binary, Axis, Encoding, Error, ExportSettings, IndexedMesh, KdTree, LmfDocument,
    MeshData, PolygonData, SplitCriterion, SplitLimit, VertexFormat,
};

static TEST_UNIQUIFIER: AtomicU64 = AtomicU64::new(0);

fn test_path(name: &str) -> PathBuf {
    let serial = TEST_UNIQUIFIER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!("lmf-it-{name}-{}-{}.lmf", std::process::id(), serial));
    let _ = std::fs::remove_file(&path);
    path
}

/// Unit cube split into twelve triangles, two per face.
fn make_cube(name: &str) -> MeshData {
    let positions = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ];
    let faces: [[u32; 4]; 6] = [
        [0, 3, 2, 1], // bottom
        [4, 5, 6, 7], // top
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];
    let polygons = faces
        .iter()
        .flat_map(|&[a, b, c, d]| [[a, b, c], [a, c, d]])
        .map(|vertices| PolygonData {
            vertices: vertices.to_vec(),
            material: 0,
        })
        .collect();
    MeshData {
        name: name.into(),
        positions,
        polygons,
        ..Default::default()
    }
}

fn make_cube_with_normals(name: &str) -> MeshData {
    let mut data = make_cube(name);
    let loops = data.polygons.len() * 3;
    data.normals = Some(vec![[0.0, 0.0, 1.0]; loops]);
    data.uv_layers = vec![vec![[0.5, 0.5]; loops]];
    data
}

#[test]
fn cube_splits_once_along_z() {
    let mesh = IndexedMesh::new(make_cube("cube")).unwrap();
    let limit = SplitLimit::new(1, SplitCriterion::Polycount, 6.0).unwrap();
    let tree = KdTree::from_source(&mesh, &limit).unwrap();

    assert_eq!(tree.node_count(), 3);
    assert_eq!(tree.root().split_axis(), Axis::Z);
    let leaves: Vec<usize> = tree.leaves().map(|n| n.polygons().len()).collect();
    assert_eq!(leaves, vec![6, 6]);

    let doc = LmfDocument::build(&tree, &mesh, VertexFormat::POSITION).unwrap();
    for leaf in &doc.meshes {
        assert_eq!(leaf.triangle_count(), 6);
        assert!(leaf.vertices.len() < 18);
        assert!(leaf.vertices.len() <= leaf.source_vertex_count);
    }

    let mut bytes = Vec::new();
    doc.write(Encoding::Binary, &mut bytes).unwrap();
    assert_eq!(bytes[0], VertexFormat::POSITION.bits());
    assert_eq!(bytes[1], 12);
    assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 3);
    assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 2);
    assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 1);
}

#[test]
fn binary_export_reads_back() {
    let path = test_path("binary");
    let mesh = IndexedMesh::new(make_cube_with_normals("box")).unwrap();
    let settings = ExportSettings {
        max_depth: 4,
        threshold: 4.0,
        encoding: Encoding::Binary,
        ..Default::default()
    };
    let tree = export(&mesh, &settings, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let file = read_binary(&mut bytes.as_slice()).unwrap();
    assert_eq!(file.name, "box");
    assert_eq!(file.format, VertexFormat::default());
    assert_eq!(file.bytes_per_vertex, 32);
    assert_eq!(file.nodes.len(), tree.node_count());
    assert_eq!(file.meshes.len(), tree.mesh_leaves().count());

    let root = &file.nodes[0];
    assert_eq!(root.parent_id, -1);
    assert_eq!(root.min, [0.0, 0.0, -1.0]);
    assert_eq!(root.max, [1.0, 1.0, 0.0]);

    let triangles: usize = file.meshes.iter().map(|m| m.triangles.len()).sum();
    assert_eq!(triangles, 12);
    for mesh in &file.meshes {
        assert_eq!(mesh.vertex_data.len(), mesh.vertex_count as usize * 8);
        let covered: u16 = mesh.submeshes.iter().map(|s| s.element_count).sum();
        assert_eq!(covered as usize, mesh.triangles.len() * 3);
    }
    for node in &file.nodes[1..] {
        assert!(node.parent_id >= 0 && node.parent_id < node.id);
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn ascii_export_lists_every_node() {
    let path = test_path("ascii");
    let mesh = IndexedMesh::new(make_cube_with_normals("box")).unwrap();
    let settings = ExportSettings {
        max_depth: 4,
        threshold: 4.0,
        ..Default::default()
    };
    let tree = export(&mesh, &settings, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let node_lines = text.lines().filter(|l| l.starts_with("node[")).count();
    let mesh_lines = text.lines().filter(|l| l.starts_with("mesh[")).count();
    assert_eq!(node_lines, tree.node_count());
    assert_eq!(mesh_lines, tree.mesh_leaves().count());
    assert!(text.starts_with("name: box\n"));
    // max z is the negated min y, which prints as -0.00
    assert!(text.contains("node[0]: parent(-1), aabb(0.00 0.00 -1.00 | 1.00 1.00 "));

    let _ = std::fs::remove_file(&path);
}

fn read_back(path: &PathBuf) -> lmf_tree::LmfFile {
    let bytes = std::fs::read(path).unwrap();
    let _ = std::fs::remove_file(path);
    read_binary(&mut bytes.as_slice()).unwrap()
}

fn topology(file: &lmf_tree::LmfFile) -> Vec<(i32, i32, i32)> {
    file.nodes
        .iter()
        .map(|n| (n.id, n.parent_id, n.mesh_id))
        .collect()
}

#[test]
fn mesh_without_polygons_exports_one_empty_node() {
    let path = test_path("empty");
    let mut data = make_cube("hollow");
    data.polygons.clear();
    let mesh = IndexedMesh::new(data).unwrap();
    let settings = ExportSettings {
        vertex_format: VertexFormat::POSITION,
        encoding: Encoding::Binary,
        ..Default::default()
    };
    export(&mesh, &settings, &path).unwrap();

    let file = read_back(&path);
    assert_eq!(topology(&file), vec![(0, -1, -1)]);
    assert_eq!(file.nodes[0].min, [0.0; 3]);
    assert_eq!(file.nodes[0].max, [0.0; 3]);
    assert!(file.meshes.is_empty());
    assert_eq!(file.submesh_count, 1);
}

#[test]
fn empty_leaves_have_no_mesh_id() {
    // A slanted triangle keeps a box with volume, so every split leaves one
    // side empty until the depth limit is reached
    let path = test_path("empty-leaves");
    let mesh = IndexedMesh::new(MeshData {
        name: "slant".into(),
        positions: vec![[0.0, 0.0, 0.0], [4.0, 0.0, 4.0], [0.0, 4.0, 4.0]],
        polygons: vec![PolygonData {
            vertices: vec![0, 1, 2],
            material: 0,
        }],
        ..Default::default()
    })
    .unwrap();
    let settings = ExportSettings {
        max_depth: 4,
        criterion: SplitCriterion::Volume,
        threshold: 1.0,
        vertex_format: VertexFormat::POSITION,
        encoding: Encoding::Binary,
    };
    export(&mesh, &settings, &path).unwrap();

    let file = read_back(&path);
    assert_eq!(
        topology(&file),
        vec![
            (0, -1, -1),
            (1, 0, -1),
            (2, 0, -1),
            (3, 2, -1),
            (4, 2, -1),
            (5, 4, -1),
            (6, 4, -1),
            (7, 6, -1),
            (8, 6, 0),
        ]
    );
    assert_eq!(file.meshes.len(), 1);
    assert_eq!(file.meshes[0].triangles.len(), 1);
    assert_eq!(file.meshes[0].vertex_count, 3);
}

#[test]
fn missing_uv_layer_leaves_no_file() {
    let path = test_path("mismatch");
    let mesh = IndexedMesh::new(make_cube("bare")).unwrap();
    let err = export(&mesh, &ExportSettings::default(), &path);
    assert!(matches!(err, Err(Error::FormatMismatch(_))));
    assert!(!path.exists());
}

#[test]
fn reserved_channels_are_refused() {
    let path = test_path("reserved");
    let mesh = IndexedMesh::new(make_cube_with_normals("box")).unwrap();
    let settings = ExportSettings {
        vertex_format: VertexFormat::POSITION | VertexFormat::COLOR,
        ..Default::default()
    };
    assert!(matches!(
        export(&mesh, &settings, &path),
        Err(Error::FormatMismatch(_))
    ));
    assert!(!path.exists());
}

#[test]
fn quads_are_invalid_input() {
    let mut data = make_cube("quad");
    data.polygons.push(PolygonData {
        vertices: vec![0, 1, 2, 3],
        material: 0,
    });
    let mesh = IndexedMesh::new(data).unwrap();
    let settings = ExportSettings {
        vertex_format: VertexFormat::POSITION,
        ..Default::default()
    };
    let mut out = Vec::new();
    assert!(matches!(
        lmf_tree::export_to_writer(&mesh, &settings, &mut out),
        Err(Error::InvalidInput(_))
    ));
    assert!(out.is_empty());
}
