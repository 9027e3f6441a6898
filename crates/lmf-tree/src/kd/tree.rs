//! KD tree container and construction.

use std::collections::VecDeque;

use crate::{Aabb, Error, GeometrySource, PolygonRef, Result};

use super::criterion::SplitLimit;
use super::node::{KdNode, NodeId};
use super::visitor::KdVisitor;

/// A KD tree over the polygons of a [`GeometrySource`].
///
/// Each node's polygons are ordered by the center of their bounding boxes
/// along the node's longest axis, then cut at the median into two children.
/// Splitting stops once a node reaches the depth limit or its criterion
/// value drops to the threshold.
///
/// # Construction
///
/// ```ignore
/// use lmf_tree::{KdTree, SplitCriterion, SplitLimit};
///
/// let limit = SplitLimit::new(10, SplitCriterion::Polycount, 1000.0)?;
/// let tree = KdTree::from_source(&mesh, &limit)?;
/// ```
///
/// # Storage
///
/// Nodes live in a flat array in breadth-first order, so a node's id is its
/// index. Parents are recorded by id; the tree holds no references into the
/// geometry source beyond [`PolygonRef`] handles.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
}

impl KdTree {
    /// Builds a tree over every polygon of `source`.
    pub fn from_source<G: GeometrySource + ?Sized>(
        source: &G,
        limit: &SplitLimit,
    ) -> Result<Self> {
        Self::build(source, source.polygons(), limit)
    }

    /// Builds a tree over the given polygons.
    ///
    /// An empty polygon set yields a single empty leaf whose bounding box is
    /// the degenerate placeholder.
    pub fn build<G: GeometrySource + ?Sized>(
        source: &G,
        polygons: Vec<PolygonRef>,
        limit: &SplitLimit,
    ) -> Result<Self> {
        let items = polygons
            .into_iter()
            .map(|polygon| {
                source
                    .polygon_aabb(polygon)
                    .map(|aabb| (polygon, aabb))
                    .ok_or_else(|| {
                        Error::InvalidInput(format!("polygon {} has no vertices", polygon.index()))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let tree = Self {
            nodes: build_breadth_first(items, limit),
        };
        log::debug!(
            "built kd tree: {} nodes, depth {}, {} mesh leaves ({} by {} > {})",
            tree.node_count(),
            tree.depth(),
            tree.mesh_leaves().count(),
            limit.max_depth(),
            limit.criterion(),
            limit.threshold()
        );
        Ok(tree)
    }

    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> &KdNode {
        &self.nodes[0]
    }

    /// Returns the node with the given id, if any.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&KdNode> {
        self.nodes.get(id)
    }

    /// All nodes in breadth-first order.
    #[inline]
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node (0 for a single leaf).
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(KdNode::depth).max().unwrap_or(0)
    }

    /// Total number of polygons held by the leaves.
    pub fn polygon_count(&self) -> usize {
        self.leaves().map(|n| n.polygons().len()).sum()
    }

    /// Leaves in breadth-first order, empty ones included.
    pub fn leaves(&self) -> impl Iterator<Item = &KdNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    /// Leaves that carry polygons, in breadth-first order.
    ///
    /// The position of a leaf in this sequence is its mesh id on export.
    pub fn mesh_leaves(&self) -> impl Iterator<Item = &KdNode> {
        self.nodes.iter().filter(|n| n.has_mesh())
    }

    /// Visits every node in breadth-first (id) order.
    pub fn traverse_breadth_first<V: KdVisitor>(&self, visitor: &mut V) {
        for node in &self.nodes {
            visitor.visit(node);
        }
    }

    /// Visits every node depth-first, parent before children, left before right.
    pub fn traverse_depth_first<V: KdVisitor>(&self, visitor: &mut V) {
        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            visitor.visit(node);
            if let Some([left, right]) = node.children() {
                stack.push(right);
                stack.push(left);
            }
        }
    }
}

/// A polygon paired with its bounding box.
type Item = (PolygonRef, Aabb);

/// Builds every node in breadth-first order, so a node's id is its index.
///
/// Pending nodes wait in a queue rather than on the call stack, so the
/// depth of the tree is bounded by the limit alone.
fn build_breadth_first(items: Vec<Item>, limit: &SplitLimit) -> Vec<KdNode> {
    let mut nodes = Vec::new();
    let mut queue: VecDeque<(Vec<Item>, u32, Option<NodeId>)> =
        VecDeque::from([(items, 0, None)]);

    while let Some((mut items, depth, parent)) = queue.pop_front() {
        let id = nodes.len();
        let aabb = items
            .iter()
            .map(|(_, aabb)| *aabb)
            .reduce(|mut acc, aabb| {
                acc.union(&aabb);
                acc
            })
            .unwrap_or_default();

        let split_axis = aabb.find_splitting_axis();
        let axis = split_axis.index();

        // sort_by is stable: equal centers keep their input order
        items.sort_by(|(_, a), (_, b)| a.center()[axis].total_cmp(&b.center()[axis]));

        let (polygons, children) = if limit.should_split(depth, items.len(), &aabb) {
            // Everything still queued is numbered before these two
            let left_id = id + 1 + queue.len();
            let right = items.split_off(items.len() / 2);
            queue.push_back((items, depth + 1, Some(id)));
            queue.push_back((right, depth + 1, Some(id)));
            (Vec::new(), Some([left_id, left_id + 1]))
        } else {
            (items.into_iter().map(|(polygon, _)| polygon).collect(), None)
        };

        nodes.push(KdNode {
            id,
            depth,
            aabb,
            split_axis,
            polygons,
            children,
            parent,
        });
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{IndexedMesh, MeshData, PolygonData};
    use crate::kd::criterion::SplitCriterion;
    use crate::kd::visitor::{CollectingVisitor, FnVisitor};
    use crate::Axis;

    /// A row of `n` unit triangles laid out along X, one unit apart.
    fn make_strip(n: usize) -> IndexedMesh {
        let mut positions = Vec::new();
        let mut polygons = Vec::new();
        for i in 0..n {
            let x = i as f64 * 2.0;
            let base = positions.len() as u32;
            positions.push([x, 0.0, 0.0]);
            positions.push([x + 1.0, 0.0, 0.0]);
            positions.push([x, 0.5, 0.0]);
            polygons.push(PolygonData {
                vertices: vec![base, base + 1, base + 2],
                material: 0,
            });
        }
        IndexedMesh::new(MeshData {
            name: "strip".into(),
            positions,
            polygons,
            ..Default::default()
        })
        .unwrap()
    }

    /// One triangle whose bounding box has a volume of 64.
    fn make_slanted_triangle() -> IndexedMesh {
        IndexedMesh::new(MeshData {
            name: "tet".into(),
            positions: vec![[0.0, 0.0, 0.0], [4.0, 0.0, 4.0], [0.0, 4.0, 4.0]],
            polygons: vec![PolygonData {
                vertices: vec![0, 1, 2],
                material: 0,
            }],
            ..Default::default()
        })
        .unwrap()
    }

    fn make_limit(max_depth: i32, criterion: SplitCriterion, threshold: f64) -> SplitLimit {
        SplitLimit::new(max_depth, criterion, threshold).unwrap()
    }

    #[test]
    fn empty_polygon_set_is_single_empty_leaf() {
        let mesh = make_strip(0);
        let limit = make_limit(8, SplitCriterion::Polycount, 1.0);
        let tree = KdTree::from_source(&mesh, &limit).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert!(tree.root().is_empty_leaf());
        assert_eq!(tree.root().aabb(), &Aabb::new());
        assert_eq!(tree.mesh_leaves().count(), 0);
    }

    #[test]
    fn below_threshold_stays_single_leaf() {
        let mesh = make_strip(4);
        let limit = make_limit(8, SplitCriterion::Polycount, 4.0);
        let tree = KdTree::from_source(&mesh, &limit).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.root().polygons().len(), 4);
        assert_eq!(tree.root().split_axis(), Axis::X);
    }

    #[test]
    fn odd_count_median_is_left_biased() {
        let mesh = make_strip(5);
        let limit = make_limit(1, SplitCriterion::Polycount, 1.0);
        let tree = KdTree::from_source(&mesh, &limit).unwrap();
        let [left, right] = tree.root().children().unwrap();
        assert_eq!(tree.node(left).unwrap().polygons(), &[PolygonRef(0), PolygonRef(1)]);
        assert_eq!(
            tree.node(right).unwrap().polygons(),
            &[PolygonRef(2), PolygonRef(3), PolygonRef(4)]
        );
        // branches release their polygons
        assert!(tree.root().polygons().is_empty());
    }

    #[test]
    fn ids_are_breadth_first() {
        let mesh = make_strip(8);
        let limit = make_limit(3, SplitCriterion::Polycount, 1.0);
        let tree = KdTree::from_source(&mesh, &limit).unwrap();
        assert_eq!(tree.node_count(), 15);
        assert_eq!(tree.root().children(), Some([1, 2]));
        assert_eq!(tree.node(1).unwrap().children(), Some([3, 4]));
        assert_eq!(tree.node(2).unwrap().children(), Some([5, 6]));
        assert_eq!(tree.node(6).unwrap().children(), Some([13, 14]));
        for node in tree.nodes() {
            if let Some([l, r]) = node.children() {
                assert_eq!(tree.node(l).unwrap().parent(), Some(node.id()));
                assert_eq!(tree.node(r).unwrap().parent(), Some(node.id()));
                assert_eq!(tree.node(l).unwrap().depth(), node.depth() + 1);
            }
        }
        assert_eq!(tree.root().parent(), None);
    }

    #[test]
    fn leaves_partition_input_exactly_once() {
        let mesh = make_strip(23);
        let limit = make_limit(4, SplitCriterion::Polycount, 2.0);
        let tree = KdTree::from_source(&mesh, &limit).unwrap();
        let mut seen: Vec<PolygonRef> = tree.leaves().flat_map(|n| n.polygons().to_vec()).collect();
        seen.sort();
        assert_eq!(seen, mesh.polygons());
        assert_eq!(tree.polygon_count(), 23);
    }

    #[test]
    fn depth_and_criterion_bounds_hold() {
        let mesh = make_strip(40);
        for criterion in [
            SplitCriterion::Polycount,
            SplitCriterion::Volume,
            SplitCriterion::Area,
            SplitCriterion::Extent,
        ] {
            let limit = make_limit(5, criterion, 3.0);
            let tree = KdTree::from_source(&mesh, &limit).unwrap();
            assert!(tree.depth() <= 5);
            for leaf in tree.leaves() {
                let value = criterion.measure(leaf.polygons().len(), leaf.aabb());
                assert!(
                    value <= 3.0 || leaf.depth() == 5,
                    "{criterion} leaf {} at depth {} measures {value}",
                    leaf.id(),
                    leaf.depth()
                );
            }
        }
    }

    #[test]
    fn volume_criterion_can_leave_empty_leaves() {
        // A slanted triangle has a box with volume, so it splits until max depth
        let mesh = make_slanted_triangle();
        let limit = make_limit(2, SplitCriterion::Volume, 1.0);
        let tree = KdTree::from_source(&mesh, &limit).unwrap();
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.leaves().filter(|n| n.is_empty_leaf()).count(), 2);
        assert_eq!(tree.mesh_leaves().count(), 1);
        assert_eq!(tree.mesh_leaves().next().unwrap().depth(), 2);
    }

    #[test]
    fn deep_trees_do_not_grow_the_call_stack() {
        let mesh = make_slanted_triangle();
        let tree =
            KdTree::from_source(&mesh, &make_limit(50_000, SplitCriterion::Volume, 1.0)).unwrap();
        assert_eq!(tree.depth(), 50_000);
        assert_eq!(tree.node_count(), 2 * 50_000 + 1);
        assert_eq!(tree.mesh_leaves().count(), 1);

        let mut visited = 0;
        tree.traverse_depth_first(&mut FnVisitor::new(|_: &KdNode| visited += 1));
        assert_eq!(visited, tree.node_count());
    }

    #[test]
    fn traversal_orders() {
        let mesh = make_strip(4);
        let limit = make_limit(2, SplitCriterion::Polycount, 1.0);
        let tree = KdTree::from_source(&mesh, &limit).unwrap();

        let mut bfs = CollectingVisitor::new();
        tree.traverse_breadth_first(&mut bfs);
        assert_eq!(bfs.ids(), &[0, 1, 2, 3, 4, 5, 6]);

        let mut dfs = Vec::new();
        tree.traverse_depth_first(&mut FnVisitor::new(|node: &KdNode| dfs.push(node.id())));
        assert_eq!(dfs, vec![0, 1, 3, 4, 2, 5, 6]);
    }
}
