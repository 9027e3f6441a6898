//! KD tree node implementation.

use crate::{Aabb, Axis, PolygonRef};

/// Index of a node in its [`KdTree`](super::KdTree).
///
/// Ids are assigned in breadth-first order, so the root is 0 and the id
/// doubles as the node's position in the tree's node array.
pub type NodeId = usize;

/// A node in the KD tree.
///
/// Branch nodes have exactly two children and no polygons; construction
/// releases a node's polygon list once it has been split. Leaves keep their
/// polygons, in ascending order of their bounding box center along the
/// node's split axis.
///
/// A leaf with no polygons is an *empty leaf*: it still appears in the tree
/// topology but has no mesh associated with it.
#[derive(Debug, Clone)]
pub struct KdNode {
    pub(super) id: NodeId,
    pub(super) depth: u32,
    pub(super) aabb: Aabb,
    pub(super) split_axis: Axis,
    pub(super) polygons: Vec<PolygonRef>,
    pub(super) children: Option<[NodeId; 2]>,
    pub(super) parent: Option<NodeId>,
}

impl KdNode {
    /// Breadth-first id of this node.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Distance from the root (root = 0).
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Union of the bounding boxes of the polygons under this node.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Axis the node's polygons were ordered along.
    #[inline]
    pub fn split_axis(&self) -> Axis {
        self.split_axis
    }

    /// Polygons held by this node (empty for branches).
    #[inline]
    pub fn polygons(&self) -> &[PolygonRef] {
        &self.polygons
    }

    /// Left and right child ids, or `None` for a leaf.
    #[inline]
    pub fn children(&self) -> Option<[NodeId; 2]> {
        self.children
    }

    /// Id of the parent node, `None` for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Checks if this node has any children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Returns `true` for a leaf holding no polygons.
    #[inline]
    pub fn is_empty_leaf(&self) -> bool {
        self.is_leaf() && self.polygons.is_empty()
    }

    /// Returns `true` for a leaf that produces a mesh on export.
    #[inline]
    pub fn has_mesh(&self) -> bool {
        self.is_leaf() && !self.polygons.is_empty()
    }
}
