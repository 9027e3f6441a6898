//! KD tree for spatially coherent mesh partitioning.
//!
//! This module splits the polygons of a mesh into clusters by recursively
//! cutting their set in half along the longest axis of its bounding box. The
//! resulting leaves group nearby triangles, which makes them suitable as
//! streaming or culling units for a renderer.
//!
//! # Example
//!
//! ```ignore
//! use lmf_tree::kd::{KdTree, SplitCriterion, SplitLimit, CollectingVisitor};
//!
//! let limit = SplitLimit::new(10, SplitCriterion::Polycount, 1000.0)?;
//! let tree = KdTree::from_source(&mesh, &limit)?;
//!
//! let mut visitor = CollectingVisitor::new();
//! tree.traverse_breadth_first(&mut visitor);
//! ```
//!
//! # Architecture
//!
//! - [`KdTree`]: Flat, breadth-first ordered node storage
//! - [`KdNode`]: Bounds, split axis, and polygons (leaves only)
//! - [`SplitLimit`]: Depth limit plus a [`SplitCriterion`] threshold
//! - [`KdVisitor`]: Visitor trait for custom traversal behavior

mod criterion;
mod node;
mod tree;
mod visitor;

// Re-export main types
pub use criterion::{SplitCriterion, SplitLimit};
pub use node::{KdNode, NodeId};
pub use tree::KdTree;
pub use visitor::{CollectingVisitor, FnVisitor, KdVisitor};
