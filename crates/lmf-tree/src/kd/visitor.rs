//! Visitor pattern for KD tree traversal.
//!
//! Visitors receive nodes without owning the tree, which makes them the hook
//! for debugging output and visualization: a host can draw node bounds or
//! print the topology without the partitioner knowing about it.

use super::node::{KdNode, NodeId};

/// Visitor for processing nodes during KD tree traversal.
pub trait KdVisitor {
    /// Called once for each node, in traversal order.
    fn visit(&mut self, node: &KdNode);
}

/// A simple visitor that records the ids of visited nodes.
#[derive(Debug, Default)]
pub struct CollectingVisitor {
    collected: Vec<NodeId>,
}

impl CollectingVisitor {
    /// Creates a new empty collecting visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the visited ids, in visit order.
    pub fn ids(&self) -> &[NodeId] {
        &self.collected
    }

    pub fn into_ids(self) -> Vec<NodeId> {
        self.collected
    }
}

impl KdVisitor for CollectingVisitor {
    fn visit(&mut self, node: &KdNode) {
        self.collected.push(node.id());
    }
}

/// A visitor that calls a closure for each node.
pub struct FnVisitor<F>
where
    F: FnMut(&KdNode),
{
    func: F,
}

impl<F> FnVisitor<F>
where
    F: FnMut(&KdNode),
{
    /// Creates a new visitor from a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> KdVisitor for FnVisitor<F>
where
    F: FnMut(&KdNode),
{
    fn visit(&mut self, node: &KdNode) {
        (self.func)(node);
    }
}
