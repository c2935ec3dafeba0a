//! Frame graph construction.
//!
//! Each frame, producers are imported into a [`FrameGraphBuilder`]. When
//! the frame ends, every producer is prepared once per device it runs on,
//! producing one node per (scope, device). Nodes are kept in submission
//! order: the order producers were imported, then ascending device index.
//!
//! Dependencies are derived from the declarations:
//!
//! - a read depends on the latest earlier write of the same attachment
//! - a write depends on the latest earlier write and on every read since
//! - overlapping local query ranges are ordered the same way
//! - `execute_after` / `execute_before` add explicit edges
//!
//! Attachment edges always point forward in submission order, so only
//! explicit ordering requests can create a cycle.

mod builder;
mod dependencies;

pub use builder::FrameGraphBuilder;

pub(crate) use builder::prepare_scopes;
pub(crate) use dependencies::build_dependencies;

use std::collections::HashSet;

use scopegraph_core::pool::Poolable;

use crate::device::DeviceIndex;
use crate::scope::{Scope, ScopeId};

/// Handle to a node (one scope on one device) in the frame graph.
///
/// Handles are indices in submission order and only valid for the frame
/// that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u32);

impl NodeHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Submission index of the node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One scope prepared for one device.
#[derive(Debug)]
pub(crate) struct ScopeNode {
    pub(crate) scope: Scope,
    /// Index of the producer in the builder.
    pub(crate) producer: usize,
}

/// Nodes and dependency edges of one frame.
#[derive(Debug, Default)]
pub(crate) struct FrameGraph {
    nodes: Vec<ScopeNode>,
    /// Dependency edges stored as (dependent, dependency) pairs.
    edges: Vec<(NodeHandle, NodeHandle)>,
    edge_set: HashSet<(NodeHandle, NodeHandle)>,
}

impl FrameGraph {
    pub(crate) fn add_node(&mut self, scope: Scope, producer: usize) -> NodeHandle {
        let handle = NodeHandle::new(self.nodes.len() as u32);
        self.nodes.push(ScopeNode { scope, producer });
        handle
    }

    /// Add an edge; `dependent` runs after `dependency`. Duplicates are ignored.
    pub(crate) fn add_dependency(&mut self, dependent: NodeHandle, dependency: NodeHandle) {
        if dependent == dependency {
            log::warn!(
                "FrameGraph: scope '{}' cannot depend on itself, ignoring",
                self.nodes[dependent.index()].scope.id
            );
            return;
        }
        if self.edge_set.insert((dependent, dependency)) {
            self.edges.push((dependent, dependency));
        }
    }

    pub(crate) fn nodes(&self) -> &[ScopeNode] {
        &self.nodes
    }

    pub(crate) fn node(&self, handle: NodeHandle) -> &ScopeNode {
        &self.nodes[handle.index()]
    }

    pub(crate) fn edges(&self) -> &[(NodeHandle, NodeHandle)] {
        &self.edges
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn handles(&self) -> impl Iterator<Item = NodeHandle> {
        (0..self.nodes.len() as u32).map(NodeHandle::new)
    }

    /// Nodes running `scope`, in submission order.
    pub(crate) fn find_scope<'a>(
        &'a self,
        scope: &'a str,
    ) -> impl Iterator<Item = (NodeHandle, DeviceIndex)> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.scope.id.as_str() == scope)
            .map(|(index, node)| (NodeHandle::new(index as u32), node.scope.device))
    }

    pub(crate) fn scope_id(&self, handle: NodeHandle) -> &ScopeId {
        &self.nodes[handle.index()].scope.id
    }
}

impl Poolable for FrameGraph {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.edge_set.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_and_self_edges_ignored() {
        let mut graph = FrameGraph::default();
        let a = graph.add_node(Scope::new(ScopeId::from("a"), 0), 0);
        let b = graph.add_node(Scope::new(ScopeId::from("b"), 0), 1);

        graph.add_dependency(b, a);
        graph.add_dependency(b, a);
        graph.add_dependency(a, a);

        assert_eq!(graph.edges(), &[(b, a)]);
        assert_eq!(graph.find_scope("b").collect::<Vec<_>>(), vec![(b, 0)]);
    }

    #[test]
    fn test_reset() {
        let mut graph = FrameGraph::default();
        graph.add_node(Scope::new(ScopeId::from("a"), 0), 0);
        graph.reset();
        assert_eq!(graph.len(), 0);
        assert!(graph.edges().is_empty());
    }
}
