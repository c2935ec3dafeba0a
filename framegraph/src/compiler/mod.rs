//! Frame graph compilation.
//!
//! Turns the prepared [`FrameGraph`] into an execution plan:
//!
//! 1. **Topological Sort** - order nodes respecting dependencies, breaking
//!    ties by submission index so the same inputs give the same order
//! 2. **Lifetimes** - first and last use of every transient per device
//! 3. **Transient Allocation** - place transients in a per-device heap,
//!    sharing memory between attachments whose users are strictly ordered
//! 4. **Barriers** - state transitions and hazards between consecutive uses

mod barriers;
mod lifetime;
mod transient;

pub use barriers::Barrier;
pub use transient::TransientHeapStatistics;

pub(crate) use barriers::plan_barriers;
pub(crate) use lifetime::{ExecutionOrdering, transient_lifetimes};
pub(crate) use transient::TransientAllocator;

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use scopegraph_core::pool::Poolable;

use crate::error::FrameGraphError;
use crate::graph::{FrameGraph, NodeHandle};
use crate::scope::ScopeId;

/// Execution order of one frame.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CompiledSchedule {
    order: Vec<NodeHandle>,
}

impl CompiledSchedule {
    /// Nodes in execution order.
    pub(crate) fn order(&self) -> &[NodeHandle] {
        &self.order
    }
}

impl Poolable for CompiledSchedule {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.order.clear();
    }
}

/// Sort the graph into `target`, reusing its allocation.
///
/// Kahn's algorithm with a min-heap keyed by submission index: among the
/// nodes whose dependencies are satisfied, the earliest imported runs first.
pub(crate) fn compile_into(
    graph: &FrameGraph,
    target: &mut CompiledSchedule,
) -> Result<(), FrameGraphError> {
    scopegraph_core::profile_scope!("topological_sort");

    let n = graph.len();
    target.order.clear();
    if n == 0 {
        return Ok(());
    }

    // Edge (dependent, dependency) means dependent has one more in-degree
    let mut in_degree = vec![0u32; n];
    let mut dependents: Vec<Vec<NodeHandle>> = vec![Vec::new(); n];
    for &(dependent, dependency) in graph.edges() {
        in_degree[dependent.index()] += 1;
        dependents[dependency.index()].push(dependent);
    }

    let mut ready: BinaryHeap<Reverse<NodeHandle>> = graph
        .handles()
        .filter(|handle| in_degree[handle.index()] == 0)
        .map(Reverse)
        .collect();

    while let Some(Reverse(handle)) = ready.pop() {
        target.order.push(handle);
        for &dependent in &dependents[handle.index()] {
            in_degree[dependent.index()] -= 1;
            if in_degree[dependent.index()] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if target.order.len() != n {
        let mut stuck: Vec<ScopeId> = Vec::new();
        for handle in graph.handles() {
            let id = graph.scope_id(handle);
            if in_degree[handle.index()] > 0 && !stuck.contains(id) {
                stuck.push(id.clone());
            }
        }
        target.order.clear();
        return Err(FrameGraphError::CyclicDependency(stuck));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    fn graph_with(names: &[&str]) -> (FrameGraph, Vec<NodeHandle>) {
        let mut graph = FrameGraph::default();
        let handles = names
            .iter()
            .enumerate()
            .map(|(i, name)| graph.add_node(Scope::new(ScopeId::from(*name), 0), i))
            .collect();
        (graph, handles)
    }

    fn sort(graph: &FrameGraph) -> Result<Vec<NodeHandle>, FrameGraphError> {
        let mut schedule = CompiledSchedule::default();
        compile_into(graph, &mut schedule)?;
        Ok(schedule.order().to_vec())
    }

    #[test]
    fn test_compile_empty_graph() {
        let graph = FrameGraph::default();
        assert!(sort(&graph).unwrap().is_empty());
    }

    #[test]
    fn test_independent_nodes_keep_submission_order() {
        let (graph, h) = graph_with(&["a", "b", "c"]);
        assert_eq!(sort(&graph).unwrap(), h);
    }

    #[test]
    fn test_dependency_overrides_submission_order() {
        // a, b, c imported in order; a depends on c.
        let (mut graph, h) = graph_with(&["a", "b", "c"]);
        graph.add_dependency(h[0], h[2]);
        assert_eq!(sort(&graph).unwrap(), vec![h[1], h[2], h[0]]);
    }

    #[test]
    fn test_diamond_is_stable() {
        //     A
        //    / \
        //   B   C
        //    \ /
        //     D
        let (mut graph, h) = graph_with(&["a", "b", "c", "d"]);
        graph.add_dependency(h[2], h[0]);
        graph.add_dependency(h[1], h[0]);
        graph.add_dependency(h[3], h[2]);
        graph.add_dependency(h[3], h[1]);
        assert_eq!(sort(&graph).unwrap(), h);
    }

    #[test]
    fn test_cycle_reports_scopes() {
        let (mut graph, h) = graph_with(&["a", "b", "c"]);
        graph.add_dependency(h[1], h[2]);
        graph.add_dependency(h[2], h[1]);
        assert_eq!(
            sort(&graph),
            Err(FrameGraphError::CyclicDependency(vec![
                ScopeId::from("b"),
                ScopeId::from("c"),
            ]))
        );
    }

    #[test]
    fn test_reuse_target() {
        let (graph, h) = graph_with(&["a", "b"]);
        let mut schedule = CompiledSchedule::default();
        compile_into(&graph, &mut schedule).unwrap();
        compile_into(&graph, &mut schedule).unwrap();
        assert_eq!(schedule.order(), h.as_slice());
    }
}
