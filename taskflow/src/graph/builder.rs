//! Graph builder with validation.

use super::{Graph, Node};
use crate::core::{NodeId, TaskOutput};
use crate::errors::{CycleDetectedError, ErrorInfo, GraphValidationError};
use crate::task::Task;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Builder for creating validated graphs.
pub struct GraphBuilder<K, R> {
    nodes: HashMap<K, Node<K, R>>,
    order: Vec<K>,
}

impl<K: NodeId, R: TaskOutput> GraphBuilder<K, R> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Returns the number of nodes added so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Adds a node and assigns `id` to its task.
    ///
    /// # Errors
    ///
    /// Returns an error if a node with the same id already exists.
    pub fn add_node(
        &mut self,
        id: K,
        task: Arc<dyn Task<K, R>>,
    ) -> Result<&mut Self, GraphValidationError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphValidationError::new(format!("Node {id:?} already exists"))
                .with_nodes(&[&id])
                .with_error_info(
                    ErrorInfo::new("GRAPH-DUPLICATE-NODE", format!("Duplicate node id {id:?}"))
                        .with_fix_hint("Give every node a unique id."),
                ));
        }

        task.set_id(id.clone());
        self.order.push(id.clone());
        self.nodes.insert(id.clone(), Node::new(id, task));
        Ok(self)
    }

    /// Declares that `to` depends on `from`.
    ///
    /// Adding the same edge twice has no further effect.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is unknown or if `from == to`.
    pub fn add_dependency(&mut self, from: K, to: K) -> Result<&mut Self, GraphValidationError> {
        if from == to {
            return Err(GraphValidationError::new(format!("Node {from:?} cannot depend on itself"))
                .with_nodes(&[&from])
                .with_error_info(ErrorInfo::new(
                    "GRAPH-SELF-DEPENDENCY",
                    format!("Self dependency on {from:?}"),
                )));
        }

        for id in [&from, &to] {
            if !self.nodes.contains_key(id) {
                return Err(GraphValidationError::new(format!(
                    "Dependency {from:?} -> {to:?} references unknown node {id:?}"
                ))
                .with_nodes(&[&from, &to])
                .with_error_info(
                    ErrorInfo::new("GRAPH-MISSING-NODE", format!("Node {id:?} not found"))
                        .with_fix_hint("Add both nodes before declaring the dependency."),
                ));
            }
        }

        if let Some(node) = self.nodes.get_mut(&from) {
            node.add_outgoing(to.clone());
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.add_incoming(from);
        }
        Ok(self)
    }

    /// Adds a node that depends on every current terminal node.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is already taken.
    pub fn add_as_dependent_on_all_leaf_nodes(
        &mut self,
        id: K,
        task: Arc<dyn Task<K, R>>,
    ) -> Result<&mut Self, GraphValidationError> {
        let leaves = self.ids_where(Node::is_terminal);
        self.add_node(id.clone(), task)?;
        for leaf in leaves {
            self.add_dependency(leaf, id.clone())?;
        }
        Ok(self)
    }

    /// Adds a node that every current entry node depends on.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is already taken.
    pub fn add_as_dependency_to_all_initial_nodes(
        &mut self,
        id: K,
        task: Arc<dyn Task<K, R>>,
    ) -> Result<&mut Self, GraphValidationError> {
        let entries = self.ids_where(Node::is_entry);
        self.add_node(id.clone(), task)?;
        for entry in entries {
            self.add_dependency(id.clone(), entry)?;
        }
        Ok(self)
    }

    /// Validates and builds the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is empty or contains a cycle.
    pub fn build(self) -> Result<Graph<K, R>, GraphValidationError> {
        if self.nodes.is_empty() {
            return Err(GraphValidationError::new("Graph has no nodes").with_error_info(
                ErrorInfo::new("GRAPH-EMPTY", "Cannot build an empty graph")
                    .with_fix_hint("Add at least one node before building."),
            ));
        }

        self.detect_cycles()?;
        Ok(self.build_unvalidated())
    }

    /// Builds the graph without checking for emptiness or cycles.
    ///
    /// Nodes caught in a cycle never become ready; the executor reports
    /// them as pending at the end of the run.
    #[must_use]
    pub fn build_unvalidated(self) -> Graph<K, R> {
        Graph::from_parts(self.nodes, self.order)
    }

    fn ids_where(&self, predicate: impl Fn(&Node<K, R>) -> bool) -> Vec<K> {
        self.order
            .iter()
            .filter(|id| self.nodes.get(*id).is_some_and(&predicate))
            .cloned()
            .collect()
    }

    /// Iterative depth-first search for a back edge. The explicit stack of
    /// `(node, next child index)` is also the current path.
    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited: HashSet<&K> = HashSet::new();
        let mut on_path: HashSet<&K> = HashSet::new();

        for root in &self.order {
            if !visited.insert(root) {
                continue;
            }
            on_path.insert(root);
            let mut stack: Vec<(&K, usize)> = vec![(root, 0)];

            while let Some((id, next)) = stack.last_mut() {
                let outgoing = self.nodes.get(*id).map_or(&[] as &[K], Node::outgoing);
                let Some(child) = outgoing.get(*next) else {
                    on_path.remove(*id);
                    stack.pop();
                    continue;
                };
                *next += 1;

                if on_path.contains(child) {
                    let start = stack.iter().position(|(n, _)| *n == child).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| format!("{n:?}")).collect();
                    cycle.push(format!("{child:?}"));
                    return Err(CycleDetectedError::new(cycle));
                }
                if visited.insert(child) {
                    on_path.insert(child);
                    stack.push((child, 0));
                }
            }
        }

        Ok(())
    }
}

impl<K: NodeId, R: TaskOutput> Default for GraphBuilder<K, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, R> fmt::Debug for GraphBuilder<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("nodes", &self.order)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExecutionStatus;
    use crate::task::FnTask;
    use pretty_assertions::assert_eq;

    fn task() -> Arc<dyn Task<&'static str, ()>> {
        let task: FnTask<&'static str, (), _> = FnTask::new(|| Ok(()));
        Arc::new(task)
    }

    fn builder_with(ids: &[&'static str]) -> GraphBuilder<&'static str, ()> {
        let mut builder = GraphBuilder::new();
        for id in ids {
            builder.add_node(*id, task()).unwrap();
        }
        builder
    }

    #[test]
    fn test_add_node_assigns_task_id() {
        let mut builder = GraphBuilder::new();
        let t = task();
        builder.add_node("a", Arc::clone(&t)).unwrap();
        assert_eq!(t.id(), Some("a"));
        assert_eq!(t.status(), ExecutionStatus::Pending);
        assert_eq!(builder.node_count(), 1);
    }

    #[test]
    fn test_duplicate_node() {
        let mut builder = builder_with(&["a"]);
        let err = builder.add_node("a", task()).unwrap_err();
        assert_eq!(err.code(), Some("GRAPH-DUPLICATE-NODE"));
        assert_eq!(err.nodes, vec![r#""a""#.to_string()]);
    }

    #[test]
    fn test_missing_node() {
        let mut builder = builder_with(&["a"]);
        let err = builder.add_dependency("a", "ghost").unwrap_err();
        assert_eq!(err.code(), Some("GRAPH-MISSING-NODE"));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_self_dependency() {
        let mut builder = builder_with(&["a"]);
        let err = builder.add_dependency("a", "a").unwrap_err();
        assert_eq!(err.code(), Some("GRAPH-SELF-DEPENDENCY"));
    }

    #[test]
    fn test_duplicate_edge_is_idempotent() {
        let mut builder = builder_with(&["a", "b"]);
        builder
            .add_dependency("a", "b")
            .unwrap()
            .add_dependency("a", "b")
            .unwrap();
        let graph = builder.build().unwrap();
        assert_eq!(graph.successors(&"a"), &["b"]);
        assert_eq!(graph.predecessors(&"b"), &["a"]);
    }

    #[test]
    fn test_empty_graph() {
        let err = GraphBuilder::<&str, ()>::new().build().unwrap_err();
        assert_eq!(err.code(), Some("GRAPH-EMPTY"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut builder = builder_with(&["a", "b", "c"]);
        builder
            .add_dependency("a", "b")
            .unwrap()
            .add_dependency("b", "c")
            .unwrap()
            .add_dependency("c", "a")
            .unwrap();

        let err = builder.build().unwrap_err();
        assert_eq!(err.code(), Some("GRAPH-CYCLE"));
        assert!(err.to_string().contains(r#""a" -> "b" -> "c" -> "a""#));
    }

    #[test]
    fn test_cycle_path_starts_at_back_edge_target() {
        let mut builder = builder_with(&["entry", "x", "y", "z"]);
        builder
            .add_dependency("entry", "x")
            .unwrap()
            .add_dependency("x", "y")
            .unwrap()
            .add_dependency("y", "z")
            .unwrap()
            .add_dependency("z", "x")
            .unwrap();

        let err = builder.build().unwrap_err();
        assert_eq!(err.nodes, vec![r#""x""#, r#""y""#, r#""z""#, r#""x""#]);
    }

    #[test]
    fn test_deep_chain_builds() {
        let mut builder: GraphBuilder<usize, ()> = GraphBuilder::new();
        for id in 0..10_000 {
            let task: FnTask<usize, (), _> = FnTask::new(|| Ok(()));
            builder.add_node(id, Arc::new(task)).unwrap();
            if id > 0 {
                builder.add_dependency(id - 1, id).unwrap();
            }
        }

        let graph = builder.build().unwrap();
        assert_eq!(graph.len(), 10_000);
        assert_eq!(graph.entry_nodes(), vec![&0]);
        assert_eq!(graph.terminal_nodes(), vec![&9_999]);
    }

    #[test]
    fn test_deep_chain_closing_cycle_is_detected() {
        let mut builder: GraphBuilder<usize, ()> = GraphBuilder::new();
        for id in 0..10_000 {
            let task: FnTask<usize, (), _> = FnTask::new(|| Ok(()));
            builder.add_node(id, Arc::new(task)).unwrap();
            if id > 0 {
                builder.add_dependency(id - 1, id).unwrap();
            }
        }
        builder.add_dependency(9_999, 5_000).unwrap();

        let err = builder.build().unwrap_err();
        assert_eq!(err.code(), Some("GRAPH-CYCLE"));
        assert_eq!(err.nodes.len(), 5_001);
        assert_eq!(err.nodes.first().map(String::as_str), Some("5000"));
        assert_eq!(err.nodes.last().map(String::as_str), Some("5000"));
    }

    #[test]
    fn test_unvalidated_build_keeps_cycle() {
        let mut builder = builder_with(&["a", "b"]);
        builder
            .add_dependency("a", "b")
            .unwrap()
            .add_dependency("b", "a")
            .unwrap();
        let graph = builder.build_unvalidated();
        assert!(graph.entry_nodes().is_empty());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_dependent_on_all_leaf_nodes() {
        let mut builder = builder_with(&["a", "b", "c"]);
        builder.add_dependency("a", "b").unwrap();
        builder.add_as_dependent_on_all_leaf_nodes("sink", task()).unwrap();

        let graph = builder.build().unwrap();
        assert_eq!(graph.predecessors(&"sink"), &["b", "c"]);
        assert_eq!(graph.terminal_nodes(), vec![&"sink"]);
    }

    #[test]
    fn test_dependency_to_all_initial_nodes() {
        let mut builder = builder_with(&["a", "b", "c"]);
        builder.add_dependency("a", "b").unwrap();
        builder.add_as_dependency_to_all_initial_nodes("source", task()).unwrap();

        let graph = builder.build().unwrap();
        assert_eq!(graph.successors(&"source"), &["a", "c"]);
        assert_eq!(graph.entry_nodes(), vec![&"source"]);
    }
}
