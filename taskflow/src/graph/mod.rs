//! Dependency graphs of tasks.
//!
//! A [`Graph`] is built once with a [`GraphBuilder`] and is read-only
//! afterwards. Edges only define execution order; no data flows along them.

mod builder;
mod node;
mod traversal;

pub use builder::GraphBuilder;
pub use node::Node;
pub use traversal::{level_order, render};

use crate::core::{NodeId, TaskOutput};
use std::collections::HashMap;

/// An immutable directed acyclic graph of tasks.
#[derive(Debug)]
pub struct Graph<K, R> {
    nodes: HashMap<K, Node<K, R>>,
    order: Vec<K>,
}

impl<K: NodeId, R: TaskOutput> Graph<K, R> {
    pub(crate) fn from_parts(nodes: HashMap<K, Node<K, R>>, order: Vec<K>) -> Self {
        Self { nodes, order }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true if the graph contains the node.
    #[must_use]
    pub fn contains(&self, id: &K) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, id: &K) -> Option<&Node<K, R>> {
        self.nodes.get(id)
    }

    /// Iterates nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<K, R>> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Node ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[K] {
        &self.order
    }

    /// Nodes without predecessors.
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<&K> {
        self.nodes().filter(|n| n.is_entry()).map(Node::id).collect()
    }

    /// Nodes without successors.
    #[must_use]
    pub fn terminal_nodes(&self) -> Vec<&K> {
        self.nodes().filter(|n| n.is_terminal()).map(Node::id).collect()
    }

    /// Predecessor ids of a node. Empty for unknown ids.
    #[must_use]
    pub fn predecessors(&self, id: &K) -> &[K] {
        self.nodes.get(id).map_or(&[] as &[K], Node::incoming)
    }

    /// Successor ids of a node. Empty for unknown ids.
    #[must_use]
    pub fn successors(&self, id: &K) -> &[K] {
        self.nodes.get(id).map_or(&[] as &[K], Node::outgoing)
    }

    /// Returns true once every predecessor of `id` has a terminal status.
    #[must_use]
    pub fn predecessors_terminal(&self, id: &K) -> bool {
        self.predecessors(id)
            .iter()
            .all(|p| self.nodes.get(p).is_some_and(|n| n.status().is_terminal()))
    }

    /// Successors of `completed` whose predecessors are now all terminal.
    ///
    /// The result may include nodes that are already terminal themselves;
    /// callers decide what to do with them.
    #[must_use]
    pub fn nodes_ready_after(&self, completed: &K) -> Vec<&K> {
        self.successors(completed)
            .iter()
            .filter(|s| self.predecessors_terminal(s))
            .collect()
    }
}
