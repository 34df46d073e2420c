//! Graph vertices.

use crate::core::{ExecutionStatus, NodeId, TaskOutput};
use crate::task::Task;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A graph vertex pairing an id with its task and dependency edges.
pub struct Node<K, R> {
    id: K,
    task: Arc<dyn Task<K, R>>,
    pub(crate) incoming: Vec<K>,
    pub(crate) outgoing: Vec<K>,
    result: OnceLock<R>,
}

impl<K: NodeId, R: TaskOutput> Node<K, R> {
    pub(crate) fn new(id: K, task: Arc<dyn Task<K, R>>) -> Self {
        Self {
            id,
            task,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            result: OnceLock::new(),
        }
    }

    /// Returns the node id.
    #[must_use]
    pub fn id(&self) -> &K {
        &self.id
    }

    /// Returns the task attached to the node.
    #[must_use]
    pub fn task(&self) -> &Arc<dyn Task<K, R>> {
        &self.task
    }

    /// Ids of the nodes this node depends on.
    #[must_use]
    pub fn incoming(&self) -> &[K] {
        &self.incoming
    }

    /// Ids of the nodes depending on this node.
    #[must_use]
    pub fn outgoing(&self) -> &[K] {
        &self.outgoing
    }

    /// Returns the current status of the node's task.
    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        self.task.status()
    }

    /// Returns the value produced by the task, once it has succeeded.
    #[must_use]
    pub fn result(&self) -> Option<&R> {
        self.result.get()
    }

    /// Stores the task's value. Only the first call has any effect.
    pub(crate) fn set_result(&self, value: R) -> bool {
        self.result.set(value).is_ok()
    }

    /// Returns true if the node has no predecessors.
    #[must_use]
    pub fn is_entry(&self) -> bool {
        self.incoming.is_empty()
    }

    /// Returns true if the node has no successors.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.outgoing.is_empty()
    }

    pub(crate) fn add_incoming(&mut self, id: K) {
        if !self.incoming.contains(&id) {
            self.incoming.push(id);
        }
    }

    pub(crate) fn add_outgoing(&mut self, id: K) {
        if !self.outgoing.contains(&id) {
            self.outgoing.push(id);
        }
    }
}

impl<K: fmt::Debug, R: fmt::Debug> fmt::Debug for Node<K, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("incoming", &self.incoming)
            .field("outgoing", &self.outgoing)
            .field("result", &self.result.get())
            .finish_non_exhaustive()
    }
}
