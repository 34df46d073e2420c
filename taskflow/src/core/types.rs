//! Bounds shared by every generic type in the crate.

use std::fmt::Debug;
use std::hash::Hash;

/// Identity of a node in the graph.
pub trait NodeId: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> NodeId for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Value produced by a successful task.
pub trait TaskOutput: Clone + Debug + Send + Sync + 'static {}

impl<T> TaskOutput for T where T: Clone + Debug + Send + Sync + 'static {}
