//! Level-by-level traversal of a graph.
//!
//! A node's level is `max(level of its predecessors) + 1`; entry nodes are
//! at level 0. Nodes that sit on a cycle (only possible for graphs built
//! with [`GraphBuilder::build_unvalidated`](super::GraphBuilder::build_unvalidated))
//! never get a level and are left out.

use super::Graph;
use crate::core::{NodeId, TaskOutput};
use std::collections::HashMap;
use std::fmt::{Display, Write};

/// Groups node ids by level, each level in insertion order.
#[must_use]
pub fn level_order<K: NodeId, R: TaskOutput>(graph: &Graph<K, R>) -> Vec<Vec<K>> {
    let mut remaining: HashMap<&K, usize> = graph
        .nodes()
        .map(|n| (n.id(), n.incoming().len()))
        .collect();
    let position: HashMap<&K, usize> = graph
        .ids()
        .iter()
        .enumerate()
        .map(|(i, id)| (id, i))
        .collect();
    let mut levels: Vec<Vec<K>> = Vec::new();
    let mut current: Vec<&K> = graph.entry_nodes();

    while !current.is_empty() {
        let mut next = Vec::new();
        for id in &current {
            for succ in graph.successors(id) {
                if let Some(count) = remaining.get_mut(succ) {
                    *count -= 1;
                    if *count == 0 {
                        next.push(succ);
                    }
                }
            }
        }
        levels.push(current.into_iter().cloned().collect());

        // keep insertion order within a level
        next.sort_by_key(|id| position.get(*id).copied());
        current = next;
    }

    levels
}

/// Renders the graph one level per line, each node followed by its
/// predecessors: `Level 1: b[a] c[a]`.
#[must_use]
pub fn render<K, R>(graph: &Graph<K, R>) -> String
where
    K: NodeId + Display,
    R: TaskOutput,
{
    let mut out = String::new();
    for (level, ids) in level_order(graph).iter().enumerate() {
        let _ = write!(out, "Level {level}:");
        for id in ids {
            let preds: Vec<String> = graph.predecessors(id).iter().map(ToString::to_string).collect();
            let _ = write!(out, " {id}[{}]", preds.join(","));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::task::{FnTask, Task};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn task() -> Arc<dyn Task<&'static str, ()>> {
        let task: FnTask<&'static str, (), _> = FnTask::new(|| Ok(()));
        Arc::new(task)
    }

    fn build(ids: &[&'static str], edges: &[(&'static str, &'static str)]) -> GraphBuilder<&'static str, ()> {
        let mut builder = GraphBuilder::new();
        for id in ids {
            builder.add_node(*id, task()).unwrap();
        }
        for (from, to) in edges {
            builder.add_dependency(*from, *to).unwrap();
        }
        builder
    }

    #[test]
    fn test_level_order() {
        let graph = build(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("a", "d")],
        )
        .build()
        .unwrap();

        assert_eq!(
            level_order(&graph),
            vec![vec!["a", "e"], vec!["b", "c"], vec!["d"]]
        );
    }

    #[test]
    fn test_level_is_longest_path() {
        let graph = build(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")])
            .build()
            .unwrap();
        assert_eq!(level_order(&graph), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn test_cycle_members_are_left_out() {
        let graph = build(&["root", "x", "y"], &[("x", "y"), ("y", "x")]).build_unvalidated();
        assert_eq!(level_order(&graph), vec![vec!["root"]]);
    }

    #[test]
    fn test_wide_level_keeps_insertion_order() {
        let mut builder: GraphBuilder<usize, ()> = GraphBuilder::new();
        let task = || -> Arc<dyn Task<usize, ()>> { Arc::new(FnTask::new(|| Ok(()))) };
        builder.add_node(0, task()).unwrap();
        for id in (1..=5_000).rev() {
            builder.add_node(id, task()).unwrap();
            builder.add_dependency(0, id).unwrap();
        }
        let graph = builder.build().unwrap();

        let levels = level_order(&graph);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1].len(), 5_000);
        assert_eq!(levels[1].first(), Some(&5_000));
        assert_eq!(levels[1].last(), Some(&1));
    }

    #[test]
    fn test_render() {
        let graph = build(&["a", "b", "c", "d"], &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")])
            .build()
            .unwrap();

        assert_eq!(
            render(&graph),
            "Level 0: a[]\nLevel 1: b[a] c[a]\nLevel 2: d[b,c]\n"
        );
    }
}
