//! Graph Flattener
//!
//! Depth-first, dependency-before-dependent linearization of everything
//! reachable from a set of roots. Membership is keyed by fullname and keeps
//! first-insertion order; re-recording a fullname is a no-op.

use indexmap::IndexMap;
use std::collections::HashSet;

/// A graph the flattener can walk
pub trait DependencyGraph {
    type Id: Copy;

    /// Fullname identifying the node
    fn key(&self, id: Self::Id) -> &str;

    /// Direct dependencies in declaration order
    fn dependencies_of(&self, id: Self::Id) -> Vec<Self::Id>;
}

/// Flatten the closure of `roots` (roots themselves excluded unless reached).
///
/// A node is descended into at most once, so shared subtrees are walked a
/// single time and cyclic schemas terminate.
pub fn flatten<G: DependencyGraph>(graph: &G, roots: &[G::Id]) -> Vec<G::Id> {
    let mut recorded: IndexMap<String, G::Id> = IndexMap::new();
    let mut entered: HashSet<String> = HashSet::new();

    for &root in roots {
        descend(graph, root, &mut recorded, &mut entered);
    }

    recorded.into_values().collect()
}

fn descend<G: DependencyGraph>(
    graph: &G,
    node: G::Id,
    recorded: &mut IndexMap<String, G::Id>,
    entered: &mut HashSet<String>,
) {
    if !entered.insert(graph.key(node).to_string()) {
        return;
    }

    for dependency in graph.dependencies_of(node) {
        if !graph.dependencies_of(dependency).is_empty() {
            descend(graph, dependency, recorded, entered);
        }
        recorded
            .entry(graph.key(dependency).to_string())
            .or_insert(dependency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Adjacency list keyed by name
    struct Adjacency(HashMap<&'static str, Vec<&'static str>>);

    impl DependencyGraph for Adjacency {
        type Id = &'static str;

        fn key(&self, id: &'static str) -> &str {
            id
        }

        fn dependencies_of(&self, id: &'static str) -> Vec<&'static str> {
            self.0.get(id).cloned().unwrap_or_default()
        }
    }

    fn adjacency(edges: &[(&'static str, &[&'static str])]) -> Adjacency {
        Adjacency(edges.iter().map(|(k, v)| (*k, v.to_vec())).collect())
    }

    fn position(order: &[&str], name: &str) -> usize {
        order.iter().position(|n| *n == name).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let graph = adjacency(&[
            ("Order", &["Customer", "Item"]),
            ("Item", &["Product", "Unit"]),
            ("Product", &["Unit"]),
        ]);
        let order = flatten(&graph, &["Order"]);
        assert_eq!(order, vec!["Customer", "Unit", "Product", "Item"]);
        for (node, deps) in &graph.0 {
            if let Some(&at) = order.iter().find(|n| *n == node) {
                for dep in deps {
                    assert!(position(&order, dep) < position(&order, at));
                }
            }
        }
    }

    #[test]
    fn test_diamond_is_deduplicated_and_deterministic() {
        let graph = adjacency(&[
            ("Root", &["Left", "Right"]),
            ("Left", &["Shared"]),
            ("Right", &["Shared"]),
            ("Shared", &["Leaf"]),
        ]);
        let first = flatten(&graph, &["Root"]);
        let second = flatten(&graph, &["Root"]);
        assert_eq!(first, vec!["Leaf", "Shared", "Left", "Right"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_cycle_terminates() {
        let graph = adjacency(&[("A", &["B"]), ("B", &["A"])]);
        let order = flatten(&graph, &["A"]);
        assert_eq!(order, vec!["A", "B"]);
    }

    #[test]
    fn test_multiple_roots_share_membership() {
        let graph = adjacency(&[("R1", &["X"]), ("R2", &["X", "Y"])]);
        assert_eq!(flatten(&graph, &["R1", "R2"]), vec!["X", "Y"]);
    }
}
