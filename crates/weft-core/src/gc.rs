//! Reachability garbage collection.
//!
//! Both sweeps follow every reference an entry carries (children plus
//! record/tuple layout ids) and keep surviving entries in their original
//! insertion order. References to ids that are not present are ignored.

use std::collections::HashSet;

use tracing::debug;

use crate::graph::{Adjacency, GraphView};
use crate::ids::NodeId;

/// Entries reachable from the root.
///
/// Alias entries survive only when something reachable points at them,
/// which structural nodes never do, so a plain sweep drops every alias.
pub fn live_adjacency(graph: &impl GraphView) -> Adjacency {
    sweep(graph.adjacency(), [graph.root().clone()])
}

/// Entries reachable from the root or from any alias.
pub fn live_adjacency_preserving_aliases(graph: &impl GraphView) -> Adjacency {
    let adjacency = graph.adjacency();
    let seeds = std::iter::once(graph.root().clone())
        .chain(adjacency.keys().filter(|id| id.is_alias()).cloned());
    sweep(adjacency, seeds)
}

fn sweep(adjacency: &Adjacency, seeds: impl IntoIterator<Item = NodeId>) -> Adjacency {
    let mut live: HashSet<&NodeId> = HashSet::with_capacity(adjacency.len());
    let mut pending: Vec<&NodeId> = Vec::new();

    for seed in seeds {
        if let Some((id, _)) = adjacency.get_key_value(&seed) {
            pending.push(id);
        }
    }

    while let Some(id) = pending.pop() {
        if !live.insert(id) {
            continue;
        }
        let Some(entry) = adjacency.get(id) else {
            continue;
        };
        for reference in entry.references() {
            if let Some((key, _)) = adjacency.get_key_value(reference)
                && !live.contains(key)
            {
                pending.push(key);
            }
        }
    }

    let kept: Adjacency = adjacency
        .iter()
        .filter(|(id, _)| live.contains(id))
        .map(|(id, entry)| (id.clone(), entry.clone()))
        .collect();

    debug!(
        before = adjacency.len(),
        after = kept.len(),
        "garbage collected"
    );
    kept
}
