//! Predicate-driven rewrites.
//!
//! Every rewrite takes any [`GraphView`] and returns a new [`DirtyGraph`];
//! the input is never touched. Each operation makes at most one private copy
//! of the adjacency map and then edits it in place.
//!
//! Rewrites do not collect garbage. Nodes that become unreachable stay in the
//! snapshot until [`DirtyGraph::gc`] (or the alias-preserving variant) runs.

use indexmap::IndexMap;
use tracing::debug;

use crate::dirty::{DirtyGraph, rewire_entries};
use crate::gc::live_adjacency;
use crate::graph::{GraphView, NodeEntry, resolve_alias};
use crate::ids::NodeId;
use crate::predicate::{Predicate, select_where};

/// Replace every matching entry with `transform(id, entry)`.
///
/// The declared output type follows the root entry, so replacing the root
/// with an entry of a different type changes the graph's output.
pub fn map_where<F>(graph: &impl GraphView, predicate: &Predicate, mut transform: F) -> DirtyGraph
where
    F: FnMut(&NodeId, &NodeEntry) -> NodeEntry,
{
    let adjacency = graph.adjacency();
    let replacements: Vec<(NodeId, NodeEntry)> = adjacency
        .iter()
        .filter(|(id, entry)| predicate.matches(id, entry, adjacency))
        .map(|(id, entry)| (id.clone(), transform(id, entry)))
        .collect();

    let mut next = graph.to_dirty();
    if replacements.is_empty() {
        return next;
    }

    debug!(predicate = %predicate, replaced = replacements.len(), "map_where");
    let target = next.adjacency_mut();
    for (id, entry) in replacements {
        target.insert(id, entry);
    }
    next.refresh_output();
    next
}

/// Change the kind of every matching node, keeping children and payload.
pub fn replace_where(graph: &impl GraphView, predicate: &Predicate, kind: &str) -> DirtyGraph {
    map_where(graph, predicate, |_, entry| entry.with_kind(kind))
}

/// Excise every matching node, reattaching its referrers to one of its children.
///
/// Each spliced node is replaced by its child at `child_index`, wherever it
/// was referenced: parent child lists, record/tuple layouts, alias targets
/// and the root. When that child was itself spliced, the chain is followed
/// to the first survivor. Matching nodes without a child at `child_index`
/// are left in place.
pub fn splice_where(
    graph: &impl GraphView,
    predicate: &Predicate,
    child_index: usize,
) -> DirtyGraph {
    let adjacency = graph.adjacency();

    let direct: IndexMap<NodeId, NodeId> = select_where(graph, predicate)
        .into_iter()
        .filter_map(|id| {
            let child = adjacency.get(&id)?.children.get(child_index)?.clone();
            Some((id, child))
        })
        .collect();

    let mut next = graph.to_dirty();
    if direct.is_empty() {
        return next;
    }

    // Follow chains of spliced nodes to the first survivor. Graphs are
    // acyclic, but snapshots need not be, so bound the walk.
    let resolved: IndexMap<NodeId, NodeId> = direct
        .keys()
        .map(|id| {
            let mut current = &direct[id];
            for _ in 0..direct.len() {
                match direct.get(current) {
                    Some(further) => current = further,
                    None => break,
                }
            }
            (id.clone(), current.clone())
        })
        .collect();

    debug!(predicate = %predicate, spliced = resolved.len(), child_index, "splice_where");

    let rewired = next.adjacency_mut();
    for id in resolved.keys() {
        rewired.shift_remove(id);
    }
    for entry in rewired.values_mut() {
        if entry.references().any(|id| resolved.contains_key(id)) {
            *entry = entry.map_ids(|id| resolved.get(id).unwrap_or(id).clone());
        }
    }

    if let Some(survivor) = resolved.get(next.root()).cloned() {
        next.move_root(&survivor);
    } else {
        next.refresh_output();
    }
    next
}

/// Put a copy of `replacement` in place of node `at`.
///
/// The part of `replacement` reachable from its root is copied under fresh
/// ids; every reference to `at` (aliases and the root included) is then
/// redirected to the copy's root. `at` itself stays in the snapshot.
///
/// Returns `None` when `at` is absent or `replacement` has no root entry.
pub fn graft(
    graph: &impl GraphView,
    at: &NodeId,
    replacement: &impl GraphView,
) -> Option<DirtyGraph> {
    if !graph.adjacency().contains_key(at) {
        return None;
    }
    let copied = live_adjacency(replacement);
    if !copied.contains_key(replacement.root()) {
        return None;
    }

    let mut next = graph.to_dirty();
    let fresh: IndexMap<NodeId, NodeId> = copied
        .keys()
        .map(|id| (id.clone(), next.issue_id()))
        .collect();
    let new_root = fresh.get(replacement.root())?.clone();

    let target = next.adjacency_mut();
    rewire_entries(target, at, &new_root, true);
    for (id, entry) in &copied {
        let entry = entry.map_ids(|child| fresh.get(child).unwrap_or(child).clone());
        target.insert(fresh[id].clone(), entry);
    }

    debug!(at = %at, root = %new_root, copied = copied.len(), "grafted");

    if next.root() == at {
        next.move_root(&new_root);
    }
    Some(next)
}

/// Insert a one-child node of `kind` above the target of alias `name`.
///
/// Every structural reference to the target (and the root, if it is the
/// target) is redirected to the wrapper, whose only child is the target.
/// The alias keeps naming the original target.
///
/// Returns `None` when `name` is not bound.
pub fn wrap_by_name(graph: &impl GraphView, name: &str, kind: &str) -> Option<DirtyGraph> {
    let target = resolve_alias(graph.adjacency(), name)?.clone();
    let out = graph.adjacency().get(&target)?.out.clone();

    let mut next = graph.to_dirty();
    let wrapper = next.issue_id();

    let adjacency = next.adjacency_mut();
    rewire_entries(adjacency, &target, &wrapper, false);
    adjacency.insert(wrapper.clone(), NodeEntry::new(kind, vec![target.clone()], out));

    debug!(alias = %name, target = %target, wrapper = %wrapper, kind = %kind, "wrapped");

    if next.root() == &target {
        next.move_root(&wrapper);
    }
    Some(next)
}
