//! Copy-on-write graph editing.
//!
//! A [`DirtyGraph`] is an editable snapshot of a normalized graph. Its
//! adjacency map sits behind an [`Arc`]; every edit clones the handle and
//! copies the map on first write, so each edit returns a new snapshot while
//! snapshots held elsewhere keep seeing exactly what they saw before.
//!
//! Edits do not validate. A snapshot may be temporarily ill-formed (dangling
//! children, a missing root) while a sequence of edits is in progress;
//! [`DirtyGraph::commit`] checks the invariants and produces a
//! [`NormalizedGraph`] again.
//!
//! # Example
//!
//! ```
//! use weft_core::graph::GraphBuilder;
//! use weft_core::types::TypeTag;
//!
//! let mut builder = GraphBuilder::new();
//! let one = builder.literal("num/literal", 1.0.into());
//! let two = builder.literal("num/literal", 2.0.into());
//! let sum = builder.push_node("num/add", vec![one, two], TypeTag::Number);
//! let graph = builder.finish(sum.clone());
//!
//! let before = graph.dirty();
//! let entry = before.get(&sum).unwrap().with_kind("num/sub");
//! let after = before.swap_entry(&sum, entry);
//!
//! assert_eq!(before.get(&sum).unwrap().kind, "num/add");
//! assert_eq!(after.get(&sum).unwrap().kind, "num/sub");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::CommitError;
use crate::gc::{live_adjacency, live_adjacency_preserving_aliases};
use crate::graph::{Adjacency, GraphView, NodeEntry, NormalizedGraph, resolve_alias};
use crate::ids::{IdCursor, NodeId};
use crate::types::TypeTag;

/// Editable, independently owned graph snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyGraph {
    root: NodeId,
    adjacency: Arc<Adjacency>,
    cursor: IdCursor,
    output: TypeTag,
}

impl DirtyGraph {
    pub(crate) fn from_parts(
        root: NodeId,
        adjacency: Adjacency,
        cursor: IdCursor,
        output: TypeTag,
    ) -> Self {
        Self {
            root,
            adjacency: Arc::new(adjacency),
            cursor,
            output,
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeEntry> {
        self.adjacency.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.adjacency.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Target of alias `name`, if bound.
    pub fn resolve_alias(&self, name: &str) -> Option<&NodeId> {
        resolve_alias(&self.adjacency, name)
    }

    /// New snapshot with `edit` applied to a private copy of the adjacency.
    fn edit(&self, edit: impl FnOnce(&mut Adjacency)) -> Self {
        let mut next = self.clone();
        edit(Arc::make_mut(&mut next.adjacency));
        next.refresh_output();
        next
    }

    /// Private copy of the adjacency for a batch of in-place edits.
    pub(crate) fn adjacency_mut(&mut self) -> &mut Adjacency {
        Arc::make_mut(&mut self.adjacency)
    }

    pub(crate) fn refresh_output(&mut self) {
        if let Some(entry) = self.adjacency.get(&self.root) {
            self.output = entry.out.clone();
        }
    }

    /// Insert `entry` at `id`, replacing any entry already there.
    pub fn add_entry(&self, id: NodeId, entry: NodeEntry) -> Self {
        self.edit(|adjacency| {
            adjacency.insert(id, entry);
        })
    }

    /// Insert `entry` under the next unused cursor id.
    pub fn add_fresh(&self, entry: NodeEntry) -> (Self, NodeId) {
        let mut next = self.clone();
        let id = next.issue_id();
        let next = next.add_entry(id.clone(), entry);
        (next, id)
    }

    /// Remove the entry at `id`. References to it are left dangling.
    pub fn remove_entry(&self, id: &NodeId) -> Self {
        self.edit(|adjacency| {
            adjacency.shift_remove(id);
        })
    }

    /// Replace the entry at `id` outright.
    pub fn swap_entry(&self, id: &NodeId, entry: NodeEntry) -> Self {
        self.edit(|adjacency| {
            adjacency.insert(id.clone(), entry);
        })
    }

    /// Replace every reference to `from` with `to`.
    ///
    /// Covers child lists, record/tuple layouts and alias targets. The root
    /// is not touched; use [`DirtyGraph::set_root`] for that.
    pub fn rewire(&self, from: &NodeId, to: &NodeId) -> Self {
        self.edit(|adjacency| rewire_entries(adjacency, from, to, true))
    }

    /// Like [`DirtyGraph::rewire`], but leaves alias targets alone.
    pub fn rewire_structural(&self, from: &NodeId, to: &NodeId) -> Self {
        self.edit(|adjacency| rewire_entries(adjacency, from, to, false))
    }

    /// Designate `id` as the root.
    pub fn set_root(&self, id: &NodeId) -> Self {
        let mut next = self.clone();
        next.move_root(id);
        next
    }

    pub(crate) fn move_root(&mut self, id: &NodeId) {
        self.root = id.clone();
        self.output = self
            .adjacency
            .get(id)
            .map(|entry| entry.out.clone())
            .unwrap_or(TypeTag::Any);
    }

    /// Bind alias `name` to `target`.
    pub fn name(&self, name: &str, target: &NodeId) -> Self {
        let out = self
            .adjacency
            .get(target)
            .map(|entry| entry.out.clone())
            .unwrap_or(TypeTag::Any);
        self.add_entry(NodeId::alias(name), NodeEntry::alias(target.clone(), out))
    }

    /// Snapshot keeping only entries reachable from the root.
    pub fn gc(&self) -> Self {
        let mut next = self.clone();
        next.adjacency = Arc::new(live_adjacency(self));
        next
    }

    /// Like [`DirtyGraph::gc`], but every alias and its target survive.
    pub fn gc_preserving_aliases(&self) -> Self {
        let mut next = self.clone();
        next.adjacency = Arc::new(live_adjacency_preserving_aliases(self));
        next
    }

    /// Validate and turn the snapshot back into a normalized graph.
    ///
    /// Checks that the root exists, that every referenced id exists, that no
    /// structural node lists an alias as a child, and that child edges are
    /// acyclic.
    pub fn commit(self) -> Result<NormalizedGraph, CommitError> {
        if !self.adjacency.contains_key(&self.root) {
            return Err(CommitError::MissingRoot { root: self.root });
        }

        for (id, entry) in self.adjacency.iter() {
            for reference in entry.references() {
                if !self.adjacency.contains_key(reference) {
                    return Err(CommitError::Dangling {
                        parent: id.clone(),
                        child: reference.clone(),
                    });
                }
                if reference.is_alias() && !id.is_alias() {
                    return Err(CommitError::AliasAsChild {
                        parent: id.clone(),
                        alias: reference.clone(),
                    });
                }
            }
        }

        check_acyclic(&self.adjacency)?;

        let adjacency = Arc::try_unwrap(self.adjacency).unwrap_or_else(|shared| (*shared).clone());
        trace!(root = %self.root, entries = adjacency.len(), "snapshot committed");

        Ok(NormalizedGraph {
            root: self.root,
            adjacency,
            cursor: self.cursor,
            output: self.output,
        })
    }

    /// Advance the cursor past ids already present.
    pub(crate) fn issue_id(&mut self) -> NodeId {
        loop {
            let id = self.cursor.issue();
            if !self.adjacency.contains_key(&id) {
                return id;
            }
        }
    }
}

impl GraphView for DirtyGraph {
    fn root(&self) -> &NodeId {
        &self.root
    }

    fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    fn cursor(&self) -> &IdCursor {
        &self.cursor
    }

    fn output(&self) -> &TypeTag {
        &self.output
    }

    fn to_dirty(&self) -> DirtyGraph {
        self.clone()
    }
}

impl From<NormalizedGraph> for DirtyGraph {
    fn from(graph: NormalizedGraph) -> Self {
        Self::from_parts(graph.root, graph.adjacency, graph.cursor, graph.output)
    }
}

pub(crate) fn rewire_entries(
    adjacency: &mut Adjacency,
    from: &NodeId,
    to: &NodeId,
    include_aliases: bool,
) {
    for (id, entry) in adjacency.iter_mut() {
        if !include_aliases && id.is_alias() {
            continue;
        }
        entry.rewire(from, to);
    }
}

/// Iterative three-colour DFS over child edges.
fn check_acyclic(adjacency: &Adjacency) -> Result<(), CommitError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Open,
        Closed,
    }

    let mut marks: HashMap<&NodeId, Mark> = HashMap::with_capacity(adjacency.len());

    for start in adjacency.keys() {
        if marks.contains_key(start) {
            continue;
        }
        marks.insert(start, Mark::Open);
        let mut stack: Vec<(&NodeId, usize)> = vec![(start, 0)];

        while let Some((id, next_child)) = stack.pop() {
            let children = adjacency
                .get(id)
                .map(|entry| entry.children.as_slice())
                .unwrap_or_default();

            let Some(child) = children.get(next_child) else {
                marks.insert(id, Mark::Closed);
                continue;
            };
            stack.push((id, next_child + 1));

            match marks.get(child) {
                Some(Mark::Open) => return Err(CommitError::Cycle { id: child.clone() }),
                Some(Mark::Closed) => {}
                None => {
                    marks.insert(child, Mark::Open);
                    stack.push((child, 0));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, Payload};
    use crate::types::Scalar;

    /// `c = add(a, b)` with `a = 1`, `b = 2`.
    fn sum_graph() -> NormalizedGraph {
        let mut builder = GraphBuilder::new();
        let a = builder.literal("lit", Scalar::Number(1.0));
        let b = builder.literal("lit", Scalar::Number(2.0));
        let c = builder.push_node("add", vec![a, b], TypeTag::Number);
        builder.finish(c)
    }

    #[test]
    fn test_edits_leave_prior_snapshots_untouched() {
        let graph = sum_graph();
        let first = graph.dirty();
        let second = first.remove_entry(&"a".into());
        let third = second.add_entry("z".into(), NodeEntry::literal("lit", Scalar::Number(9.0)));

        assert!(first.contains(&"a".into()));
        assert!(!second.contains(&"a".into()));
        assert!(!second.contains(&"z".into()));
        assert!(third.contains(&"z".into()));
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_rewire_covers_children_layouts_and_aliases() {
        let mut builder = GraphBuilder::new();
        let a = builder.literal("lit", Scalar::Number(1.0));
        let b = builder.literal("lit", Scalar::Number(2.0));
        let tuple = builder.push(
            NodeEntry::new("core/tuple", vec![a.clone(), a.clone()], TypeTag::Tuple)
                .with_payload(Payload::Tuple(vec![a.clone(), a.clone()])),
        );
        builder.name("first", &a);
        let graph = builder.finish(tuple.clone());

        let rewired = graph.dirty().rewire(&a, &b);
        let entry = rewired.get(&tuple).unwrap();
        assert_eq!(entry.children, vec![b.clone(), b.clone()]);
        assert_eq!(entry.payload, Payload::Tuple(vec![b.clone(), b.clone()]));
        assert_eq!(rewired.resolve_alias("first"), Some(&b));

        let structural = graph.dirty().rewire_structural(&a, &b);
        assert_eq!(structural.resolve_alias("first"), Some(&a));
    }

    #[test]
    fn test_add_fresh_skips_taken_ids() {
        let graph = sum_graph();
        let dirty = graph.dirty().add_entry("d".into(), NodeEntry::literal("lit", Scalar::Null));
        let (dirty, id) = dirty.add_fresh(NodeEntry::literal("lit", Scalar::Boolean(true)));
        assert_eq!(id.as_str(), "e");
        assert_eq!(dirty.len(), 5);
    }

    #[test]
    fn test_set_root_updates_output() {
        let dirty = sum_graph().dirty();
        assert_eq!(dirty.output(), &TypeTag::Number);
        let moved = dirty.set_root(&"a".into());
        assert_eq!(moved.root().as_str(), "a");
        assert_eq!(moved.output(), &TypeTag::Number);

        let swapped = dirty.swap_entry(&"c".into(), NodeEntry::literal("lit", Scalar::from("s")));
        assert_eq!(swapped.output(), &TypeTag::String);
    }

    #[test]
    fn test_commit_detects_dangling_and_missing_root() {
        let dirty = sum_graph().dirty();

        let err = dirty.remove_entry(&"a".into()).commit().unwrap_err();
        assert_eq!(
            err,
            CommitError::Dangling {
                parent: "c".into(),
                child: "a".into()
            }
        );

        let err = dirty.set_root(&"zz".into()).commit().unwrap_err();
        assert_eq!(err, CommitError::MissingRoot { root: "zz".into() });
    }

    #[test]
    fn test_commit_detects_cycle() {
        let dirty = sum_graph().dirty();
        // a now depends on c, which depends on a
        let cyclic = dirty.swap_entry(
            &"a".into(),
            NodeEntry::new("wrap", vec!["c".into()], TypeTag::Number),
        );
        assert!(matches!(cyclic.commit(), Err(CommitError::Cycle { .. })));
    }

    #[test]
    fn test_commit_rejects_alias_as_child() {
        let dirty = sum_graph().dirty().name("one", &"a".into());
        let bad = dirty.rewire_structural(&"a".into(), &NodeId::alias("one"));
        assert!(matches!(bad.commit(), Err(CommitError::AliasAsChild { .. })));
    }

    #[test]
    fn test_commit_round_trips_clean_snapshot() {
        let graph = sum_graph();
        assert_eq!(graph.dirty().commit().unwrap(), graph);
    }
}
