//! Node entries and the normalized graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dirty::DirtyGraph;
use crate::ids::{IdCursor, NodeId};
use crate::types::{AccessKey, Scalar, TypeTag};

/// Adjacency map: identifier → entry, in insertion order.
pub type Adjacency = IndexMap<NodeId, NodeEntry>;

/// Kind-family specific data attached to an entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Payload {
    /// Structural node whose meaning lives entirely in its kind and children.
    #[default]
    None,
    /// Scalar carried by a literal leaf.
    Literal(Scalar),
    /// Key requested by an access node.
    Access(AccessKey),
    /// Field name → child id of a record node.
    Record(IndexMap<String, NodeId>),
    /// Position → child id of a tuple node.
    Tuple(Vec<NodeId>),
}

impl Payload {
    /// Node ids embedded in the payload itself.
    pub fn referenced_ids(&self) -> Vec<&NodeId> {
        match self {
            Payload::Record(fields) => fields.values().collect(),
            Payload::Tuple(items) => items.iter().collect(),
            Payload::None | Payload::Literal(_) | Payload::Access(_) => Vec::new(),
        }
    }

    /// Replace every embedded occurrence of `from` with `to`.
    ///
    /// Returns whether anything changed.
    pub fn rewire(&mut self, from: &NodeId, to: &NodeId) -> bool {
        let mut changed = false;
        match self {
            Payload::Record(fields) => {
                for id in fields.values_mut() {
                    if id == from {
                        *id = to.clone();
                        changed = true;
                    }
                }
            }
            Payload::Tuple(items) => {
                for id in items.iter_mut() {
                    if id == from {
                        *id = to.clone();
                        changed = true;
                    }
                }
            }
            Payload::None | Payload::Literal(_) | Payload::Access(_) => {}
        }
        changed
    }
}

/// One row of a normalized graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    /// Node kind (e.g. `"num/add"`).
    pub kind: String,
    /// Ordered child identifiers.
    pub children: Vec<NodeId>,
    /// Declared output type.
    pub out: TypeTag,
    /// Kind-family specific data.
    #[serde(default)]
    pub payload: Payload,
}

impl NodeEntry {
    /// Structural entry with no payload.
    pub fn new(kind: impl Into<String>, children: Vec<NodeId>, out: TypeTag) -> Self {
        Self {
            kind: kind.into(),
            children,
            out,
            payload: Payload::None,
        }
    }

    /// Leaf entry carrying a scalar.
    pub fn literal(kind: impl Into<String>, value: Scalar) -> Self {
        Self {
            kind: kind.into(),
            children: Vec::new(),
            out: value.type_tag(),
            payload: Payload::Literal(value),
        }
    }

    /// Non-structural alias entry pointing at `target`.
    pub fn alias(target: NodeId, out: TypeTag) -> Self {
        Self::new(crate::kinds::ALIAS, vec![target], out)
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Same entry under a different kind.
    pub fn with_kind(&self, kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..self.clone()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_alias(&self) -> bool {
        self.kind == crate::kinds::ALIAS
    }

    /// Every node id this entry refers to: children first, then payload ids.
    pub fn references(&self) -> impl Iterator<Item = &NodeId> {
        self.children
            .iter()
            .chain(self.payload.referenced_ids())
    }

    /// Copy of this entry with every referenced id passed through `map`.
    pub fn map_ids(&self, map: impl Fn(&NodeId) -> NodeId) -> Self {
        let payload = match &self.payload {
            Payload::Record(fields) => Payload::Record(
                fields
                    .iter()
                    .map(|(name, id)| (name.clone(), map(id)))
                    .collect(),
            ),
            Payload::Tuple(items) => Payload::Tuple(items.iter().map(&map).collect()),
            other => other.clone(),
        };
        Self {
            kind: self.kind.clone(),
            children: self.children.iter().map(&map).collect(),
            out: self.out.clone(),
            payload,
        }
    }

    /// Replace every occurrence of `from` in children and payload.
    ///
    /// Returns whether anything changed.
    pub fn rewire(&mut self, from: &NodeId, to: &NodeId) -> bool {
        let mut changed = false;
        for child in self.children.iter_mut() {
            if child == from {
                *child = to.clone();
                changed = true;
            }
        }
        self.payload.rewire(from, to) || changed
    }
}

/// Canonical, content-addressable form of a program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedGraph {
    /// Root node identifier.
    pub root: NodeId,
    /// Identifier → entry.
    pub adjacency: Adjacency,
    /// Next identifier to issue.
    pub cursor: IdCursor,
    /// Declared output type of the whole program.
    pub output: TypeTag,
}

impl NormalizedGraph {
    pub fn get(&self, id: &NodeId) -> Option<&NodeEntry> {
        self.adjacency.get(id)
    }

    pub fn root_entry(&self) -> Option<&NodeEntry> {
        self.adjacency.get(&self.root)
    }

    /// Number of entries, aliases included.
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

    /// Editable copy-on-write snapshot.
    pub fn dirty(&self) -> DirtyGraph {
        self.to_dirty()
    }

    /// Iterate structural entries (aliases skipped).
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeId, &NodeEntry)> {
        self.adjacency.iter().filter(|(id, _)| !id.is_alias())
    }
}

/// Read access shared by normalized graphs and dirty snapshots.
pub trait GraphView {
    fn root(&self) -> &NodeId;
    fn adjacency(&self) -> &Adjacency;
    fn cursor(&self) -> &IdCursor;
    fn output(&self) -> &TypeTag;

    /// Editable snapshot of this graph.
    fn to_dirty(&self) -> DirtyGraph;
}

impl GraphView for NormalizedGraph {
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
        DirtyGraph::from_parts(
            self.root.clone(),
            self.adjacency.clone(),
            self.cursor.clone(),
            self.output.clone(),
        )
    }
}

pub(crate) fn resolve_alias<'a>(adjacency: &'a Adjacency, name: &str) -> Option<&'a NodeId> {
    adjacency
        .get(&NodeId::alias(name))
        .and_then(|entry| entry.children.first())
}
