//! Builder for constructing normalized graphs entry by entry.

use crate::ids::{IdCursor, NodeId};
use crate::types::{Scalar, TypeTag};

use super::types::{Adjacency, NodeEntry, NormalizedGraph};

/// Builder that issues ids in order while entries are pushed.
///
/// Elaboration uses it internally; callers use it to assemble graphs that
/// would be impractical to express as nested expressions (e.g. very long
/// chains), or to hand-craft fixtures in tests.
///
/// # Example
///
/// ```
/// use weft_core::graph::GraphBuilder;
/// use weft_core::types::TypeTag;
///
/// let mut builder = GraphBuilder::new();
/// let three = builder.literal("num/literal", 3.0.into());
/// let four = builder.literal("num/literal", 4.0.into());
/// let sum = builder.push_node("num/add", vec![three, four], TypeTag::Number);
///
/// let graph = builder.finish(sum);
/// assert_eq!(graph.len(), 3);
/// assert_eq!(graph.root.as_str(), "c");
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    adjacency: Adjacency,
    cursor: IdCursor,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry under the next id.
    pub fn push(&mut self, entry: NodeEntry) -> NodeId {
        let id = self.cursor.issue();
        self.adjacency.insert(id.clone(), entry);
        id
    }

    /// Add a structural entry under the next id.
    pub fn push_node(
        &mut self,
        kind: impl Into<String>,
        children: Vec<NodeId>,
        out: TypeTag,
    ) -> NodeId {
        self.push(NodeEntry::new(kind, children, out))
    }

    /// Add a literal leaf under the next id.
    pub fn literal(&mut self, kind: impl Into<String>, value: Scalar) -> NodeId {
        self.push(NodeEntry::literal(kind, value))
    }

    /// Bind alias `name` to `target`.
    pub fn name(&mut self, name: &str, target: &NodeId) {
        let out = self
            .adjacency
            .get(target)
            .map(|entry| entry.out.clone())
            .unwrap_or(TypeTag::Any);
        self.adjacency
            .insert(NodeId::alias(name), NodeEntry::alias(target.clone(), out));
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeEntry> {
        self.adjacency.get(id)
    }

    /// Number of entries pushed so far.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Finish with `root` as the graph root.
    ///
    /// The declared output type is the root entry's type, or `Any` if the
    /// root was never pushed.
    pub fn finish(self, root: NodeId) -> NormalizedGraph {
        let output = self
            .adjacency
            .get(&root)
            .map(|entry| entry.out.clone())
            .unwrap_or(TypeTag::Any);

        NormalizedGraph {
            root,
            adjacency: self.adjacency,
            cursor: self.cursor,
            output,
        }
    }
}
