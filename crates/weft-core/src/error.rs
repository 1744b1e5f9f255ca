//! Error types
//!
//! Faults fall into two classes. Structural faults (`ConfigError`,
//! `ElaborateError`, `CommitError`) are raised while composing plugins,
//! elaborating expressions or validating edited graphs. Evaluation faults
//! (`FoldError`) are raised while folding. None of them are recoverable where
//! raised; each carries the offending kind and/or node id.

use thiserror::Error;

use crate::ids::NodeId;
use crate::types::{AccessKey, TypeTag};

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Any fault raised by the core.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Elaborate(#[from] ElaborateError),

    #[error(transparent)]
    Fold(#[from] FoldError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Plugin composition fault, raised before any elaboration or fold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Plugin declares node kinds but has neither default handlers nor an override.
    #[error("plugin '{plugin}' declares node kinds but has no default handlers and no override")]
    MissingHandlers {
        /// Name of the plugin lacking handlers.
        plugin: String,
    },

    /// A spec, trait, lift or handler references a kind missing from `node_kinds`.
    #[error("plugin '{plugin}' references kind '{kind}' in its {table} without declaring it")]
    UndeclaredKind {
        /// Name of the offending plugin.
        plugin: String,
        /// Kind that is referenced but not declared.
        kind: String,
        /// Table the reference appeared in (`kinds`, `traits`, `lifts`, `handlers`).
        table: &'static str,
    },

    /// A handler override names a plugin that is not part of the composition.
    #[error("handler override given for unknown plugin '{plugin}'")]
    UnknownPlugin {
        /// Name used in the override map.
        plugin: String,
    },
}

/// Elaboration fault. Elaboration is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElaborateError {
    /// Node kind is neither a trait nor a declared kind.
    #[error("unknown kind '{kind}'")]
    UnknownKind {
        /// The unrecognized kind tag.
        kind: String,
    },

    /// Trait has no mapping for the first operand's type.
    #[error("unimplemented trait '{trait_name}' for type {type_tag}")]
    UnimplementedTrait {
        /// Trait being resolved.
        trait_name: String,
        /// Resolved type of the first operand.
        type_tag: TypeTag,
    },

    /// Argument type does not match its expected position type.
    #[error("type mismatch in '{kind}' argument {position}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Kind (or trait) whose argument mismatched.
        kind: String,
        /// Zero-based argument position.
        position: usize,
        /// Type required at that position.
        expected: TypeTag,
        /// Type the argument elaborated to.
        found: TypeTag,
    },

    /// Argument count differs from the kind specification.
    #[error("'{kind}' expects {expected} arguments, found {found}")]
    ArityMismatch {
        /// Kind (or trait) being elaborated.
        kind: String,
        /// Number of inputs in the specification.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// Scalar type has no lift mapping.
    #[error("no lift for type {type_tag}")]
    NoLift {
        /// Type of the unliftable scalar.
        type_tag: TypeTag,
    },

    /// Field access on a record node that lacks the field.
    #[error("record node {node} has no field '{field}'")]
    NoSuchField {
        /// Record node being accessed.
        node: NodeId,
        /// Requested field name.
        field: String,
    },

    /// Index access beyond the bounds of a tuple node.
    #[error("index {key} out of range for tuple node {node} of length {len}")]
    IndexOutOfRange {
        /// Tuple node being accessed.
        node: NodeId,
        /// Requested key.
        key: AccessKey,
        /// Tuple length.
        len: usize,
    },
}

/// Evaluation fault. Aborts the fold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FoldError {
    /// A referenced node id is absent from the adjacency map.
    #[error("node {id} not found in adjacency (requested by {requested_by:?})")]
    MissingNode {
        /// The missing id.
        id: NodeId,
        /// Node whose routine requested it, `None` for the root.
        requested_by: Option<NodeId>,
    },

    /// No handler registered for an encountered kind.
    #[error("no handler for kind '{kind}' at node {id}")]
    MissingHandler {
        /// Node being started.
        id: NodeId,
        /// Its kind.
        kind: String,
    },

    /// Positional child request beyond the node's child list.
    #[error("node {id} ('{kind}') requested child {index} but has {len} children")]
    ChildIndexOutOfRange {
        /// Requesting node.
        id: NodeId,
        /// Its kind.
        kind: String,
        /// Requested position.
        index: usize,
        /// Number of children.
        len: usize,
    },

    /// A node never reached the done state (re-entered while suspended).
    #[error("node {id} ('{kind}') never completed: requested while already suspended")]
    Unresolved {
        /// Node that could not complete.
        id: NodeId,
        /// Its kind.
        kind: String,
    },

    /// A routine reported its own fault.
    #[error("handler for '{kind}' failed at node {id}: {message}")]
    Handler {
        /// Node whose routine failed.
        id: NodeId,
        /// Its kind.
        kind: String,
        /// Cause reported by the routine.
        message: String,
    },

    /// Configured frame ceiling exceeded.
    #[error("fold exceeded {limit} in-flight frames at node {id}")]
    FrameLimit {
        /// Node whose frame would exceed the limit.
        id: NodeId,
        /// Configured ceiling.
        limit: usize,
    },
}

/// Fault reported by a handler routine.
///
/// The driver wraps it into [`FoldError::Handler`] with node context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Value had the wrong runtime type.
    pub fn type_mismatch(expected: TypeTag, found: TypeTag) -> Self {
        Self(format!("expected {expected}, found {found}"))
    }
}

/// Fault found when validating an edited snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommitError {
    /// Root id is absent from the adjacency map.
    #[error("root {root} not found in adjacency")]
    MissingRoot {
        /// The dangling root.
        root: NodeId,
    },

    /// An entry references an id absent from the adjacency map.
    #[error("node {parent} references missing node {child}")]
    Dangling {
        /// Entry holding the reference.
        parent: NodeId,
        /// The missing id.
        child: NodeId,
    },

    /// Child edges form a cycle.
    #[error("cycle through node {id}")]
    Cycle {
        /// A node on the cycle.
        id: NodeId,
    },

    /// A structural node lists an alias key as a child.
    #[error("node {parent} lists alias {alias} as a child")]
    AliasAsChild {
        /// Entry holding the reference.
        parent: NodeId,
        /// The alias key.
        alias: NodeId,
    },
}
