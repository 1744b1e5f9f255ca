//! Node predicates and selection.
//!
//! A [`Predicate`] is a pure test over `(id, entry)` pairs. Predicates are
//! plain data so they can be combined, cloned and logged freely:
//!
//! ```
//! use weft_core::predicate::{by_kind, by_kind_prefix, is_leaf};
//!
//! let literals = by_kind_prefix("num/").and(is_leaf());
//! let not_add = !by_kind("num/add");
//! # let _ = (literals, not_add);
//! ```
//!
//! Alias entries are bookkeeping, not nodes; no predicate ever matches one.

use std::fmt;

use indexmap::IndexSet;

use crate::graph::{Adjacency, GraphView, NodeEntry, resolve_alias};
use crate::ids::NodeId;

/// Composable test over graph entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Entry kind equals the given kind.
    Kind(String),
    /// Entry kind starts with the given prefix.
    KindPrefix(String),
    /// Entry has no children.
    Leaf,
    /// Entry has exactly this many children.
    ChildCount(usize),
    /// Node is the target of the named alias.
    Named(String),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Whether `(id, entry)` satisfies this predicate.
    ///
    /// `adjacency` is consulted only by [`Predicate::Named`].
    pub fn matches(&self, id: &NodeId, entry: &NodeEntry, adjacency: &Adjacency) -> bool {
        if id.is_alias() || entry.is_alias() {
            return false;
        }
        self.test(id, entry, adjacency)
    }

    fn test(&self, id: &NodeId, entry: &NodeEntry, adjacency: &Adjacency) -> bool {
        match self {
            Predicate::Kind(kind) => entry.kind == *kind,
            Predicate::KindPrefix(prefix) => entry.kind.starts_with(prefix.as_str()),
            Predicate::Leaf => entry.is_leaf(),
            Predicate::ChildCount(count) => entry.children.len() == *count,
            Predicate::Named(name) => resolve_alias(adjacency, name) == Some(id),
            Predicate::Not(inner) => !inner.test(id, entry, adjacency),
            Predicate::And(all) => all.iter().all(|p| p.test(id, entry, adjacency)),
            Predicate::Or(any) => any.iter().any(|p| p.test(id, entry, adjacency)),
        }
    }

    /// Both `self` and `other`.
    pub fn and(self, other: Predicate) -> Predicate {
        match self {
            Predicate::And(mut all) => {
                all.push(other);
                Predicate::And(all)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Either `self` or `other`.
    pub fn or(self, other: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut any) => {
                any.push(other);
                Predicate::Or(any)
            }
            first => Predicate::Or(vec![first, other]),
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, op: &str, items: &[Predicate]) -> fmt::Result {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, ")")
        }

        match self {
            Predicate::Kind(kind) => write!(f, "kind == {kind}"),
            Predicate::KindPrefix(prefix) => write!(f, "kind ^= {prefix}"),
            Predicate::Leaf => write!(f, "leaf"),
            Predicate::ChildCount(count) => write!(f, "children == {count}"),
            Predicate::Named(name) => write!(f, "@{name}"),
            Predicate::Not(inner) => write!(f, "!{inner}"),
            Predicate::And(all) => join(f, "&&", all),
            Predicate::Or(any) => join(f, "||", any),
        }
    }
}

pub fn by_kind(kind: impl Into<String>) -> Predicate {
    Predicate::Kind(kind.into())
}

pub fn by_kind_prefix(prefix: impl Into<String>) -> Predicate {
    Predicate::KindPrefix(prefix.into())
}

pub fn is_leaf() -> Predicate {
    Predicate::Leaf
}

pub fn has_child_count(count: usize) -> Predicate {
    Predicate::ChildCount(count)
}

/// The node bound to alias `name`.
pub fn by_name(name: impl Into<String>) -> Predicate {
    Predicate::Named(name.into())
}

pub fn not(predicate: Predicate) -> Predicate {
    !predicate
}

pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::And(predicates.into_iter().collect())
}

pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::Or(predicates.into_iter().collect())
}

/// Ids of every structural node matching `predicate`, in graph order.
pub fn select_where(graph: &impl GraphView, predicate: &Predicate) -> IndexSet<NodeId> {
    let adjacency = graph.adjacency();
    adjacency
        .iter()
        .filter(|(id, entry)| predicate.matches(id, entry, adjacency))
        .map(|(id, _)| id.clone())
        .collect()
}
