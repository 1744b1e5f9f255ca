//! Normalized program graphs.
//!
//! # Structure
//!
//! - [`NodeEntry`] - One row: kind, ordered children, output type, payload
//! - [`Payload`] - Kind-family data (literal scalar, access key, record/tuple layout)
//! - [`NormalizedGraph`] - Root id, adjacency map, id cursor, declared output type
//! - [`GraphBuilder`] - Incremental construction with in-order id issue
//!
//! # Invariants
//!
//! Every id referenced by an entry exists in the same adjacency map, and the
//! child edges form a DAG: a node may have several parents but is never its
//! own ancestor. Alias entries (`@name`) point at a target through their
//! single child and are never the child of a structural node.

mod builder;
mod types;


pub use builder::GraphBuilder;
pub(crate) use types::resolve_alias;
pub use types::{Adjacency, GraphView, NodeEntry, NormalizedGraph, Payload};
