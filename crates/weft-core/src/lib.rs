//! Weft Core
//!
//! Programs as graphs: expression trees are elaborated into normalized,
//! hash-consed DAGs, evaluated by a stack-safe fold, and edited through
//! copy-on-write snapshots.
//!
//! # Pipeline
//!
//! ```text
//! Expr ──elaborate──▶ NormalizedGraph ──fold──▶ Value
//!                          │   ▲
//!                     dirty│   │commit
//!                          ▼   │
//!                       DirtyGraph ◀── rewrite / gc
//! ```
//!
//! Node kinds, trait dispatch and handlers come from [`plugin::Plugin`]s
//! composed into a [`registry::Registry`].

pub mod core_plugin;
pub mod dirty;
pub mod elaborate;
pub mod error;
pub mod expr;
pub mod fold;
pub mod gc;
pub mod graph;
pub mod ids;
pub mod kinds;
pub mod plugin;
pub mod predicate;
pub mod registry;
pub mod rewrite;
pub mod types;

pub use dirty::DirtyGraph;
pub use elaborate::elaborate;
pub use error::{Error, Result};
pub use expr::Expr;
pub use fold::{Folder, HandlerMap, fold};
pub use graph::{GraphView, NodeEntry, NormalizedGraph};
pub use ids::NodeId;
pub use plugin::{KindSpec, Plugin};
pub use registry::Registry;
pub use types::{TypeTag, Value};
