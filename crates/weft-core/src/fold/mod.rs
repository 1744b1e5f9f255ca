//! Graph evaluation ("fold").
//!
//! A fold walks a [`NormalizedGraph`](crate::graph::NormalizedGraph) from its
//! root, running one [`Routine`] per node. Routines suspend by requesting a
//! child; the driver keeps an explicit stack of in-flight frames instead of
//! recursing, so deep chains do not grow the native call stack.
//!
//! # Guarantees
//!
//! - **Memoization** - a node reachable from several parents runs its handler
//!   once per fold; later requests are answered from the memo.
//! - **Short-circuiting** - a child that is never requested is never started,
//!   so a conditional's untaken branch does not run.
//! - **Ordering** - children resolve in the order a routine requests them;
//!   sibling routines never interleave.
//!
//! # Faults
//!
//! Every [`FoldError`](crate::error::FoldError) aborts the fold and names the
//! node (and kind) at fault.

mod driver;
mod handler;

#[cfg(test)]
mod tests;

pub use driver::{FoldConfig, FoldStats, Folder, fold, fold_at, fold_with_config};
pub use handler::{
    ChildRef, Handler, HandlerMap, Routine, Step, expect_bool, expect_number, expect_str, leaf,
    literal_value, routine, strict,
};
