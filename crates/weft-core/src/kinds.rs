//! Kinds owned by the core itself.
//!
//! Elaboration emits these synthetic kinds for plain composites and deferred
//! access; the built-in `core` plugin declares them and supplies handlers.

/// Record built from a plain keyed mapping.
pub const RECORD: &str = "core/record";
/// Tuple built from a plain ordered list.
pub const TUPLE: &str = "core/tuple";
/// Deferred field or index access.
pub const ACCESS: &str = "core/access";
/// `null` literal.
pub const NULL: &str = "core/null";
/// Non-structural named pointer stored under an `@name` key.
pub const ALIAS: &str = "@alias";

/// Name of the built-in plugin that declares the kinds above.
pub const CORE_PLUGIN: &str = "core";
