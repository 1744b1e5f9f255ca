//! Weft Standard Plugins
//!
//! Capability modules for the common scalar domains:
//!
//! - [`num`] - numeric literals, arithmetic, comparison
//! - [`string`] - string literals, concatenation, length, comparison
//! - [`boolean`] - boolean literals, short-circuiting logic, `cond`
//! - [`traits`] - constructors for the `eq`, `lt` and `show` traits
//!
//! # Example
//!
//! ```
//! use weft_core::{Value, elaborate, fold};
//! use weft_plugins::{num, traits};
//!
//! let registry = weft_plugins::registry().unwrap();
//! let handlers = registry.handlers().unwrap();
//!
//! let graph = elaborate(&traits::eq(num::add(1, 2), 3), &registry).unwrap();
//! assert_eq!(fold(&graph, &handlers).unwrap(), Value::Boolean(true));
//! ```

pub mod boolean;
pub mod num;
pub mod string;
pub mod traits;

use weft_core::error::{ConfigError, HandlerError};
use weft_core::fold::{Handler, strict};
use weft_core::graph::NodeEntry;
use weft_core::{Plugin, Registry, Value};

/// Every standard plugin, in composition order.
pub fn standard() -> Vec<Plugin> {
    vec![num::plugin(), string::plugin(), boolean::plugin()]
}

/// Registry composed from [`standard`].
pub fn registry() -> Result<Registry, ConfigError> {
    Registry::compose(standard())
}

/// Strict handler over exactly one operand.
pub(crate) fn unary<F>(op: F) -> Handler
where
    F: Fn(&Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    strict(move |entry: &NodeEntry, values: Vec<Value>| match values.as_slice() {
        [value] => op(value),
        _ => Err(arity(entry, 1, values.len())),
    })
}

/// Strict handler over exactly two operands.
pub(crate) fn binary<F>(op: F) -> Handler
where
    F: Fn(&Value, &Value) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    strict(move |entry: &NodeEntry, values: Vec<Value>| match values.as_slice() {
        [lhs, rhs] => op(lhs, rhs),
        _ => Err(arity(entry, 2, values.len())),
    })
}

fn arity(entry: &NodeEntry, expected: usize, found: usize) -> HandlerError {
    HandlerError::new(format!(
        "'{}' expects {expected} operand(s), got {found}",
        entry.kind
    ))
}
