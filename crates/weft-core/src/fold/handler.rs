//! Handler and routine contracts.
//!
//! A [`Handler`] is registered per node kind. When the fold reaches a node of
//! that kind it calls the handler once to obtain a fresh [`Routine`], then
//! drives the routine: each [`Routine::resume`] either asks for a child value
//! ([`Step::Request`]) or completes the node ([`Step::Done`]). The routine is
//! resumed with the requested value once the driver has it.
//!
//! ```text
//! pending ──start──▶ running ──Request──▶ suspended ──value──▶ running ──Done──▶ done
//! ```
//!
//! Routines are explicit state machines. The builders in this module cover
//! the common shapes:
//!
//! - [`leaf`] - completes immediately from the entry alone (literals)
//! - [`strict`] - requests every child in order, then combines the values
//! - [`routine`] - wraps a hand-written state machine (conditionals, lookups)

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::HandlerError;
use crate::graph::{NodeEntry, Payload};
use crate::ids::NodeId;
use crate::types::{TypeTag, Value};

/// Child named by a suspending routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildRef {
    /// Position in the node's own children list.
    Index(usize),
    /// Any node in the adjacency map, e.g. an alias key.
    Id(NodeId),
}

/// Outcome of one resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Suspend until the named child's value is available.
    Request(ChildRef),
    /// Node finished with this value.
    Done(Value),
}

/// Cooperative routine computing one node's value.
pub trait Routine {
    /// Advance the routine.
    ///
    /// `input` is `None` on the first call and carries the value of the most
    /// recently requested child on every later call.
    fn resume(&mut self, entry: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError>;
}

/// Factory producing a routine for one node.
pub type Handler = Arc<dyn Fn(&NodeId, &NodeEntry) -> Box<dyn Routine> + Send + Sync>;

/// Kind → handler.
pub type HandlerMap = IndexMap<String, Handler>;

/// Handler for nodes computed from their entry alone.
pub fn leaf<F>(compute: F) -> Handler
where
    F: Fn(&NodeEntry) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    let compute = Arc::new(compute);
    Arc::new(move |_: &NodeId, _: &NodeEntry| {
        Box::new(Leaf {
            compute: Arc::clone(&compute),
        }) as Box<dyn Routine>
    })
}

struct Leaf<F> {
    compute: Arc<F>,
}

impl<F> Routine for Leaf<F>
where
    F: Fn(&NodeEntry) -> Result<Value, HandlerError>,
{
    fn resume(&mut self, entry: &NodeEntry, _input: Option<Value>) -> Result<Step, HandlerError> {
        Ok(Step::Done((self.compute)(entry)?))
    }
}

/// Handler that resolves every child in order, then combines their values.
pub fn strict<F>(combine: F) -> Handler
where
    F: Fn(&NodeEntry, Vec<Value>) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    let combine = Arc::new(combine);
    Arc::new(move |_: &NodeId, entry: &NodeEntry| {
        Box::new(Strict {
            combine: Arc::clone(&combine),
            values: Vec::with_capacity(entry.children.len()),
        }) as Box<dyn Routine>
    })
}

struct Strict<F> {
    combine: Arc<F>,
    values: Vec<Value>,
}

impl<F> Routine for Strict<F>
where
    F: Fn(&NodeEntry, Vec<Value>) -> Result<Value, HandlerError>,
{
    fn resume(&mut self, entry: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError> {
        if let Some(value) = input {
            self.values.push(value);
        }
        if self.values.len() < entry.children.len() {
            return Ok(Step::Request(ChildRef::Index(self.values.len())));
        }
        let values = std::mem::take(&mut self.values);
        Ok(Step::Done((self.combine)(entry, values)?))
    }
}

/// Handler wrapping a hand-written routine.
///
/// `start` runs once per node and may capture whatever it needs from the
/// entry (payload ids, keys) into the routine's state.
pub fn routine<R, F>(start: F) -> Handler
where
    R: Routine + 'static,
    F: Fn(&NodeId, &NodeEntry) -> R + Send + Sync + 'static,
{
    Arc::new(move |id: &NodeId, entry: &NodeEntry| Box::new(start(id, entry)) as Box<dyn Routine>)
}

/// Extract a number or fail with a typed handler error.
pub fn expect_number(value: &Value) -> Result<f64, HandlerError> {
    value
        .as_number()
        .ok_or_else(|| HandlerError::type_mismatch(TypeTag::Number, value.type_tag()))
}

/// Extract a string or fail with a typed handler error.
pub fn expect_str(value: &Value) -> Result<&str, HandlerError> {
    value
        .as_str()
        .ok_or_else(|| HandlerError::type_mismatch(TypeTag::String, value.type_tag()))
}

/// Extract a boolean or fail with a typed handler error.
pub fn expect_bool(value: &Value) -> Result<bool, HandlerError> {
    value
        .as_bool()
        .ok_or_else(|| HandlerError::type_mismatch(TypeTag::Boolean, value.type_tag()))
}

/// Literal payload of an entry as a value.
pub fn literal_value(entry: &NodeEntry) -> Result<Value, HandlerError> {
    match &entry.payload {
        Payload::Literal(scalar) => Ok(Value::from(scalar)),
        other => Err(HandlerError::new(format!(
            "'{}' expected a literal payload, found {other:?}",
            entry.kind
        ))),
    }
}
