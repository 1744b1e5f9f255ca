//! Built-in `core` plugin.
//!
//! Declares the synthetic kinds elaboration emits (records, tuples, access)
//! plus aliases and the `null` literal, and evaluates them. The registry
//! composes it ahead of every caller plugin, so callers may override any of
//! it.

use indexmap::IndexMap;

use crate::error::HandlerError;
use crate::fold::{ChildRef, HandlerMap, Routine, Step, leaf, routine, strict};
use crate::graph::{NodeEntry, Payload};
use crate::ids::NodeId;
use crate::kinds;
use crate::plugin::Plugin;
use crate::types::{AccessKey, TypeTag, Value};

/// The built-in plugin.
pub fn core_plugin() -> Plugin {
    Plugin::new(kinds::CORE_PLUGIN)
        .declare(kinds::RECORD)
        .declare(kinds::TUPLE)
        .declare(kinds::ACCESS)
        .declare(kinds::ALIAS)
        .lift(TypeTag::Null, kinds::NULL)
        .handlers(core_handlers)
}

fn core_handlers() -> HandlerMap {
    let mut handlers = HandlerMap::new();
    handlers.insert(kinds::NULL.to_string(), leaf(|_| Ok(Value::Null)));
    handlers.insert(
        kinds::RECORD.to_string(),
        routine(|_: &NodeId, entry: &NodeEntry| Gather::record(entry)),
    );
    handlers.insert(
        kinds::TUPLE.to_string(),
        routine(|_: &NodeId, entry: &NodeEntry| Gather::tuple(entry)),
    );
    handlers.insert(
        kinds::ACCESS.to_string(),
        routine(|_: &NodeId, entry: &NodeEntry| Access::new(entry)),
    );
    handlers.insert(
        kinds::ALIAS.to_string(),
        strict(|_, mut values| {
            values
                .pop()
                .ok_or_else(|| HandlerError::new("alias entry has no target"))
        }),
    );
    handlers
}

/// Collects payload-addressed children into a record or list.
///
/// Requests go by explicit id so the layout follows the payload even when
/// children were reordered by an edit.
struct Gather {
    slots: Vec<(Option<String>, NodeId)>,
    values: Vec<Value>,
    as_record: bool,
}

impl Gather {
    fn record(entry: &NodeEntry) -> Self {
        let slots = match &entry.payload {
            Payload::Record(fields) => fields
                .iter()
                .map(|(name, id)| (Some(name.clone()), id.clone()))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            slots,
            values: Vec::new(),
            as_record: true,
        }
    }

    fn tuple(entry: &NodeEntry) -> Self {
        let slots = match &entry.payload {
            Payload::Tuple(items) => items.iter().map(|id| (None, id.clone())).collect(),
            _ => Vec::new(),
        };
        Self {
            slots,
            values: Vec::new(),
            as_record: false,
        }
    }
}

impl Routine for Gather {
    fn resume(&mut self, _entry: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError> {
        if let Some(value) = input {
            self.values.push(value);
        }
        if let Some((_, id)) = self.slots.get(self.values.len()) {
            return Ok(Step::Request(ChildRef::Id(id.clone())));
        }

        let values = std::mem::take(&mut self.values);
        if !self.as_record {
            return Ok(Step::Done(Value::List(values)));
        }

        let fields: IndexMap<String, Value> = self
            .slots
            .iter()
            .zip(values)
            .map(|((name, _), value)| (name.clone().unwrap_or_default(), value))
            .collect();
        Ok(Step::Done(Value::Record(fields)))
    }
}

/// Resolves the parent, then projects the requested key.
struct Access {
    key: Option<AccessKey>,
}

impl Access {
    fn new(entry: &NodeEntry) -> Self {
        let key = match &entry.payload {
            Payload::Access(key) => Some(key.clone()),
            _ => None,
        };
        Self { key }
    }
}

impl Routine for Access {
    fn resume(&mut self, entry: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError> {
        let Some(parent) = input else {
            return Ok(Step::Request(ChildRef::Index(0)));
        };
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| HandlerError::new(format!("'{}' has no access key", entry.kind)))?;

        let value = match (&parent, key) {
            (Value::Record(fields), AccessKey::Field(name)) => fields.get(name).cloned(),
            (Value::List(items), AccessKey::Index(idx)) => items.get(*idx).cloned(),
            _ => None,
        };

        value.map(Step::Done).ok_or_else(|| {
            HandlerError::new(format!(
                "cannot access {key} on {} value",
                parent.type_tag()
            ))
        })
    }
}
