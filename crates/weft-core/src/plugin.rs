//! Capability modules.
//!
//! A [`Plugin`] bundles everything a family of node kinds needs:
//!
//! - kind specifications (argument types and output type per kind)
//! - trait mappings (abstract operation + operand type → concrete kind)
//! - lift mappings (scalar type → literal kind)
//! - the exhaustive list of kinds it owns
//! - optionally, a factory for its default handlers
//!
//! Constructors that build [`Expr`](crate::expr::Expr) values for a plugin's
//! kinds are ordinary public functions of the module defining the plugin.
//!
//! # Example
//!
//! ```
//! use weft_core::fold::strict;
//! use weft_core::plugin::{KindSpec, Plugin};
//! use weft_core::types::{TypeTag, Value};
//!
//! let plugin = Plugin::new("counter")
//!     .kind("counter/zero", KindSpec::new([], TypeTag::Number))
//!     .handlers(|| {
//!         let mut map = weft_core::fold::HandlerMap::new();
//!         map.insert("counter/zero".into(), strict(|_, _| Ok(Value::Number(0.0))));
//!         map
//!     });
//!
//! assert_eq!(plugin.node_kinds, vec!["counter/zero".to_string()]);
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::fold::HandlerMap;
use crate::types::TypeTag;

/// Expected input types and output type of one node kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSpec {
    /// Positional argument types.
    pub inputs: Vec<TypeTag>,
    /// Output type.
    pub output: TypeTag,
}

impl KindSpec {
    pub fn new(inputs: impl IntoIterator<Item = TypeTag>, output: TypeTag) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            output,
        }
    }
}

/// Factory producing a plugin's default handler map.
pub type HandlerFactory = Arc<dyn Fn() -> HandlerMap + Send + Sync>;

/// A capability module.
#[derive(Clone)]
pub struct Plugin {
    /// Unique plugin name, used to address handler overrides.
    pub name: String,
    /// Every kind this plugin owns.
    pub node_kinds: Vec<String>,
    /// Kind → specification.
    pub kinds: IndexMap<String, KindSpec>,
    /// Trait name → operand type → concrete kind.
    pub traits: IndexMap<String, IndexMap<TypeTag, String>>,
    /// Scalar type → literal kind.
    pub lifts: IndexMap<TypeTag, String>,
    /// Default handlers, if the plugin can evaluate its own kinds.
    pub default_handlers: Option<HandlerFactory>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_kinds: Vec::new(),
            kinds: IndexMap::new(),
            traits: IndexMap::new(),
            lifts: IndexMap::new(),
            default_handlers: None,
        }
    }

    /// Declare a kind owned by this plugin without a specification.
    ///
    /// Used for kinds that are emitted by elaboration itself (literals,
    /// synthetic composites) rather than built from `Expr::Node`.
    pub fn declare(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        if !self.node_kinds.contains(&kind) {
            self.node_kinds.push(kind);
        }
        self
    }

    /// Declare a kind together with its specification.
    pub fn kind(mut self, kind: impl Into<String>, spec: KindSpec) -> Self {
        let kind = kind.into();
        self.kinds.insert(kind.clone(), spec);
        self.declare(kind)
    }

    /// Map `trait_name` on operands of type `type_tag` to `kind`.
    pub fn trait_impl(
        mut self,
        trait_name: impl Into<String>,
        type_tag: TypeTag,
        kind: impl Into<String>,
    ) -> Self {
        self.traits
            .entry(trait_name.into())
            .or_default()
            .insert(type_tag, kind.into());
        self
    }

    /// Lift scalars of `type_tag` into literal nodes of `kind`.
    pub fn lift(mut self, type_tag: TypeTag, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.lifts.insert(type_tag, kind.clone());
        self.declare(kind)
    }

    /// Supply a default handler factory.
    pub fn handlers<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> HandlerMap + Send + Sync + 'static,
    {
        self.default_handlers = Some(Arc::new(factory));
        self
    }

    /// Kinds referenced by specs, traits and lifts, each tagged with its table.
    pub(crate) fn referenced_kinds(&self) -> IndexSet<(&'static str, &str)> {
        let mut referenced = IndexSet::new();
        for kind in self.kinds.keys() {
            referenced.insert(("kinds", kind.as_str()));
        }
        for mapping in self.traits.values() {
            for kind in mapping.values() {
                referenced.insert(("traits", kind.as_str()));
            }
        }
        for kind in self.lifts.values() {
            referenced.insert(("lifts", kind.as_str()));
        }
        referenced
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("node_kinds", &self.node_kinds)
            .field("kinds", &self.kinds)
            .field("traits", &self.traits)
            .field("lifts", &self.lifts)
            .field("default_handlers", &self.default_handlers.is_some())
            .finish()
    }
}
