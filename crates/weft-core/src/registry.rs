//! Plugin registry composition.
//!
//! Merges an ordered list of [`Plugin`]s into the lookup tables elaboration
//! needs (kind specifications, trait mappings, lift mappings) and into the
//! handler map a fold needs.
//!
//! # Merge Policy
//!
//! Last write wins. When two plugins declare the same kind, the same
//! (trait, type) mapping or the same lift, the later plugin replaces the
//! earlier one without error. Replacements are logged at `debug` level.
//! Trait tables merge key by key, so a later plugin adding `eq` for strings
//! keeps an earlier plugin's `eq` for numbers.
//!
//! # Validation
//!
//! Composition fails fast, before anything is elaborated or folded:
//!
//! - every kind a plugin references in its specs, traits, lifts or handlers
//!   must appear in its `node_kinds`
//! - a plugin that owns kinds needs default handlers or an override

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::core_plugin::core_plugin;
use crate::error::ConfigError;
use crate::fold::HandlerMap;
use crate::plugin::{KindSpec, Plugin};
use crate::types::TypeTag;

/// Merged tables of a plugin composition.
#[derive(Debug, Clone)]
pub struct Registry {
    plugins: Vec<Plugin>,
    kinds: IndexMap<String, KindSpec>,
    traits: IndexMap<String, IndexMap<TypeTag, String>>,
    lifts: IndexMap<TypeTag, String>,
}

impl Registry {
    /// Compose `plugins`, in order, on top of the built-in `core` plugin.
    #[instrument(skip_all, name = "compose")]
    pub fn compose(plugins: impl IntoIterator<Item = Plugin>) -> Result<Self, ConfigError> {
        let plugins: Vec<Plugin> = std::iter::once(core_plugin()).chain(plugins).collect();

        let mut kinds: IndexMap<String, KindSpec> = IndexMap::new();
        let mut traits: IndexMap<String, IndexMap<TypeTag, String>> = IndexMap::new();
        let mut lifts: IndexMap<TypeTag, String> = IndexMap::new();

        for plugin in &plugins {
            validate_declarations(plugin)?;

            for (kind, spec) in &plugin.kinds {
                if let Some(previous) = kinds.insert(kind.clone(), spec.clone())
                    && previous != *spec
                {
                    debug!(plugin = %plugin.name, kind = %kind, "kind specification overridden");
                }
            }

            for (trait_name, mapping) in &plugin.traits {
                let merged = traits.entry(trait_name.clone()).or_default();
                for (type_tag, kind) in mapping {
                    if let Some(previous) = merged.insert(type_tag.clone(), kind.clone())
                        && previous != *kind
                    {
                        debug!(
                            plugin = %plugin.name,
                            trait_name = %trait_name,
                            type_tag = %type_tag,
                            previous = %previous,
                            kind = %kind,
                            "trait mapping overridden"
                        );
                    }
                }
            }

            for (type_tag, kind) in &plugin.lifts {
                if let Some(previous) = lifts.insert(type_tag.clone(), kind.clone())
                    && previous != *kind
                {
                    debug!(
                        plugin = %plugin.name,
                        type_tag = %type_tag,
                        previous = %previous,
                        kind = %kind,
                        "lift overridden"
                    );
                }
            }
        }

        debug!(
            plugins = plugins.len(),
            kinds = kinds.len(),
            traits = traits.len(),
            lifts = lifts.len(),
            "registry composed"
        );

        Ok(Self {
            plugins,
            kinds,
            traits,
            lifts,
        })
    }

    /// Composed plugins, `core` first.
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn kind_spec(&self, kind: &str) -> Option<&KindSpec> {
        self.kinds.get(kind)
    }

    pub fn kinds(&self) -> &IndexMap<String, KindSpec> {
        &self.kinds
    }

    /// Operand type → concrete kind for `trait_name`.
    pub fn trait_mapping(&self, trait_name: &str) -> Option<&IndexMap<TypeTag, String>> {
        self.traits.get(trait_name)
    }

    pub fn is_trait(&self, name: &str) -> bool {
        self.traits.contains_key(name)
    }

    /// Literal kind for scalars of `type_tag`.
    pub fn lift(&self, type_tag: &TypeTag) -> Option<&str> {
        self.lifts.get(type_tag).map(String::as_str)
    }

    /// Handler map from every plugin's defaults.
    pub fn handlers(&self) -> Result<HandlerMap, ConfigError> {
        compose_handlers(&self.plugins, &IndexMap::new())
    }

    /// Handler map where `overrides[plugin]` replaces that plugin's defaults.
    pub fn handlers_with(
        &self,
        overrides: &IndexMap<String, HandlerMap>,
    ) -> Result<HandlerMap, ConfigError> {
        compose_handlers(&self.plugins, overrides)
    }
}

/// Merge plugin handler maps, last write wins.
///
/// For each plugin, an entry in `overrides` under its name replaces its
/// default handlers. A plugin owning kinds with neither fails with
/// [`ConfigError::MissingHandlers`].
pub fn compose_handlers(
    plugins: &[Plugin],
    overrides: &IndexMap<String, HandlerMap>,
) -> Result<HandlerMap, ConfigError> {
    if let Some(unknown) = overrides
        .keys()
        .find(|name| !plugins.iter().any(|p| &p.name == *name))
    {
        return Err(ConfigError::UnknownPlugin {
            plugin: unknown.clone(),
        });
    }

    let mut merged = HandlerMap::new();
    for plugin in plugins {
        let handlers = match (overrides.get(&plugin.name), &plugin.default_handlers) {
            (Some(overridden), _) => {
                debug!(plugin = %plugin.name, "using handler override");
                overridden.clone()
            }
            (None, Some(factory)) => factory(),
            (None, None) if plugin.node_kinds.is_empty() => continue,
            (None, None) => {
                return Err(ConfigError::MissingHandlers {
                    plugin: plugin.name.clone(),
                });
            }
        };

        for (kind, handler) in handlers {
            if !plugin.node_kinds.contains(&kind) {
                return Err(ConfigError::UndeclaredKind {
                    plugin: plugin.name.clone(),
                    kind,
                    table: "handlers",
                });
            }
            if merged.insert(kind.clone(), handler).is_some() {
                debug!(plugin = %plugin.name, kind = %kind, "handler overridden");
            }
        }
    }

    Ok(merged)
}

fn validate_declarations(plugin: &Plugin) -> Result<(), ConfigError> {
    for (table, kind) in plugin.referenced_kinds() {
        if !plugin.node_kinds.iter().any(|declared| declared == kind) {
            return Err(ConfigError::UndeclaredKind {
                plugin: plugin.name.clone(),
                kind: kind.to_string(),
                table,
            });
        }
    }
    Ok(())
}
