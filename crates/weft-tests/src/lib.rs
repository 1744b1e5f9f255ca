//! Integration test harness for Weft.
//!
//! Wraps the full pipeline for end-to-end tests:
//! Compose → Elaborate → Fold → Edit → Fold again.

use std::sync::Once;

use indexmap::IndexMap;
use tracing_subscriber::EnvFilter;

use weft_core::fold::HandlerMap;
use weft_core::{Expr, GraphView, NormalizedGraph, Plugin, Registry, Value};

static TRACING: Once = Once::new();

/// Install a test-friendly subscriber once per process.
///
/// Filtering follows `RUST_LOG`; nothing is printed by default.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Composed registry plus its handler map.
pub struct TestHarness {
    registry: Registry,
    handlers: HandlerMap,
}

impl TestHarness {
    /// Harness over the standard plugins.
    pub fn standard() -> Self {
        Self::from_plugins(weft_plugins::standard())
    }

    /// Harness over `plugins`, composed in order after `core`.
    ///
    /// # Panics
    ///
    /// Panics if composition or handler resolution fails.
    pub fn from_plugins(plugins: impl IntoIterator<Item = Plugin>) -> Self {
        Self::with_overrides(plugins, IndexMap::new())
    }

    /// Harness whose handlers for the named plugins are replaced.
    ///
    /// # Panics
    ///
    /// Panics if composition or handler resolution fails.
    pub fn with_overrides(
        plugins: impl IntoIterator<Item = Plugin>,
        overrides: IndexMap<String, HandlerMap>,
    ) -> Self {
        init_tracing();
        let registry = Registry::compose(plugins).expect("plugin composition failed");
        let handlers = registry
            .handlers_with(&overrides)
            .expect("handler resolution failed");
        Self { registry, handlers }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }

    /// # Panics
    ///
    /// Panics if elaboration fails.
    pub fn elaborate(&self, expr: &Expr) -> NormalizedGraph {
        weft_core::elaborate(expr, &self.registry).expect("elaboration failed")
    }

    /// Fold any graph or snapshot from its root.
    pub fn try_fold(&self, graph: &impl GraphView) -> weft_core::Result<Value> {
        Ok(weft_core::fold::fold_at(
            graph.root(),
            graph.adjacency(),
            &self.handlers,
        )?)
    }

    /// # Panics
    ///
    /// Panics if the fold fails.
    pub fn fold(&self, graph: &impl GraphView) -> Value {
        self.try_fold(graph).expect("fold failed")
    }

    /// Elaborate then fold.
    pub fn try_eval(&self, expr: &Expr) -> weft_core::Result<Value> {
        let graph = weft_core::elaborate(expr, &self.registry)?;
        self.try_fold(&graph)
    }

    /// # Panics
    ///
    /// Panics if elaboration or the fold fails.
    pub fn eval(&self, expr: &Expr) -> Value {
        self.try_eval(expr).expect("evaluation failed")
    }
}
