//! Trampoline driving routines over an explicit frame stack.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::FoldError;
use crate::graph::{Adjacency, NodeEntry, NormalizedGraph};
use crate::ids::NodeId;
use crate::types::Value;

use super::handler::{ChildRef, HandlerMap, Routine, Step};

/// Fold tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldConfig {
    /// Frames reserved up front on the work stack.
    pub frame_capacity: usize,
    /// Ceiling on in-flight frames; `None` means unbounded.
    pub max_frames: Option<usize>,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            frame_capacity: 64,
            max_frames: None,
        }
    }
}

/// Counters collected while folding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FoldStats {
    /// Routines created (one per distinct node evaluated).
    pub handlers_started: usize,
    /// Child requests answered from the memo.
    pub cache_hits: usize,
    /// Deepest frame stack observed.
    pub max_depth: usize,
}

/// One in-flight node.
struct Frame<'a> {
    id: NodeId,
    entry: &'a NodeEntry,
    routine: Box<dyn Routine>,
}

/// Evaluator over one adjacency map and handler map.
///
/// The memo survives across calls to [`Folder::fold`], so several roots of
/// the same graph can be evaluated without recomputing shared nodes.
pub struct Folder<'a> {
    adjacency: &'a Adjacency,
    handlers: &'a HandlerMap,
    config: FoldConfig,
    memo: HashMap<NodeId, Value>,
    stats: FoldStats,
}

impl<'a> Folder<'a> {
    pub fn new(adjacency: &'a Adjacency, handlers: &'a HandlerMap) -> Self {
        Self::with_config(adjacency, handlers, FoldConfig::default())
    }

    pub fn with_config(
        adjacency: &'a Adjacency,
        handlers: &'a HandlerMap,
        config: FoldConfig,
    ) -> Self {
        Self {
            adjacency,
            handlers,
            config,
            memo: HashMap::new(),
            stats: FoldStats::default(),
        }
    }

    pub fn stats(&self) -> FoldStats {
        self.stats
    }

    /// Memoized value of `id`, if it has been folded.
    pub fn memoized(&self, id: &NodeId) -> Option<&Value> {
        self.memo.get(id)
    }

    /// Fold the subgraph rooted at `root`.
    #[instrument(skip_all, fields(root = %root))]
    pub fn fold(&mut self, root: &NodeId) -> Result<Value, FoldError> {
        if let Some(value) = self.memo.get(root) {
            self.stats.cache_hits += 1;
            return Ok(value.clone());
        }

        let mut stack: Vec<Frame<'a>> = Vec::with_capacity(self.config.frame_capacity);
        let mut in_flight: HashSet<NodeId> = HashSet::new();

        let frame = self.start(root, None)?;
        in_flight.insert(frame.id.clone());
        stack.push(frame);
        self.stats.max_depth = self.stats.max_depth.max(stack.len());

        let mut input: Option<Value> = None;

        while let Some(frame) = stack.last_mut() {
            let step = frame
                .routine
                .resume(frame.entry, input.take())
                .map_err(|err| FoldError::Handler {
                    id: frame.id.clone(),
                    kind: frame.entry.kind.clone(),
                    message: err.to_string(),
                })?;

            match step {
                Step::Done(value) => {
                    let Some(done) = stack.pop() else {
                        break;
                    };
                    trace!(id = %done.id, kind = %done.entry.kind, "node done");
                    in_flight.remove(&done.id);
                    self.memo.insert(done.id, value.clone());

                    if stack.is_empty() {
                        debug!(
                            handlers = self.stats.handlers_started,
                            cache_hits = self.stats.cache_hits,
                            max_depth = self.stats.max_depth,
                            "fold complete"
                        );
                        return Ok(value);
                    }
                    input = Some(value);
                }
                Step::Request(child) => {
                    let child_id = match child {
                        ChildRef::Index(index) => {
                            frame.entry.children.get(index).cloned().ok_or_else(|| {
                                FoldError::ChildIndexOutOfRange {
                                    id: frame.id.clone(),
                                    kind: frame.entry.kind.clone(),
                                    index,
                                    len: frame.entry.children.len(),
                                }
                            })?
                        }
                        ChildRef::Id(id) => id,
                    };
                    let requester = frame.id.clone();

                    if let Some(value) = self.memo.get(&child_id) {
                        trace!(id = %child_id, "memo hit");
                        self.stats.cache_hits += 1;
                        input = Some(value.clone());
                        continue;
                    }

                    if in_flight.contains(&child_id) {
                        let kind = self
                            .adjacency
                            .get(&child_id)
                            .map(|entry| entry.kind.clone())
                            .unwrap_or_default();
                        return Err(FoldError::Unresolved { id: child_id, kind });
                    }

                    if let Some(limit) = self.config.max_frames
                        && stack.len() >= limit
                    {
                        return Err(FoldError::FrameLimit {
                            id: child_id,
                            limit,
                        });
                    }

                    let next = self.start(&child_id, Some(requester))?;
                    in_flight.insert(next.id.clone());
                    stack.push(next);
                    self.stats.max_depth = self.stats.max_depth.max(stack.len());
                }
            }
        }

        let kind = self
            .adjacency
            .get(root)
            .map(|entry| entry.kind.clone())
            .unwrap_or_default();
        Err(FoldError::Unresolved {
            id: root.clone(),
            kind,
        })
    }

    /// Move a node from pending to running.
    fn start(&mut self, id: &NodeId, requested_by: Option<NodeId>) -> Result<Frame<'a>, FoldError> {
        let adjacency = self.adjacency;
        let entry = adjacency.get(id).ok_or_else(|| FoldError::MissingNode {
            id: id.clone(),
            requested_by,
        })?;
        let handler = self
            .handlers
            .get(&entry.kind)
            .ok_or_else(|| FoldError::MissingHandler {
                id: id.clone(),
                kind: entry.kind.clone(),
            })?;

        trace!(id = %id, kind = %entry.kind, "handler started");
        self.stats.handlers_started += 1;

        Ok(Frame {
            id: id.clone(),
            entry,
            routine: handler(id, entry),
        })
    }
}

/// Fold a graph from its root.
pub fn fold(graph: &NormalizedGraph, handlers: &HandlerMap) -> Result<Value, FoldError> {
    fold_at(&graph.root, &graph.adjacency, handlers)
}

/// Fold from an explicit root over an adjacency map.
pub fn fold_at(
    root: &NodeId,
    adjacency: &Adjacency,
    handlers: &HandlerMap,
) -> Result<Value, FoldError> {
    Folder::new(adjacency, handlers).fold(root)
}

/// Fold a graph with explicit tunables.
pub fn fold_with_config(
    graph: &NormalizedGraph,
    handlers: &HandlerMap,
    config: FoldConfig,
) -> Result<Value, FoldError> {
    Folder::with_config(&graph.adjacency, handlers, config).fold(&graph.root)
}
