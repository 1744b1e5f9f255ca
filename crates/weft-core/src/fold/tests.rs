use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::error::{FoldError, HandlerError};
use crate::graph::{GraphBuilder, NodeEntry, NormalizedGraph};
use crate::ids::NodeId;
use crate::registry::Registry;
use crate::types::{Scalar, TypeTag, Value};

// ============================================================================
// Test handlers
// ============================================================================

fn base_handlers() -> HandlerMap {
    let mut handlers = Registry::compose([]).unwrap().handlers().unwrap();
    handlers.insert("lit".into(), leaf(literal_value));
    handlers.insert(
        "add".into(),
        strict(|_, values| {
            let mut total = 0.0;
            for value in &values {
                total += expect_number(value)?;
            }
            Ok(Value::Number(total))
        }),
    );
    handlers.insert(
        "inc".into(),
        strict(|_, values| Ok(Value::Number(expect_number(&values[0])? + 1.0))),
    );
    handlers.insert("cond".into(), routine(|_: &NodeId, _: &NodeEntry| Cond::default()));
    handlers.insert(
        "fail".into(),
        leaf(|_| Err(HandlerError::new("this branch must not run"))),
    );
    handlers
}

/// Counts how many routines a handler has produced.
fn counted(handler: Handler, counter: Arc<AtomicUsize>) -> Handler {
    Arc::new(move |id: &NodeId, entry: &NodeEntry| {
        counter.fetch_add(1, Ordering::SeqCst);
        handler(id, entry)
    })
}

/// `cond(pred, then, else)` requesting only the taken branch.
#[derive(Default)]
struct Cond {
    predicate: Option<bool>,
}

impl Routine for Cond {
    fn resume(&mut self, _entry: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError> {
        match (self.predicate, input) {
            (None, None) => Ok(Step::Request(ChildRef::Index(0))),
            (None, Some(value)) => {
                let taken = expect_bool(&value)?;
                self.predicate = Some(taken);
                Ok(Step::Request(ChildRef::Index(if taken { 1 } else { 2 })))
            }
            (Some(_), Some(value)) => Ok(Step::Done(value)),
            (Some(_), None) => Err(HandlerError::new("resumed without a value")),
        }
    }
}

/// `lit(0)` wrapped in `inc` `depth` times.
fn chain(depth: usize) -> NormalizedGraph {
    let mut builder = GraphBuilder::new();
    let mut current = builder.literal("lit", Scalar::Number(0.0));
    for _ in 0..depth {
        current = builder.push_node("inc", vec![current], TypeTag::Number);
    }
    builder.finish(current)
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_fold_simple_sum() {
    let mut builder = GraphBuilder::new();
    let a = builder.literal("lit", Scalar::Number(3.0));
    let b = builder.literal("lit", Scalar::Number(4.0));
    let c = builder.push_node("add", vec![a, b], TypeTag::Number);
    let graph = builder.finish(c);

    assert_eq!(fold(&graph, &base_handlers()).unwrap(), Value::Number(7.0));
}

#[test]
fn test_shared_node_runs_once() {
    let mut builder = GraphBuilder::new();
    let a = builder.literal("lit", Scalar::Number(2.0));
    let shared = builder.push_node("inc", vec![a], TypeTag::Number);
    let root = builder.push_node("add", vec![shared.clone(), shared], TypeTag::Number);
    let graph = builder.finish(root);

    let runs = Arc::new(AtomicUsize::new(0));
    let mut handlers = base_handlers();
    let inc = handlers["inc"].clone();
    handlers.insert("inc".into(), counted(inc, Arc::clone(&runs)));

    let mut folder = Folder::new(&graph.adjacency, &handlers);
    assert_eq!(folder.fold(&graph.root).unwrap(), Value::Number(6.0));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(folder.stats().handlers_started, 3);
    assert_eq!(folder.stats().cache_hits, 1);
}

#[test]
fn test_untaken_branch_never_starts() {
    let mut builder = GraphBuilder::new();
    let yes = builder.literal("lit", Scalar::Boolean(true));
    let then = builder.literal("lit", Scalar::from("then"));
    let otherwise = builder.push_node("fail", vec![], TypeTag::String);
    let root = builder.push_node("cond", vec![yes, then, otherwise], TypeTag::String);
    let graph = builder.finish(root);

    let runs = Arc::new(AtomicUsize::new(0));
    let mut handlers = base_handlers();
    let fail = handlers["fail"].clone();
    handlers.insert("fail".into(), counted(fail, Arc::clone(&runs)));

    assert_eq!(fold(&graph, &handlers).unwrap(), Value::String("then".into()));
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_deep_chain_is_stack_safe() {
    let graph = chain(10_000);
    let handlers = base_handlers();
    let mut folder = Folder::new(&graph.adjacency, &handlers);
    assert_eq!(folder.fold(&graph.root).unwrap(), Value::Number(10_000.0));
    assert_eq!(folder.stats().max_depth, 10_001);
}

#[test]
fn test_folder_memo_survives_across_roots() {
    let graph = chain(3);
    let handlers = base_handlers();
    let mut folder = Folder::new(&graph.adjacency, &handlers);

    assert_eq!(folder.fold(&"c".into()).unwrap(), Value::Number(2.0));
    let started = folder.stats().handlers_started;
    assert_eq!(folder.fold(&"d".into()).unwrap(), Value::Number(3.0));
    assert_eq!(folder.stats().handlers_started, started + 1);
    assert_eq!(folder.memoized(&"a".into()), Some(&Value::Number(0.0)));

    assert_eq!(folder.fold(&"b".into()).unwrap(), Value::Number(1.0));
    assert_eq!(folder.stats().handlers_started, started + 1);
}

#[test]
fn test_request_by_explicit_alias_id() {
    struct ReadAlias;
    impl Routine for ReadAlias {
        fn resume(&mut self, _: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError> {
            match input {
                None => Ok(Step::Request(ChildRef::Id(NodeId::alias("answer")))),
                Some(value) => Ok(Step::Done(value)),
            }
        }
    }

    let mut builder = GraphBuilder::new();
    let a = builder.literal("lit", Scalar::Number(42.0));
    builder.name("answer", &a);
    let root = builder.push_node("read", vec![], TypeTag::Number);
    let graph = builder.finish(root);

    let mut handlers = base_handlers();
    handlers.insert("read".into(), routine(|_: &NodeId, _: &NodeEntry| ReadAlias));
    assert_eq!(fold(&graph, &handlers).unwrap(), Value::Number(42.0));
}

#[test]
fn test_record_and_access() {
    use crate::graph::Payload;
    use crate::types::AccessKey;

    let mut builder = GraphBuilder::new();
    let x = builder.literal("lit", Scalar::Number(1.0));
    let y = builder.literal("lit", Scalar::from("two"));
    let record = builder.push(
        NodeEntry::new(crate::kinds::RECORD, vec![x.clone(), y.clone()], TypeTag::Record)
            .with_payload(Payload::Record(
                [("x".to_string(), x), ("y".to_string(), y)].into_iter().collect(),
            )),
    );
    let access = builder.push(
        NodeEntry::new(crate::kinds::ACCESS, vec![record], TypeTag::String)
            .with_payload(Payload::Access(AccessKey::Field("y".into()))),
    );
    let graph = builder.finish(access);

    assert_eq!(fold(&graph, &base_handlers()).unwrap(), Value::String("two".into()));
}

// ============================================================================
// Faults
// ============================================================================

#[test]
fn test_missing_child_names_requester() {
    let mut builder = GraphBuilder::new();
    let root = builder.push_node("inc", vec!["zz".into()], TypeTag::Number);
    let graph = builder.finish(root);

    assert_eq!(
        fold(&graph, &base_handlers()).unwrap_err(),
        FoldError::MissingNode {
            id: "zz".into(),
            requested_by: Some("a".into()),
        }
    );
}

#[test]
fn test_missing_root() {
    let graph = GraphBuilder::new().finish("a".into());
    assert_eq!(
        fold(&graph, &base_handlers()).unwrap_err(),
        FoldError::MissingNode {
            id: "a".into(),
            requested_by: None,
        }
    );
}

#[test]
fn test_missing_handler() {
    let mut builder = GraphBuilder::new();
    let root = builder.push_node("mystery", vec![], TypeTag::Any);
    let graph = builder.finish(root);

    assert_eq!(
        fold(&graph, &base_handlers()).unwrap_err(),
        FoldError::MissingHandler {
            id: "a".into(),
            kind: "mystery".into(),
        }
    );
}

#[test]
fn test_child_index_out_of_range() {
    let mut builder = GraphBuilder::new();
    let a = builder.literal("lit", Scalar::Boolean(false));
    // cond with only a predicate: the else branch at index 2 is missing
    let root = builder.push_node("cond", vec![a], TypeTag::Any);
    let graph = builder.finish(root);

    assert_eq!(
        fold(&graph, &base_handlers()).unwrap_err(),
        FoldError::ChildIndexOutOfRange {
            id: "b".into(),
            kind: "cond".into(),
            index: 2,
            len: 1,
        }
    );
}

#[test]
fn test_handler_fault_names_node() {
    let mut builder = GraphBuilder::new();
    let a = builder.push_node("fail", vec![], TypeTag::Number);
    let root = builder.push_node("inc", vec![a], TypeTag::Number);
    let graph = builder.finish(root);

    let err = fold(&graph, &base_handlers()).unwrap_err();
    assert!(matches!(
        err,
        FoldError::Handler { ref id, ref kind, .. } if id.as_str() == "a" && kind == "fail"
    ));
}

#[test]
fn test_cycle_is_unresolved() {
    let mut adjacency = crate::graph::Adjacency::new();
    adjacency.insert("a".into(), NodeEntry::new("inc", vec!["b".into()], TypeTag::Number));
    adjacency.insert("b".into(), NodeEntry::new("inc", vec!["a".into()], TypeTag::Number));

    assert_eq!(
        fold_at(&"a".into(), &adjacency, &base_handlers()).unwrap_err(),
        FoldError::Unresolved {
            id: "a".into(),
            kind: "inc".into(),
        }
    );
}

#[test]
fn test_frame_limit() {
    let graph = chain(9);
    let config = FoldConfig {
        max_frames: Some(3),
        ..FoldConfig::default()
    };

    assert_eq!(
        fold_with_config(&graph, &base_handlers(), config).unwrap_err(),
        FoldError::FrameLimit {
            id: "g".into(),
            limit: 3,
        }
    );
    assert!(fold(&graph, &base_handlers()).is_ok());
}

#[test]
fn test_frame_limit_admits_exact_depth() {
    let config = FoldConfig {
        max_frames: Some(3),
        ..FoldConfig::default()
    };

    // lit + two incs: three frames at the deepest point
    assert_eq!(
        fold_with_config(&chain(2), &base_handlers(), config).unwrap(),
        Value::Number(2.0)
    );
    assert_eq!(
        fold_with_config(&chain(3), &base_handlers(), config).unwrap_err(),
        FoldError::FrameLimit {
            id: "a".into(),
            limit: 3,
        }
    );
}

#[test]
fn test_config_defaults_from_partial_json() {
    let config: FoldConfig = serde_json::from_str(r#"{"max_frames": 128}"#).unwrap();
    assert_eq!(config.frame_capacity, 64);
    assert_eq!(config.max_frames, Some(128));
}
