//! Elaboration: expression values → normalized graphs.
//!
//! Elaboration walks an [`Expr`] depth-first, left to right, and emits one
//! [`NodeEntry`] per visited value:
//!
//! | Expression                     | Emitted entry                                  |
//! |--------------------------------|------------------------------------------------|
//! | `Node` with a trait name       | concrete kind picked by the first operand type |
//! | `Node` with an ordinary kind   | that kind, arguments checked against its spec  |
//! | `Access`                       | `core/access`, one child, key in payload       |
//! | `List` / `Map`                 | `core/tuple` / `core/record` with layout       |
//! | `Scalar`                       | literal kind from the lift mapping             |
//!
//! Entries are hash-consed: a value whose kind, children, type and payload
//! equal an entry already emitted reuses that entry's id, so structurally
//! equal subexpressions share one node. Ids are issued in emission order, so
//! the same expression under the same registry always yields the same graph.
//!
//! Every failure is structural and aborts the whole pass.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::error::ElaborateError;
use crate::expr::Expr;
use crate::graph::{GraphBuilder, NodeEntry, NormalizedGraph, Payload};
use crate::ids::NodeId;
use crate::kinds;
use crate::plugin::KindSpec;
use crate::registry::Registry;
use crate::types::{AccessKey, Scalar, TypeTag};

/// Elaborate `expr` under `registry`.
///
/// The walk keeps its own frame stack, so nesting depth is bounded by memory
/// rather than by the thread stack.
#[instrument(skip_all, name = "elaborate")]
pub fn elaborate(expr: &Expr, registry: &Registry) -> Result<NormalizedGraph, ElaborateError> {
    let mut elaborator = Elaborator {
        registry,
        builder: GraphBuilder::new(),
        interned: HashMap::new(),
        shared: 0,
        max_depth: 0,
    };
    let root = elaborator.run(expr)?;

    debug!(
        root = %root,
        entries = elaborator.builder.len(),
        shared = elaborator.shared,
        max_depth = elaborator.max_depth,
        "elaboration complete"
    );
    Ok(elaborator.builder.finish(root))
}

struct Elaborator<'r> {
    registry: &'r Registry,
    builder: GraphBuilder,
    interned: HashMap<ContentKey, NodeId>,
    shared: usize,
    max_depth: usize,
}

/// An expression whose children are still being elaborated.
struct Frame<'e> {
    shape: Shape<'e>,
    children: Vec<NodeId>,
}

enum Shape<'e> {
    /// Ordinary kind. Arity is checked before the frame is opened.
    Kind {
        kind: &'e str,
        args: &'e [Expr],
        spec: KindSpec,
    },
    /// Trait call. Dispatch is fixed once the first operand has a type.
    Trait {
        name: &'e str,
        args: &'e [Expr],
        dispatch: Option<Dispatch>,
    },
    Access {
        parent: &'e Expr,
        key: &'e AccessKey,
    },
    List(&'e [Expr]),
    Map(&'e IndexMap<String, Expr>),
}

struct Dispatch {
    concrete: String,
    spec: Option<KindSpec>,
    operand: TypeTag,
}

enum Opened<'e> {
    /// Scalars are emitted as soon as they are seen.
    Emitted(NodeId),
    Frame(Frame<'e>),
}

impl<'e> Frame<'e> {
    fn new(shape: Shape<'e>) -> Self {
        Self {
            shape,
            children: Vec::new(),
        }
    }

    /// The next child expression to elaborate, in source order.
    fn next_child(&self) -> Option<&'e Expr> {
        let position = self.children.len();
        match self.shape {
            Shape::Kind { args, .. } | Shape::Trait { args, .. } | Shape::List(args) => {
                args.get(position)
            }
            Shape::Access { parent, .. } => (position == 0).then_some(parent),
            Shape::Map(fields) => fields.get_index(position).map(|(_, value)| value),
        }
    }
}

impl Elaborator<'_> {
    /// Depth-first, left to right: every child is emitted before its parent.
    fn run<'e>(&mut self, root: &'e Expr) -> Result<NodeId, ElaborateError> {
        let mut top = match self.open(root)? {
            Opened::Emitted(id) => return Ok(id),
            Opened::Frame(frame) => frame,
        };
        // frames waiting on `top`
        let mut suspended: Vec<Frame<'e>> = Vec::new();

        loop {
            if let Some(child) = top.next_child() {
                match self.open(child)? {
                    Opened::Emitted(id) => self.accept(&mut top, id)?,
                    Opened::Frame(frame) => {
                        suspended.push(std::mem::replace(&mut top, frame));
                        self.max_depth = self.max_depth.max(suspended.len() + 1);
                    }
                }
                continue;
            }

            let id = self.close(top)?;
            match suspended.pop() {
                Some(parent) => {
                    top = parent;
                    self.accept(&mut top, id)?;
                }
                None => return Ok(id),
            }
        }
    }

    /// Emit a scalar, or open a frame for a compound expression.
    fn open<'e>(&mut self, expr: &'e Expr) -> Result<Opened<'e>, ElaborateError> {
        let shape = match expr {
            Expr::Node { kind, args } if self.registry.is_trait(kind) => Shape::Trait {
                name: kind,
                args,
                dispatch: None,
            },
            Expr::Node { kind, args } => {
                let spec = self
                    .registry
                    .kind_spec(kind)
                    .cloned()
                    .ok_or_else(|| ElaborateError::UnknownKind { kind: kind.clone() })?;
                if spec.inputs.len() != args.len() {
                    return Err(ElaborateError::ArityMismatch {
                        kind: kind.clone(),
                        expected: spec.inputs.len(),
                        found: args.len(),
                    });
                }
                Shape::Kind { kind, args, spec }
            }
            Expr::Access { parent, key } => Shape::Access { parent, key },
            Expr::List(items) => Shape::List(items),
            Expr::Map(fields) => Shape::Map(fields),
            Expr::Scalar(scalar) => {
                let type_tag = scalar.type_tag();
                let kind = self
                    .registry
                    .lift(&type_tag)
                    .ok_or(ElaborateError::NoLift { type_tag })?;
                let entry = NodeEntry::literal(kind, scalar.clone());
                return Ok(Opened::Emitted(self.emit(entry)));
            }
        };
        Ok(Opened::Frame(Frame::new(shape)))
    }

    /// Record a finished child, checking its type against its position.
    fn accept(&self, frame: &mut Frame<'_>, id: NodeId) -> Result<(), ElaborateError> {
        let position = frame.children.len();
        match &mut frame.shape {
            Shape::Kind { kind, spec, .. } => {
                if let Some(expected) = spec.inputs.get(position) {
                    self.check(&id, expected, kind, position)?;
                }
            }
            Shape::Trait { name, args, dispatch } => match dispatch {
                Some(dispatch) => self.check(&id, &dispatch.operand, name, position)?,
                None => *dispatch = Some(self.dispatch(name, args.len(), &id)?),
            },
            Shape::Access { .. } | Shape::List(_) | Shape::Map(_) => {}
        }
        frame.children.push(id);
        Ok(())
    }

    fn check(
        &self,
        id: &NodeId,
        expected: &TypeTag,
        kind: &str,
        position: usize,
    ) -> Result<(), ElaborateError> {
        let found = self.out_of(id);
        if !expected.accepts(&found) {
            return Err(ElaborateError::TypeMismatch {
                kind: kind.to_string(),
                position,
                expected: expected.clone(),
                found,
            });
        }
        Ok(())
    }

    /// Pick the concrete kind for a trait from its first operand.
    fn dispatch(
        &self,
        trait_name: &str,
        arity: usize,
        first: &NodeId,
    ) -> Result<Dispatch, ElaborateError> {
        let operand = self.out_of(first);
        let concrete = self
            .registry
            .trait_mapping(trait_name)
            .and_then(|mapping| mapping.get(&operand))
            .cloned()
            .ok_or_else(|| ElaborateError::UnimplementedTrait {
                trait_name: trait_name.to_string(),
                type_tag: operand.clone(),
            })?;

        let spec = self.registry.kind_spec(&concrete).cloned();
        if let Some(spec) = &spec
            && spec.inputs.len() != arity
        {
            return Err(ElaborateError::ArityMismatch {
                kind: concrete,
                expected: spec.inputs.len(),
                found: arity,
            });
        }

        Ok(Dispatch {
            concrete,
            spec,
            operand,
        })
    }

    /// All children are in; emit the frame's own entry.
    fn close(&mut self, frame: Frame<'_>) -> Result<NodeId, ElaborateError> {
        let Frame { shape, children } = frame;
        let entry = match shape {
            Shape::Kind { kind, spec, .. } => NodeEntry::new(kind, children, spec.output),
            Shape::Trait { name, dispatch, .. } => {
                let Some(Dispatch { concrete, spec, .. }) = dispatch else {
                    return Err(ElaborateError::ArityMismatch {
                        kind: name.to_string(),
                        expected: 1,
                        found: 0,
                    });
                };
                let out = spec.map(|spec| spec.output).unwrap_or(TypeTag::Any);
                NodeEntry::new(concrete, children, out)
            }
            Shape::Access { key, .. } => {
                let parent = &children[0];
                let out = self.access_type(parent, key)?;
                NodeEntry::new(kinds::ACCESS, children, out)
                    .with_payload(Payload::Access(key.clone()))
            }
            Shape::List(_) => NodeEntry::new(kinds::TUPLE, children.clone(), TypeTag::Tuple)
                .with_payload(Payload::Tuple(children)),
            Shape::Map(fields) => {
                let layout: IndexMap<String, NodeId> =
                    fields.keys().cloned().zip(children.iter().cloned()).collect();
                NodeEntry::new(kinds::RECORD, children, TypeTag::Record)
                    .with_payload(Payload::Record(layout))
            }
        };
        Ok(self.emit(entry))
    }

    /// Type of `parent[key]`, checked when the parent's layout is known.
    fn access_type(&self, parent: &NodeId, key: &AccessKey) -> Result<TypeTag, ElaborateError> {
        let Some(entry) = self.builder.get(parent) else {
            return Ok(TypeTag::Any);
        };

        let target = match (&entry.payload, key) {
            (Payload::Record(fields), AccessKey::Field(name)) => {
                Some(fields.get(name).ok_or_else(|| ElaborateError::NoSuchField {
                    node: parent.clone(),
                    field: name.clone(),
                })?)
            }
            (Payload::Tuple(items), AccessKey::Index(idx)) => {
                Some(items.get(*idx).ok_or_else(|| ElaborateError::IndexOutOfRange {
                    node: parent.clone(),
                    key: key.clone(),
                    len: items.len(),
                })?)
            }
            _ => None,
        };

        Ok(target.map(|id| self.out_of(id)).unwrap_or(TypeTag::Any))
    }

    fn out_of(&self, id: &NodeId) -> TypeTag {
        self.builder
            .get(id)
            .map(|entry| entry.out.clone())
            .unwrap_or(TypeTag::Any)
    }

    /// Push `entry`, or reuse the id of an identical entry.
    fn emit(&mut self, entry: NodeEntry) -> NodeId {
        let key = ContentKey::of(&entry);
        if let Some(existing) = self.interned.get(&key) {
            self.shared += 1;
            return existing.clone();
        }
        let id = self.builder.push(entry);
        self.interned.insert(key, id.clone());
        id
    }
}

/// Hashable identity of an entry's content.
#[derive(Debug, PartialEq, Eq, Hash)]
struct ContentKey {
    kind: String,
    children: Vec<NodeId>,
    out: TypeTag,
    payload: PayloadKey,
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum PayloadKey {
    None,
    Number(u64),
    String(String),
    Boolean(bool),
    Null,
    Access(AccessKey),
    Record(Vec<(String, NodeId)>),
    Tuple(Vec<NodeId>),
}

impl ContentKey {
    fn of(entry: &NodeEntry) -> Self {
        let payload = match &entry.payload {
            Payload::None => PayloadKey::None,
            Payload::Literal(Scalar::Number(v)) => PayloadKey::Number(v.to_bits()),
            Payload::Literal(Scalar::String(v)) => PayloadKey::String(v.clone()),
            Payload::Literal(Scalar::Boolean(v)) => PayloadKey::Boolean(*v),
            Payload::Literal(Scalar::Null) => PayloadKey::Null,
            Payload::Access(key) => PayloadKey::Access(key.clone()),
            Payload::Record(fields) => PayloadKey::Record(
                fields
                    .iter()
                    .map(|(name, id)| (name.clone(), id.clone()))
                    .collect(),
            ),
            Payload::Tuple(items) => PayloadKey::Tuple(items.clone()),
        };

        Self {
            kind: entry.kind.clone(),
            children: entry.children.clone(),
            out: entry.out.clone(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fold::HandlerMap;
    use crate::plugin::Plugin;

    fn arith() -> Registry {
        let plugin = Plugin::new("arith")
            .lift(TypeTag::Number, "n/lit")
            .lift(TypeTag::String, "s/lit")
            .kind("n/add", KindSpec::new([TypeTag::Number, TypeTag::Number], TypeTag::Number))
            .kind("n/mul", KindSpec::new([TypeTag::Number, TypeTag::Number], TypeTag::Number))
            .kind("n/eq", KindSpec::new([TypeTag::Number, TypeTag::Number], TypeTag::Boolean))
            .kind("s/eq", KindSpec::new([TypeTag::String, TypeTag::String], TypeTag::Boolean))
            .trait_impl("eq", TypeTag::Number, "n/eq")
            .trait_impl("eq", TypeTag::String, "s/eq")
            .handlers(HandlerMap::new);
        Registry::compose([plugin]).unwrap()
    }

    fn add(a: Expr, b: Expr) -> Expr {
        Expr::node("n/add", [a, b])
    }

    fn mul(a: Expr, b: Expr) -> Expr {
        Expr::node("n/mul", [a, b])
    }

    #[test]
    fn test_emits_children_before_parents() {
        let graph = elaborate(&mul(add(3.into(), 4.into()), 5.into()), &arith()).unwrap();

        let kinds: Vec<(&str, &str)> = graph
            .adjacency
            .iter()
            .map(|(id, entry)| (id.as_str(), entry.kind.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![("a", "n/lit"), ("b", "n/lit"), ("c", "n/add"), ("d", "n/lit"), ("e", "n/mul")]
        );
        assert_eq!(graph.root.as_str(), "e");
        assert_eq!(graph.output, TypeTag::Number);
        assert_eq!(graph.cursor.peek().as_str(), "f");
    }

    #[test]
    fn test_identical_subexpressions_share_a_node() {
        let shared = mul(2.into(), 3.into());
        let graph = elaborate(&add(shared.clone(), shared), &arith()).unwrap();

        // 2, 3, mul, add
        assert_eq!(graph.len(), 4);
        let root = graph.root_entry().unwrap();
        assert_eq!(root.children[0], root.children[1]);
    }

    #[test]
    fn test_trait_resolves_by_first_operand() {
        let registry = arith();
        let numeric = elaborate(&Expr::node("eq", [1.into(), 2.into()]), &registry).unwrap();
        assert_eq!(numeric.root_entry().unwrap().kind, "n/eq");
        assert_eq!(numeric.output, TypeTag::Boolean);

        let textual = elaborate(&Expr::node("eq", ["a".into(), "b".into()]), &registry).unwrap();
        assert_eq!(textual.root_entry().unwrap().kind, "s/eq");
    }

    #[test]
    fn test_trait_operand_mismatch() {
        let err = elaborate(&Expr::node("eq", [1.into(), "x".into()]), &arith()).unwrap_err();
        assert_eq!(
            err,
            ElaborateError::TypeMismatch {
                kind: "eq".into(),
                position: 1,
                expected: TypeTag::Number,
                found: TypeTag::String,
            }
        );
    }

    #[test]
    fn test_unimplemented_trait() {
        let err = elaborate(&Expr::node("eq", [true.into(), true.into()]), &arith()).unwrap_err();
        assert!(matches!(
            err,
            ElaborateError::NoLift {
                type_tag: TypeTag::Boolean
            }
        ));

        let record = Expr::record([("x", 1.into())]);
        let err = elaborate(&Expr::node("eq", [record.clone(), record]), &arith()).unwrap_err();
        assert_eq!(
            err,
            ElaborateError::UnimplementedTrait {
                trait_name: "eq".into(),
                type_tag: TypeTag::Record,
            }
        );
    }

    #[test]
    fn test_argument_type_mismatch() {
        let err = elaborate(&add(1.into(), "two".into()), &arith()).unwrap_err();
        assert_eq!(
            err,
            ElaborateError::TypeMismatch {
                kind: "n/add".into(),
                position: 1,
                expected: TypeTag::Number,
                found: TypeTag::String,
            }
        );
    }

    #[test]
    fn test_unknown_kind_and_arity() {
        let err = elaborate(&Expr::node("n/pow", [1.into(), 2.into()]), &arith()).unwrap_err();
        assert_eq!(err, ElaborateError::UnknownKind { kind: "n/pow".into() });

        let err = elaborate(&Expr::node("n/add", [1.into()]), &arith()).unwrap_err();
        assert_eq!(
            err,
            ElaborateError::ArityMismatch {
                kind: "n/add".into(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_composites_record_layout() {
        let expr = Expr::record([("x", 1.into()), ("y", Expr::list([2.into(), 3.into()]))]);
        let graph = elaborate(&expr, &arith()).unwrap();

        let root = graph.root_entry().unwrap();
        assert_eq!(root.kind, kinds::RECORD);
        let Payload::Record(layout) = &root.payload else {
            panic!("expected record payload");
        };
        assert_eq!(layout.keys().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(root.children, layout.values().cloned().collect::<Vec<_>>());

        let tuple = graph.get(&layout["y"]).unwrap();
        assert_eq!(tuple.kind, kinds::TUPLE);
        assert!(matches!(&tuple.payload, Payload::Tuple(items) if items.len() == 2));
    }

    #[test]
    fn test_access_types_follow_layout() {
        let point = Expr::record([("x", 1.into()), ("label", "p".into())]);
        let graph = elaborate(&point.clone().field("label"), &arith()).unwrap();
        let root = graph.root_entry().unwrap();
        assert_eq!(root.kind, kinds::ACCESS);
        assert_eq!(root.out, TypeTag::String);
        assert_eq!(root.payload, Payload::Access(AccessKey::Field("label".into())));

        let err = elaborate(&point.field("z"), &arith()).unwrap_err();
        assert!(matches!(err, ElaborateError::NoSuchField { ref field, .. } if field == "z"));

        let err = elaborate(&Expr::list([1.into()]).index(3), &arith()).unwrap_err();
        assert!(matches!(err, ElaborateError::IndexOutOfRange { len: 1, .. }));
    }

    #[test]
    fn test_access_result_feeds_typed_argument() {
        let pair = Expr::list([1.into(), 2.into()]);
        let expr = add(pair.clone().index(0), pair.index(1));
        let graph = elaborate(&expr, &arith()).unwrap();
        assert_eq!(graph.output, TypeTag::Number);
    }

    #[test]
    fn test_trait_without_operands() {
        let err = elaborate(&Expr::node("eq", []), &arith()).unwrap_err();
        assert_eq!(
            err,
            ElaborateError::ArityMismatch {
                kind: "eq".into(),
                expected: 1,
                found: 0,
            }
        );
    }

    #[test]
    fn test_ten_thousand_deep_expression() {
        let mut expr = Expr::from(1);
        for _ in 0..10_000 {
            expr = add(expr, 1.into());
        }

        let graph = elaborate(&expr, &arith()).unwrap();
        // one shared literal plus one add per level
        assert_eq!(graph.len(), 10_001);
        assert_eq!(graph.output, TypeTag::Number);

        let root = graph.root_entry().unwrap();
        assert_eq!(root.kind, "n/add");
        assert_eq!(root.children[1].as_str(), "a");
    }

    #[test]
    fn test_deep_mismatch_reports_innermost_position() {
        let mut expr = add(1.into(), "x".into());
        for _ in 0..5_000 {
            expr = Expr::list([expr]);
        }

        let err = elaborate(&expr, &arith()).unwrap_err();
        assert_eq!(
            err,
            ElaborateError::TypeMismatch {
                kind: "n/add".into(),
                position: 1,
                expected: TypeTag::Number,
                found: TypeTag::String,
            }
        );
    }

    #[test]
    fn test_same_input_same_graph() {
        let expr = mul(add(3.into(), 4.into()), Expr::record([("k", 5.into())]).field("k"));
        let registry = arith();
        assert_eq!(elaborate(&expr, &registry).unwrap(), elaborate(&expr, &registry).unwrap());
    }
}
