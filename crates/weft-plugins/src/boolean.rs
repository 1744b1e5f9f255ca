//! Booleans and control flow.
//!
//! `bool/and`, `bool/or` and `bool/cond` are short-circuiting: they request
//! their operands one at a time and never request one whose value cannot
//! change the result. A faulting or expensive operand in an untaken position
//! therefore never runs.
//!
//! `bool/cond(pred, then, else)` accepts branches of any type; its declared
//! output is `Any`.

use weft_core::error::HandlerError;
use weft_core::fold::{
    ChildRef, HandlerMap, Routine, Step, expect_bool, leaf, literal_value, routine,
};
use weft_core::graph::NodeEntry;
use weft_core::{Expr, KindSpec, NodeId, Plugin, TypeTag, Value};

use crate::traits;
use crate::{binary, unary};

pub const PLUGIN: &str = "boolean";

pub const LITERAL: &str = "bool/literal";
pub const AND: &str = "bool/and";
pub const OR: &str = "bool/or";
pub const NOT: &str = "bool/not";
pub const EQ: &str = "bool/eq";
pub const SHOW: &str = "bool/show";
pub const COND: &str = "bool/cond";

pub fn plugin() -> Plugin {
    let pair = || [TypeTag::Boolean, TypeTag::Boolean];

    Plugin::new(PLUGIN)
        .lift(TypeTag::Boolean, LITERAL)
        .kind(AND, KindSpec::new(pair(), TypeTag::Boolean))
        .kind(OR, KindSpec::new(pair(), TypeTag::Boolean))
        .kind(NOT, KindSpec::new([TypeTag::Boolean], TypeTag::Boolean))
        .kind(EQ, KindSpec::new(pair(), TypeTag::Boolean))
        .kind(SHOW, KindSpec::new([TypeTag::Boolean], TypeTag::String))
        .kind(
            COND,
            KindSpec::new([TypeTag::Boolean, TypeTag::Any, TypeTag::Any], TypeTag::Any),
        )
        .trait_impl(traits::EQ, TypeTag::Boolean, EQ)
        .trait_impl(traits::SHOW, TypeTag::Boolean, SHOW)
        .handlers(handlers)
}

pub fn handlers() -> HandlerMap {
    let mut handlers = HandlerMap::new();
    handlers.insert(LITERAL.into(), leaf(literal_value));
    handlers.insert(
        AND.into(),
        routine(|_: &NodeId, _: &NodeEntry| ShortCircuit::new(false)),
    );
    handlers.insert(
        OR.into(),
        routine(|_: &NodeId, _: &NodeEntry| ShortCircuit::new(true)),
    );
    handlers.insert(NOT.into(), unary(|b| Ok(Value::Boolean(!expect_bool(b)?))));
    handlers.insert(
        EQ.into(),
        binary(|a, b| Ok(Value::Boolean(expect_bool(a)? == expect_bool(b)?))),
    );
    handlers.insert(
        SHOW.into(),
        unary(|b| Ok(Value::String(expect_bool(b)?.to_string()))),
    );
    handlers.insert(COND.into(), routine(|_: &NodeId, _: &NodeEntry| Cond::Start));
    handlers
}

/// `and` / `or`: stop as soon as an operand equals `decisive`.
struct ShortCircuit {
    decisive: bool,
    seen: usize,
}

impl ShortCircuit {
    fn new(decisive: bool) -> Self {
        Self { decisive, seen: 0 }
    }
}

impl Routine for ShortCircuit {
    fn resume(&mut self, entry: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError> {
        if let Some(value) = input {
            self.seen += 1;
            if expect_bool(&value)? == self.decisive {
                return Ok(Step::Done(Value::Boolean(self.decisive)));
            }
        }
        if self.seen < entry.children.len() {
            return Ok(Step::Request(ChildRef::Index(self.seen)));
        }
        Ok(Step::Done(Value::Boolean(!self.decisive)))
    }
}

#[derive(Clone, Copy)]
enum Cond {
    Start,
    Branch,
}

impl Routine for Cond {
    fn resume(&mut self, _entry: &NodeEntry, input: Option<Value>) -> Result<Step, HandlerError> {
        match (*self, input) {
            (Cond::Start, None) => Ok(Step::Request(ChildRef::Index(0))),
            (Cond::Start, Some(predicate)) => {
                let branch = if expect_bool(&predicate)? { 1 } else { 2 };
                *self = Cond::Branch;
                Ok(Step::Request(ChildRef::Index(branch)))
            }
            (Cond::Branch, Some(value)) => Ok(Step::Done(value)),
            (Cond::Branch, None) => Err(HandlerError::new("cond resumed without a branch value")),
        }
    }
}

pub fn and(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(AND, [a.into(), b.into()])
}

pub fn or(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(OR, [a.into(), b.into()])
}

pub fn not(a: impl Into<Expr>) -> Expr {
    Expr::node(NOT, [a.into()])
}

/// `then` if `predicate` holds, else `otherwise`. Only one branch runs.
pub fn cond(predicate: impl Into<Expr>, then: impl Into<Expr>, otherwise: impl Into<Expr>) -> Expr {
    Expr::node(COND, [predicate.into(), then.into(), otherwise.into()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num;
    use weft_core::{elaborate, fold};

    fn eval(expr: Expr) -> weft_core::Result<Value> {
        let registry = crate::registry()?;
        let graph = elaborate(&expr, &registry)?;
        Ok(fold(&graph, &registry.handlers()?)?)
    }

    #[test]
    fn test_logic() {
        assert_eq!(eval(and(true, not(false))).unwrap(), Value::Boolean(true));
        assert_eq!(eval(or(false, false)).unwrap(), Value::Boolean(false));
        assert_eq!(eval(traits::eq(true, false)).unwrap(), Value::Boolean(false));
        assert_eq!(eval(traits::show(true)).unwrap(), Value::String("true".into()));
    }

    #[test]
    fn test_and_or_short_circuit() {
        // the right operand would fault if it ran
        let boom = || traits::eq(num::div(1, 0), 0);
        assert_eq!(eval(and(false, boom())).unwrap(), Value::Boolean(false));
        assert_eq!(eval(or(true, boom())).unwrap(), Value::Boolean(true));
        assert!(eval(and(true, boom())).is_err());
    }

    #[test]
    fn test_cond_takes_one_branch() {
        let boom = traits::show(num::div(1, 0));
        assert_eq!(
            eval(cond(traits::lt(1, 2), "yes", boom.clone())).unwrap(),
            Value::String("yes".into())
        );
        assert_eq!(eval(cond(false, boom, 7)).unwrap(), Value::Number(7.0));
    }
}
