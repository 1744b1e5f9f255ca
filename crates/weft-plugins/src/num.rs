//! Numbers.
//!
//! | Kind          | Inputs           | Output  |
//! |---------------|------------------|---------|
//! | `num/literal` | (lifted)         | number  |
//! | `num/add`     | number, number   | number  |
//! | `num/sub`     | number, number   | number  |
//! | `num/mul`     | number, number   | number  |
//! | `num/div`     | number, number   | number  |
//! | `num/neg`     | number           | number  |
//! | `num/eq`      | number, number   | boolean |
//! | `num/lt`      | number, number   | boolean |
//! | `num/show`    | number           | string  |
//!
//! Division by zero is a handler fault, not infinity.

use weft_core::error::HandlerError;
use weft_core::fold::{HandlerMap, expect_number, leaf, literal_value};
use weft_core::{Expr, KindSpec, Plugin, TypeTag, Value};

use crate::traits;
use crate::{binary, unary};

pub const PLUGIN: &str = "num";

pub const LITERAL: &str = "num/literal";
pub const ADD: &str = "num/add";
pub const SUB: &str = "num/sub";
pub const MUL: &str = "num/mul";
pub const DIV: &str = "num/div";
pub const NEG: &str = "num/neg";
pub const EQ: &str = "num/eq";
pub const LT: &str = "num/lt";
pub const SHOW: &str = "num/show";

pub fn plugin() -> Plugin {
    let pair = || [TypeTag::Number, TypeTag::Number];

    Plugin::new(PLUGIN)
        .lift(TypeTag::Number, LITERAL)
        .kind(ADD, KindSpec::new(pair(), TypeTag::Number))
        .kind(SUB, KindSpec::new(pair(), TypeTag::Number))
        .kind(MUL, KindSpec::new(pair(), TypeTag::Number))
        .kind(DIV, KindSpec::new(pair(), TypeTag::Number))
        .kind(NEG, KindSpec::new([TypeTag::Number], TypeTag::Number))
        .kind(EQ, KindSpec::new(pair(), TypeTag::Boolean))
        .kind(LT, KindSpec::new(pair(), TypeTag::Boolean))
        .kind(SHOW, KindSpec::new([TypeTag::Number], TypeTag::String))
        .trait_impl(traits::EQ, TypeTag::Number, EQ)
        .trait_impl(traits::LT, TypeTag::Number, LT)
        .trait_impl(traits::SHOW, TypeTag::Number, SHOW)
        .handlers(handlers)
}

pub fn handlers() -> HandlerMap {
    let mut handlers = HandlerMap::new();
    handlers.insert(LITERAL.into(), leaf(literal_value));
    handlers.insert(ADD.into(), arithmetic(|a, b| Ok(a + b)));
    handlers.insert(SUB.into(), arithmetic(|a, b| Ok(a - b)));
    handlers.insert(MUL.into(), arithmetic(|a, b| Ok(a * b)));
    handlers.insert(
        DIV.into(),
        arithmetic(|a, b| {
            if b == 0.0 {
                return Err(HandlerError::new("division by zero"));
            }
            Ok(a / b)
        }),
    );
    handlers.insert(
        NEG.into(),
        unary(|value| Ok(Value::Number(-expect_number(value)?))),
    );
    handlers.insert(
        EQ.into(),
        binary(|a, b| Ok(Value::Boolean(expect_number(a)? == expect_number(b)?))),
    );
    handlers.insert(
        LT.into(),
        binary(|a, b| Ok(Value::Boolean(expect_number(a)? < expect_number(b)?))),
    );
    handlers.insert(
        SHOW.into(),
        unary(|value| Ok(Value::String(expect_number(value)?.to_string()))),
    );
    handlers
}

fn arithmetic<F>(op: F) -> weft_core::fold::Handler
where
    F: Fn(f64, f64) -> Result<f64, HandlerError> + Send + Sync + 'static,
{
    binary(move |a, b| Ok(Value::Number(op(expect_number(a)?, expect_number(b)?)?)))
}

// ============================================================================
// Constructors
// ============================================================================

pub fn add(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(ADD, [a.into(), b.into()])
}

pub fn sub(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(SUB, [a.into(), b.into()])
}

pub fn mul(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(MUL, [a.into(), b.into()])
}

pub fn div(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(DIV, [a.into(), b.into()])
}

pub fn neg(a: impl Into<Expr>) -> Expr {
    Expr::node(NEG, [a.into()])
}
