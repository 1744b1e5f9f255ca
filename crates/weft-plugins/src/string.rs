//! Strings.
//!
//! Lengths count Unicode scalar values, not bytes. `str/lt` compares
//! lexicographically by code point.

use weft_core::fold::{HandlerMap, expect_str, leaf, literal_value};
use weft_core::{Expr, KindSpec, Plugin, TypeTag, Value};

use crate::traits;
use crate::{binary, unary};

pub const PLUGIN: &str = "str";

pub const LITERAL: &str = "str/literal";
pub const CONCAT: &str = "str/concat";
pub const LEN: &str = "str/len";
pub const EQ: &str = "str/eq";
pub const LT: &str = "str/lt";
pub const SHOW: &str = "str/show";

pub fn plugin() -> Plugin {
    let pair = || [TypeTag::String, TypeTag::String];

    Plugin::new(PLUGIN)
        .lift(TypeTag::String, LITERAL)
        .kind(CONCAT, KindSpec::new(pair(), TypeTag::String))
        .kind(LEN, KindSpec::new([TypeTag::String], TypeTag::Number))
        .kind(EQ, KindSpec::new(pair(), TypeTag::Boolean))
        .kind(LT, KindSpec::new(pair(), TypeTag::Boolean))
        .kind(SHOW, KindSpec::new([TypeTag::String], TypeTag::String))
        .trait_impl(traits::EQ, TypeTag::String, EQ)
        .trait_impl(traits::LT, TypeTag::String, LT)
        .trait_impl(traits::SHOW, TypeTag::String, SHOW)
        .handlers(handlers)
}

pub fn handlers() -> HandlerMap {
    let mut handlers = HandlerMap::new();
    handlers.insert(LITERAL.into(), leaf(literal_value));
    handlers.insert(
        CONCAT.into(),
        binary(|a, b| Ok(Value::String(format!("{}{}", expect_str(a)?, expect_str(b)?)))),
    );
    handlers.insert(
        LEN.into(),
        unary(|s| Ok(Value::Number(expect_str(s)?.chars().count() as f64))),
    );
    handlers.insert(
        EQ.into(),
        binary(|a, b| Ok(Value::Boolean(expect_str(a)? == expect_str(b)?))),
    );
    handlers.insert(
        LT.into(),
        binary(|a, b| Ok(Value::Boolean(expect_str(a)? < expect_str(b)?))),
    );
    // already a string
    handlers.insert(SHOW.into(), unary(|s| Ok(Value::String(expect_str(s)?.to_string()))));
    handlers
}

pub fn concat(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(CONCAT, [a.into(), b.into()])
}

pub fn len(s: impl Into<Expr>) -> Expr {
    Expr::node(LEN, [s.into()])
}
