//! Trait constructors.
//!
//! A trait node names an abstract operation. Elaboration picks the concrete
//! kind from the first operand's type, using the trait mappings of the
//! composed plugins, and requires every other operand to have that same type.

use weft_core::Expr;

pub const EQ: &str = "eq";
pub const LT: &str = "lt";
pub const SHOW: &str = "show";

/// Equality of two values of the same type.
pub fn eq(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(EQ, [a.into(), b.into()])
}

/// Strict ordering of two values of the same type.
pub fn lt(a: impl Into<Expr>, b: impl Into<Expr>) -> Expr {
    Expr::node(LT, [a.into(), b.into()])
}

/// String rendering of a value.
pub fn show(a: impl Into<Expr>) -> Expr {
    Expr::node(SHOW, [a.into()])
}
