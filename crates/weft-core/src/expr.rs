//! Expression values
//!
//! An [`Expr`] is the permissive, unresolved form of a program built by
//! plugin constructors. It carries no ids and no types; elaboration turns it
//! into a [`NormalizedGraph`](crate::graph::NormalizedGraph).

use indexmap::IndexMap;

use crate::types::{AccessKey, Scalar};

/// Unresolved construction-time value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Tagged node: an ordinary kind or a trait name, with ordered arguments.
    Node { kind: String, args: Vec<Expr> },
    /// Deferred property or index access on another value.
    Access { parent: Box<Expr>, key: AccessKey },
    /// Plain scalar, lifted to a literal node.
    Scalar(Scalar),
    /// Plain ordered list, becomes a tuple node.
    List(Vec<Expr>),
    /// Plain keyed mapping, becomes a record node.
    Map(IndexMap<String, Expr>),
}

impl Expr {
    /// Build a node expression.
    pub fn node(kind: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Node {
            kind: kind.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn null() -> Self {
        Expr::Scalar(Scalar::Null)
    }

    pub fn list(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::List(items.into_iter().collect())
    }

    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::Map(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Deferred `.name` access.
    pub fn field(self, name: impl Into<String>) -> Self {
        Expr::Access {
            parent: Box::new(self),
            key: AccessKey::Field(name.into()),
        }
    }

    /// Deferred `[index]` access.
    pub fn index(self, index: usize) -> Self {
        Expr::Access {
            parent: Box::new(self),
            key: AccessKey::Index(index),
        }
    }
}

/// Children are unlinked onto a work list first, so dropping a deeply nested
/// expression does not recurse.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = match self {
            Expr::Node { args, .. } | Expr::List(args) => std::mem::take(args),
            Expr::Access { parent, .. } => vec![std::mem::replace(&mut **parent, Expr::null())],
            Expr::Map(fields) => std::mem::take(fields).into_values().collect(),
            Expr::Scalar(_) => return,
        };

        while let Some(mut expr) = pending.pop() {
            match &mut expr {
                Expr::Node { args, .. } | Expr::List(args) => pending.append(args),
                Expr::Access { parent, .. } => {
                    pending.push(std::mem::replace(&mut **parent, Expr::null()));
                }
                Expr::Map(fields) => pending.extend(std::mem::take(fields).into_values()),
                Expr::Scalar(_) => {}
            }
        }
    }
}

macro_rules! scalar_into_expr {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_into_expr!(f64, i32, bool, &str, String);

impl From<Scalar> for Expr {
    fn from(value: Scalar) -> Self {
        Expr::Scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_convert_into_expr() {
        assert_eq!(Expr::from(3), Expr::Scalar(Scalar::Number(3.0)));
        assert_eq!(Expr::from("hi"), Expr::Scalar(Scalar::String("hi".into())));
        assert_eq!(Expr::from(true), Expr::Scalar(Scalar::Boolean(true)));
    }

    #[test]
    fn test_access_chain() {
        let expr = Expr::record([("point", Expr::list([1.into(), 2.into()]))])
            .field("point")
            .index(1);

        let Expr::Access { parent, key } = &expr else {
            panic!("expected access");
        };
        assert_eq!(*key, AccessKey::Index(1));
        assert!(matches!(
            **parent,
            Expr::Access { key: AccessKey::Field(ref f), .. } if f == "point"
        ));
    }

    #[test]
    fn test_deeply_nested_expression_drops() {
        let mut expr = Expr::from(0);
        for depth in 0..200_000 {
            expr = match depth % 3 {
                0 => Expr::node("k", [expr, 1.into()]),
                1 => Expr::record([("inner", expr)]),
                _ => expr.field("inner"),
            };
        }
        drop(expr);
    }
}
