//! Core value types
//!
//! Scalars carried by literal nodes, the type tags used for kind
//! specifications and trait dispatch, and the values a fold produces.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Runtime type tag.
///
/// Used by kind specifications (argument and output types), by trait
/// dispatch (operand type → concrete kind) and by lift mappings (scalar type
/// → literal kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeTag {
    Number,
    String,
    Boolean,
    Null,
    Record,
    Tuple,
    /// Compatible with every other tag in either direction.
    Any,
    /// Plugin-defined type.
    Custom(String),
}

impl TypeTag {
    /// Whether a value of type `found` may stand where `self` is expected.
    pub fn accepts(&self, found: &TypeTag) -> bool {
        matches!(self, TypeTag::Any) || matches!(found, TypeTag::Any) || self == found
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Number => write!(f, "number"),
            TypeTag::String => write!(f, "string"),
            TypeTag::Boolean => write!(f, "boolean"),
            TypeTag::Null => write!(f, "null"),
            TypeTag::Record => write!(f, "record"),
            TypeTag::Tuple => write!(f, "tuple"),
            TypeTag::Any => write!(f, "any"),
            TypeTag::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Plain scalar carried by a literal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl Scalar {
    /// Runtime type tag used to pick a lift.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Scalar::Number(_) => TypeTag::Number,
            Scalar::String(_) => TypeTag::String,
            Scalar::Boolean(_) => TypeTag::Boolean,
            Scalar::Null => TypeTag::Null,
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Number(f64::from(v))
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

/// Key of a deferred property or index access.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKey {
    Field(String),
    Index(usize),
}

impl fmt::Display for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKey::Field(name) => write!(f, ".{name}"),
            AccessKey::Index(idx) => write!(f, "[{idx}]"),
        }
    }
}

/// Result of folding a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    #[default]
    Null,
    List(Vec<Value>),
    Record(IndexMap<String, Value>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Type tag of this value, for diagnostics.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Null => TypeTag::Null,
            Value::List(_) => TypeTag::Tuple,
            Value::Record(_) => TypeTag::Record,
        }
    }
}

impl From<&Scalar> for Value {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Number(v) => Value::Number(*v),
            Scalar::String(v) => Value::String(v.clone()),
            Scalar::Boolean(v) => Value::Boolean(*v),
            Scalar::Null => Value::Null,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Null => write!(f, "null"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_is_compatible_both_ways() {
        assert!(TypeTag::Any.accepts(&TypeTag::Number));
        assert!(TypeTag::Number.accepts(&TypeTag::Any));
        assert!(TypeTag::Number.accepts(&TypeTag::Number));
        assert!(!TypeTag::Number.accepts(&TypeTag::String));
        assert!(!TypeTag::Custom("date".into()).accepts(&TypeTag::Custom("time".into())));
    }

    #[test]
    fn test_value_display() {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Value::Number(1.0));
        fields.insert("tags".to_string(), Value::List(vec![Value::Boolean(true), Value::Null]));
        assert_eq!(Value::Record(fields).to_string(), "{x: 1, tags: [true, null]}");
    }
}
