//! Node identifiers and deterministic id minting.
//!
//! Identifiers are strings over `a..=z` interpreted as a bijective base-26
//! counter: `a, b, ..., z, aa, ab, ..., zz, aaa, ...`. Strings never overflow,
//! so graphs of any size get unique ids without a numeric width limit.
//!
//! Alias keys share the identifier space but are prefixed with `@` and are
//! never produced by the generator.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix marking an alias key in the adjacency map.
pub const ALIAS_PREFIX: char = '@';

/// Identifier of one entry in a normalized graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Key under which the alias `name` is stored (`@name`).
    pub fn alias(name: &str) -> Self {
        Self(format!("{ALIAS_PREFIX}{name}"))
    }

    /// Whether this key names an alias entry rather than a structural node.
    pub fn is_alias(&self) -> bool {
        self.0.starts_with(ALIAS_PREFIX)
    }

    /// Alias name without the `@` prefix, if this is an alias key.
    pub fn alias_name(&self) -> Option<&str> {
        self.0.strip_prefix(ALIAS_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Issue order: shorter ids first, then lexicographic.
impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

/// Base-26 increment with carry.
///
/// `""` → `"a"`, `"z"` → `"aa"`, `"az"` → `"ba"`, `"zz"` → `"aaa"`.
/// Characters outside `a..=z` are treated as `a`.
pub fn increment(current: &str) -> String {
    let mut digits: Vec<char> = current.chars().collect();

    for digit in digits.iter_mut().rev() {
        match *digit {
            'z' => *digit = 'a',
            'a'..='y' => {
                *digit = char::from(*digit as u8 + 1);
                return digits.into_iter().collect();
            }
            _ => {
                *digit = 'b';
                return digits.into_iter().collect();
            }
        }
    }

    // Every position carried (or the input was empty).
    digits.insert(0, 'a');
    digits.into_iter().collect()
}

/// Cursor over the identifier sequence.
///
/// Holds the *next* id to hand out, so a fresh cursor issues `a` first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdCursor(String);

impl Default for IdCursor {
    fn default() -> Self {
        Self("a".to_string())
    }
}

impl IdCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from an explicit next id.
    pub fn starting_at(next: &str) -> Self {
        Self(next.to_string())
    }

    /// The id the next call to [`IdCursor::issue`] will return.
    pub fn peek(&self) -> NodeId {
        NodeId(self.0.clone())
    }

    /// Hand out the current id and advance.
    pub fn issue(&mut self) -> NodeId {
        let next = increment(&self.0);
        NodeId(std::mem::replace(&mut self.0, next))
    }
}
