use std::fmt;

use serde::{Deserialize, Serialize};

/// A single key=value pair used to filter digests.
///
/// A query is a set of conditions combined by conjunction: a digest matches
/// when, for every condition, it carries a metadata entry with that exact
/// key and value. No other operators (OR, negation, ranges) exist.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub key: String,
    pub value: String,
}

impl Condition {
    /// Create a condition from a key and an exact value to match.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
