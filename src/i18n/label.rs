use crate::cache::content_hash;
use crate::error::{Error, Result};
use std::fmt;

/// Identifier of a label row: a positive integer or a non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelKey {
    Id(i64),
    Name(String),
}

impl LabelKey {
    pub fn validate(&self) -> Result<()> {
        match self {
            LabelKey::Id(id) if *id <= 0 => Err(Error::InvalidArgument(format!(
                "Invalid label id {id}, label ids must be greater than zero."
            ))),
            LabelKey::Name(name) if name.is_empty() => Err(Error::InvalidArgument(
                "Invalid label, label names cannot be empty.".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Segment used inside cache keys; string keys are hashed so arbitrary
    /// text cannot break the key layout.
    pub(crate) fn cache_segment(&self) -> String {
        match self {
            LabelKey::Id(id) => id.to_string(),
            LabelKey::Name(name) => content_hash(name),
        }
    }
}

impl From<i64> for LabelKey {
    fn from(id: i64) -> Self {
        LabelKey::Id(id)
    }
}

impl From<&str> for LabelKey {
    fn from(name: &str) -> Self {
        LabelKey::Name(name.to_string())
    }
}

impl From<String> for LabelKey {
    fn from(name: String) -> Self {
        LabelKey::Name(name)
    }
}

impl fmt::Display for LabelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelKey::Id(id) => write!(f, "{id}"),
            LabelKey::Name(name) => f.write_str(name),
        }
    }
}
