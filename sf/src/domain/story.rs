//! Story types

use serde::{Deserialize, Serialize};

/// A user story (or feature description in BDD mode)
///
/// Immutable once handed to the gateway for a given prompt; mutated only by
/// explicit user edit or acceptance of a suggested rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub description: String,
}

impl Story {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Whether both fields carry non-whitespace content
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}
