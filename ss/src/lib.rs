//! SessionStore - generic persistent JSON document store
//!
//! Stores serde-serializable documents as pretty-printed JSON files in a
//! directory, one file per document id. Writes go through a temp file and
//! an atomic rename so a crash mid-write never leaves a truncated document.
//!
//! The store is intentionally schema-agnostic: callers decide what a
//! document is. StoryForge uses it for its session list.

mod store;

pub use store::{DirStore, Entry, StoreError};
