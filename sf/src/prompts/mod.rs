//! Prompt templates
//!
//! Handlebars templates, one per gateway operation, embedded at build time
//! with optional per-project overrides.

pub mod embedded;
mod loader;

pub use loader::PromptLoader;
