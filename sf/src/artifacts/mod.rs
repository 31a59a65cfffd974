//! Artifact Derivation Pipeline
//!
//! One-shot derivations from session state into artifact slots (test
//! scenarios, prototypes, checklists, step definitions, transcript
//! analysis) and into scenario gherkin. Slots are independent; a failed
//! derivation marks its own slot and touches nothing else.

mod pipeline;

pub use pipeline::{DerivationPipeline, GroupOutcome};
