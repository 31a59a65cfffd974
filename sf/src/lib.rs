//! StoryForge - LLM-assisted user story and BDD refinement
//!
//! StoryForge turns raw requirements, meeting transcripts, and half-formed
//! stories into refined user stories, BDD scenarios, and test artifacts
//! through a persona-driven question loop. The model is consulted through a
//! single gateway, one operation per prompt; all state lives in the session
//! aggregate and persists as JSON between runs.
//!
//! # Core Concepts
//!
//! - **One gateway, one shot**: every model call is a single request with
//!   no implicit retry; a failure is surfaced once, operation-scoped
//! - **State first**: engines call the gateway before mutating the session,
//!   so a failed call leaves the session exactly as it was
//! - **Structural trust only**: structured replies are schema-validated;
//!   their content is the model's responsibility
//!
//! # Modules
//!
//! - [`llm`] - LLM client trait and OpenAI implementation
//! - [`gateway`] - the prompt/operation boundary to the completion service
//! - [`session`] - session aggregate, state transitions, persistence
//! - [`planning`] - persona-rotation question loops (story and BDD)
//! - [`complexity`] - complexity verdicts and story splitting
//! - [`artifacts`] - one-shot artifact derivations
//! - [`export`] - export assembly (wiki, markdown, HTML)
//! - [`wizard`] - the interactive terminal driver

pub mod artifacts;
pub mod cli;
pub mod complexity;
pub mod config;
pub mod domain;
pub mod export;
pub mod gateway;
pub mod llm;
pub mod planning;
pub mod prompts;
pub mod session;
pub mod wizard;

// Re-export commonly used types
pub use artifacts::{DerivationPipeline, GroupOutcome};
pub use complexity::ComplexityEngine;
pub use config::{Config, LlmConfig, ResolvedLlmConfig};
pub use domain::{
    ArtifactKind, ArtifactSlots, BddScenario, ComplexityAnalysis, ComplexityLevel, Conversation, OutlineSkeleton,
    Persona, ScenarioKind, StepTechnology, Story,
};
pub use export::{ExportFormat, assemble, feature_file};
pub use gateway::{GatewayError, Operation, PromptGateway};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAiClient, create_client};
pub use planning::{BddEngine, EngineError, PlanningEngine, RewriteOutcome};
pub use prompts::PromptLoader;
pub use session::{Session, SessionError, SessionMode, SessionRepository};
pub use wizard::Wizard;
