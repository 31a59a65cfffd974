//! Domain model: stories, personas, conversations, scenarios, artifacts

mod artifact;
mod complexity;
mod conversation;
mod persona;
mod scenario;
mod story;

pub use artifact::{ArtifactKind, ArtifactSlot, ArtifactSlots, RequestStatus, StepTechnology};
pub use complexity::{ComplexityAnalysis, ComplexityLevel};
pub use conversation::{AnsweredPair, Conversation, ConversationError, SKIP_ANSWER, Turn, TurnEntry};
pub use persona::Persona;
pub use scenario::{BddScenario, OutlineSkeleton, ScenarioKind, placeholder_order};
pub use story::Story;
