//! Session state store
//!
//! The session aggregate, its atomic state transitions, and persistence.

mod error;
mod model;
mod repository;

pub use error::SessionError;
pub use model::{ROUND_COMPLETED, RoundPhase, ScenarioFocus, Session, SessionMode};
pub use repository::{SessionRepository, SessionSummary};
