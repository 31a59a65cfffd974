//! Session errors

use thiserror::Error;

use crate::domain::ConversationError;

/// Errors from session state transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// User-facing validation caught before any gateway call
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Programmer-facing; a correct caller never triggers these
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A conversation-advancing request is already in flight
    #[error("Another request is in progress")]
    Busy,

    #[error("No split story at index {0}")]
    NoSuchSplit(usize),

    #[error("No scenario with id {0}")]
    NoSuchScenario(u64),
}

impl From<ConversationError> for SessionError {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::EmptyAnswer => SessionError::EmptyInput("answer".to_string()),
            other => SessionError::InvariantViolation(other.to_string()),
        }
    }
}
