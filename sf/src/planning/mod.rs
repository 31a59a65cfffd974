//! Planning Conversation Engine
//!
//! Drives the persona-rotation question/answer loops: story refinement
//! rounds ([`PlanningEngine`]) and scenario-focused BDD rounds
//! ([`BddEngine`]). Rotation is an externally-terminated infinite
//! round-robin: a round has no fixed length and ends only when the user
//! requests a rewrite or generates Gherkin.

mod bdd;
mod round;

pub use bdd::BddEngine;
pub use round::{NOT_ENOUGH_INFO, PlanningEngine, RewriteOutcome};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::domain::{AnsweredPair, Persona};
use crate::gateway::GatewayError;
use crate::session::SessionError;

/// Errors from conversation engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Strict round-robin over the active personas
///
/// Independent of how many turns each persona has already had; when the
/// current persona is somehow not active (stale state), rotation restarts
/// at the first active persona.
pub fn next_persona(active: &[Persona], current: Persona) -> Persona {
    match active.iter().position(|p| *p == current) {
        Some(idx) => active[(idx + 1) % active.len()],
        None => active[0],
    }
}

/// Render skip-filtered answered pairs for rewrite/derivation prompts
pub(crate) fn render_answered_history<'a>(pairs: impl Iterator<Item = AnsweredPair<'a>>) -> String {
    let mut out = String::new();
    for pair in pairs {
        out.push_str(&format!("[{}] {}\n> {}\n", pair.persona, pair.question, pair.answer));
    }
    out
}

/// Single in-flight gate for conversation-advancing requests
///
/// Concurrent submissions are rejected, never queued: queuing would allow
/// divergent conversation branches.
#[derive(Default)]
pub(crate) struct InFlightGate {
    busy: Arc<AtomicBool>,
}

impl InFlightGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the gate; fails with [`SessionError::Busy`] when a request
    /// is already in flight
    pub fn acquire(&self) -> Result<InFlightGuard, SessionError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Busy);
        }
        Ok(InFlightGuard {
            busy: Arc::clone(&self.busy),
        })
    }
}

/// RAII guard releasing the in-flight gate on drop
pub(crate) struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
