//! Story refinement rounds
//!
//! The engine calls the gateway first and mutates the session only after
//! the call succeeds, so a failed request leaves the session exactly as it
//! was. For answers this means the outgoing prompt is built from a
//! provisional copy of the conversation; the real transcript is updated
//! together with the new question in one step.

use serde::Serialize;
use tracing::{debug, info};

use super::{EngineError, InFlightGate, next_persona, render_answered_history};
use crate::domain::{Persona, SKIP_ANSWER, Story};
use crate::gateway::{Operation, PromptGateway, QuestionBatchPayload, SatisfactionPayload};
use crate::session::Session;

/// Fixed reply for a rewrite requested before any question was answered
pub const NOT_ENOUGH_INFO: &str =
    "Ainda não há informações suficientes para sugerir uma nova versão da história. Responda algumas perguntas primeiro.";

/// Outcome of a story rewrite request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// A rewritten description the user may accept or discard
    Suggestion(String),
    /// No non-skipped answers exist yet; no request was made
    NotEnoughInformation,
}

#[derive(Serialize)]
struct PersonaContext {
    key: &'static str,
    name: &'static str,
    guideline: &'static str,
}

impl PersonaContext {
    fn from(persona: Persona) -> Self {
        Self {
            key: persona.key(),
            name: persona.name(),
            guideline: persona.guideline(),
        }
    }
}

#[derive(Serialize)]
struct QuestionBatchContext {
    title: String,
    description: String,
    personas: Vec<PersonaContext>,
}

#[derive(Serialize)]
struct FollowUpContext {
    persona_name: &'static str,
    guideline: &'static str,
    title: String,
    description: String,
    history: String,
}

#[derive(Serialize)]
struct RewriteContext {
    title: String,
    description: String,
    history: String,
}

#[derive(Serialize)]
struct SatisfactionContext {
    persona_name: &'static str,
    title: String,
    description: String,
    history: String,
}

#[derive(Serialize)]
struct RefinementContext {
    requirement: String,
}

/// Drives question/answer rounds for one session
pub struct PlanningEngine {
    gateway: PromptGateway,
    gate: InFlightGate,
}

impl PlanningEngine {
    pub fn new(gateway: PromptGateway) -> Self {
        Self {
            gateway,
            gate: InFlightGate::new(),
        }
    }

    pub fn gateway(&self) -> &PromptGateway {
        &self.gateway
    }

    /// Turn a raw requirement into a well-formed story
    pub async fn refine_requirement(&self, requirement: &str) -> Result<Story, EngineError> {
        let ctx = RefinementContext {
            requirement: requirement.to_string(),
        };
        let story: Story = self.gateway.json(Operation::StoryRefinement, &ctx).await?;
        Ok(story)
    }

    /// Start a round: one batched call produces an opening question per
    /// persona, and the first active persona's question seeds the transcript
    ///
    /// The remaining questions are discarded; each later persona asks from
    /// the history available at its own turn instead.
    pub async fn start_round(&self, session: &mut Session, personas: Vec<Persona>) -> Result<(), EngineError> {
        let _guard = self.gate.acquire()?;
        info!(count = personas.len(), "PlanningEngine::start_round: called");

        let first = personas
            .first()
            .copied()
            .ok_or_else(|| crate::session::SessionError::InvariantViolation("no personas selected".to_string()))?;

        let ctx = QuestionBatchContext {
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
            personas: personas.iter().map(|p| PersonaContext::from(*p)).collect(),
        };
        let batch: QuestionBatchPayload = self.gateway.json(Operation::QuestionBatch, &ctx).await?;

        let question = batch
            .questions
            .iter()
            .find(|q| Persona::parse(&q.persona) == Some(first))
            .map(|q| q.question.clone())
            .ok_or_else(|| {
                crate::gateway::GatewayError::Schema(format!("no question returned for persona {}", first.key()))
            })?;

        session.start_round(personas, (first, question))?;
        Ok(())
    }

    /// Attach the user's answer and fetch the next persona's question
    pub async fn answer(&self, session: &mut Session, text: &str) -> Result<(), EngineError> {
        self.advance(session, text).await
    }

    /// Skip the open question; the turn stays visible but is excluded from
    /// rewrite and derivation context
    pub async fn skip(&self, session: &mut Session) -> Result<(), EngineError> {
        self.advance(session, SKIP_ANSWER).await
    }

    async fn advance(&self, session: &mut Session, answer: &str) -> Result<(), EngineError> {
        let _guard = self.gate.acquire()?;
        debug!("PlanningEngine::advance: called");

        let current = session.conversation.open_question().map(|(p, _)| p).ok_or_else(|| {
            crate::session::SessionError::InvariantViolation("no open question to answer".to_string())
        })?;

        // Validate and render against a provisional transcript so a failed
        // gateway call leaves the real one untouched.
        let mut provisional = session.conversation.clone();
        provisional.answer_last(answer).map_err(crate::session::SessionError::from)?;

        let next = next_persona(&session.active_personas, current);
        let ctx = FollowUpContext {
            persona_name: next.name(),
            guideline: next.guideline(),
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
            history: provisional.render_transcript(),
        };
        let question = self.gateway.text(Operation::FollowUpQuestion, &ctx).await?;

        session.answer_current(answer)?;
        session.append_question(next, question)?;
        Ok(())
    }

    /// Request a story rewrite from the answered turns
    ///
    /// Short-circuits without a gateway call when nothing has been answered
    /// yet; a rewrite of an unquestioned story would just paraphrase it.
    pub async fn request_rewrite(&self, session: &Session) -> Result<RewriteOutcome, EngineError> {
        let _guard = self.gate.acquire()?;

        if session.conversation.answered_count() == 0 {
            info!("PlanningEngine::request_rewrite: no answered turns, short-circuiting");
            return Ok(RewriteOutcome::NotEnoughInformation);
        }

        let ctx = RewriteContext {
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
            history: render_answered_history(session.conversation.answered_pairs()),
        };
        let rewritten = self.gateway.text(Operation::StoryRewrite, &ctx).await?;
        Ok(RewriteOutcome::Suggestion(rewritten))
    }

    /// Ask whether a persona still has material open questions; marks the
    /// session when it reports none
    pub async fn check_satisfaction(&self, session: &mut Session, persona: Persona) -> Result<bool, EngineError> {
        let _guard = self.gate.acquire()?;

        let ctx = SatisfactionContext {
            persona_name: persona.name(),
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
            history: render_answered_history(session.conversation.answered_pairs()),
        };
        let payload: SatisfactionPayload = self.gateway.json(Operation::SatisfactionCheck, &ctx).await?;

        if payload.satisfied {
            let was_complete = session.all_personas_satisfied();
            session.mark_satisfied(persona);
            // The last persona to report satisfaction closes the round in
            // the transcript.
            if !was_complete && session.all_personas_satisfied() {
                session.push_round_marker(crate::session::ROUND_COMPLETED)?;
            }
        }
        debug!(persona = persona.key(), satisfied = payload.satisfied, reason = %payload.reason, "PlanningEngine::check_satisfaction");
        Ok(payload.satisfied)
    }
}
