//! Scenario-focused BDD rounds
//!
//! The BDD loop reuses the persona-rotation rules of the story rounds but
//! runs its sub-conversation against a focused scenario (or group of
//! scenarios sharing Given context) instead of the story description.

use serde::Serialize;
use tracing::{debug, info};

use super::{EngineError, InFlightGate, next_persona};
use crate::domain::{Persona, SKIP_ANSWER};
use crate::gateway::{Operation, PromptGateway, ScenarioTitlesPayload};
use crate::session::{Session, SessionError};

#[derive(Serialize)]
struct ScenarioTitlesContext {
    feature: String,
}

#[derive(Serialize)]
struct ScenarioQuestionContext {
    persona_name: &'static str,
    guideline: &'static str,
    feature: String,
    titles: Vec<String>,
    history: String,
}

/// Drives scenario authoring for one session
pub struct BddEngine {
    gateway: PromptGateway,
    gate: InFlightGate,
}

impl BddEngine {
    pub fn new(gateway: PromptGateway) -> Self {
        Self {
            gateway,
            gate: InFlightGate::new(),
        }
    }

    pub fn gateway(&self) -> &PromptGateway {
        &self.gateway
    }

    /// Propose scenario titles for the feature, replacing any existing list
    pub async fn generate_titles(&self, session: &mut Session) -> Result<Vec<u64>, EngineError> {
        let _guard = self.gate.acquire()?;
        info!("BddEngine::generate_titles: called");

        let ctx = ScenarioTitlesContext {
            feature: session.working_text().to_string(),
        };
        let payload: ScenarioTitlesPayload = self.gateway.json(Operation::ScenarioTitles, &ctx).await?;
        if payload.scenarios.is_empty() {
            return Err(crate::gateway::GatewayError::Schema("no scenarios returned".to_string()).into());
        }

        session.scenarios.clear();
        session.scenario_focus = None;
        let ids = payload
            .scenarios
            .into_iter()
            .map(|entry| session.add_scenario(entry.title, entry.kind))
            .collect();
        Ok(ids)
    }

    /// Focus a scenario group and seed its first clarifying question
    pub async fn start_focus(
        &self,
        session: &mut Session,
        scenario_ids: Vec<u64>,
        personas: Vec<Persona>,
    ) -> Result<(), EngineError> {
        let _guard = self.gate.acquire()?;
        debug!(scenarios = scenario_ids.len(), "BddEngine::start_focus: called");

        if scenario_ids.is_empty() {
            return Err(SessionError::InvariantViolation("cannot focus an empty scenario group".to_string()).into());
        }
        let first = personas
            .first()
            .copied()
            .ok_or_else(|| SessionError::InvariantViolation("no personas selected".to_string()))?;

        // Resolve titles up front so an unknown id fails before any request.
        let mut titles = Vec::with_capacity(scenario_ids.len());
        for id in &scenario_ids {
            titles.push(
                session
                    .scenario(*id)
                    .map(|s| s.title.clone())
                    .ok_or(SessionError::NoSuchScenario(*id))?,
            );
        }

        let ctx = ScenarioQuestionContext {
            persona_name: first.name(),
            guideline: first.guideline(),
            feature: session.working_text().to_string(),
            titles,
            history: String::new(),
        };
        let question = self.gateway.text(Operation::ScenarioQuestion, &ctx).await?;

        session.active_personas = personas;
        session.focus_scenarios(scenario_ids)?;
        if let Some(focus) = session.scenario_focus.as_mut() {
            focus.conversation.push_question(first, question).map_err(SessionError::from)?;
        }
        Ok(())
    }

    /// Attach the user's answer to the focused conversation and fetch the
    /// next persona's question
    pub async fn answer(&self, session: &mut Session, text: &str) -> Result<(), EngineError> {
        self.advance(session, text).await
    }

    /// Skip the open question in the focused conversation
    pub async fn skip(&self, session: &mut Session) -> Result<(), EngineError> {
        self.advance(session, SKIP_ANSWER).await
    }

    async fn advance(&self, session: &mut Session, answer: &str) -> Result<(), EngineError> {
        let _guard = self.gate.acquire()?;

        let focus = session
            .scenario_focus
            .as_ref()
            .ok_or_else(|| SessionError::InvariantViolation("no scenario focus active".to_string()))?;
        let current = focus
            .conversation
            .open_question()
            .map(|(p, _)| p)
            .ok_or_else(|| SessionError::InvariantViolation("no open question to answer".to_string()))?;

        let mut provisional = focus.conversation.clone();
        provisional.answer_last(answer).map_err(SessionError::from)?;

        let next = next_persona(&session.active_personas, current);
        let ctx = ScenarioQuestionContext {
            persona_name: next.name(),
            guideline: next.guideline(),
            feature: session.working_text().to_string(),
            titles: session.focused_titles(),
            history: provisional.render_transcript(),
        };
        let question = self.gateway.text(Operation::ScenarioQuestion, &ctx).await?;

        if let Some(focus) = session.scenario_focus.as_mut() {
            focus.conversation.answer_last(answer).map_err(SessionError::from)?;
            focus.conversation.push_question(next, question).map_err(SessionError::from)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScenarioKind, Story};
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use crate::session::SessionMode;
    use std::sync::Arc;

    fn engine(client: MockLlmClient) -> BddEngine {
        BddEngine::new(PromptGateway::new(Arc::new(client), PromptLoader::embedded_only(), 4096))
    }

    fn session() -> Session {
        Session::submit_story(
            Story::new("Login", "Autenticação de usuários com email e senha"),
            SessionMode::Bdd,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_titles_populates_scenarios() {
        let reply = r#"{"scenarios": [
            {"title": "Login com credenciais válidas", "type": "scenario"},
            {"title": "Login com senhas inválidas", "type": "outline"}
        ]}"#;
        let eng = engine(MockLlmClient::texts(&[reply]));
        let mut s = session();

        let ids = eng.generate_titles(&mut s).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(s.scenarios[0].kind, ScenarioKind::Scenario);
        assert_eq!(s.scenarios[1].kind, ScenarioKind::Outline);
        assert!(!s.scenarios[0].completed);
    }

    #[tokio::test]
    async fn test_generate_titles_replaces_previous_list() {
        let reply = r#"{"scenarios": [{"title": "Novo cenário", "type": "scenario"}]}"#;
        let eng = engine(MockLlmClient::texts(&[reply]));
        let mut s = session();
        s.add_scenario("Cenário antigo", ScenarioKind::Scenario);

        eng.generate_titles(&mut s).await.unwrap();
        assert_eq!(s.scenarios.len(), 1);
        assert_eq!(s.scenarios[0].title, "Novo cenário");
    }

    #[tokio::test]
    async fn test_start_focus_seeds_question() {
        let eng = engine(MockLlmClient::texts(&["O que acontece após 3 falhas?"]));
        let mut s = session();
        let a = s.add_scenario("Login bloqueado", ScenarioKind::Scenario);

        eng.start_focus(&mut s, vec![a], vec![Persona::Qa]).await.unwrap();

        let focus = s.scenario_focus.as_ref().unwrap();
        assert_eq!(focus.scenario_ids, vec![a]);
        let (persona, question) = focus.conversation.open_question().unwrap();
        assert_eq!(persona, Persona::Qa);
        assert_eq!(question, "O que acontece após 3 falhas?");
    }

    #[tokio::test]
    async fn test_start_focus_unknown_id_fails_before_request() {
        let client = Arc::new(MockLlmClient::texts(&["unused"]));
        let eng = BddEngine::new(PromptGateway::new(client.clone(), PromptLoader::embedded_only(), 4096));
        let mut s = session();

        let result = eng.start_focus(&mut s, vec![42], vec![Persona::Qa]).await;
        assert!(matches!(
            result,
            Err(EngineError::Session(SessionError::NoSuchScenario(42)))
        ));
        assert_eq!(client.call_count(), 0);
        assert!(s.scenario_focus.is_none());
    }

    #[tokio::test]
    async fn test_start_focus_empty_group_fails_before_request() {
        let client = Arc::new(MockLlmClient::texts(&["unused"]));
        let eng = BddEngine::new(PromptGateway::new(client.clone(), PromptLoader::embedded_only(), 4096));
        let mut s = session();
        s.add_scenario("Login bloqueado", ScenarioKind::Scenario);

        let result = eng.start_focus(&mut s, vec![], vec![Persona::Qa]).await;

        assert!(matches!(
            result,
            Err(EngineError::Session(SessionError::InvariantViolation(_)))
        ));
        // No request was made and nothing on the session changed
        assert_eq!(client.call_count(), 0);
        assert!(s.active_personas.is_empty());
        assert!(s.scenario_focus.is_none());
    }

    #[tokio::test]
    async fn test_focus_answer_rotates_personas() {
        let eng = engine(MockLlmClient::texts(&["Q1?", "Q2?"]));
        let mut s = session();
        let a = s.add_scenario("Login bloqueado", ScenarioKind::Scenario);

        eng.start_focus(&mut s, vec![a], vec![Persona::Qa, Persona::Developer])
            .await
            .unwrap();
        eng.answer(&mut s, "Conta bloqueia por 15 minutos").await.unwrap();

        let focus = s.scenario_focus.as_ref().unwrap();
        assert_eq!(focus.conversation.len(), 2);
        assert_eq!(focus.conversation.open_question().unwrap().0, Persona::Developer);
    }

    #[tokio::test]
    async fn test_focus_answer_failure_keeps_question_open() {
        let eng = engine(MockLlmClient::with_outcomes(vec![
            Ok(crate::llm::CompletionResponse::text("Q1?")),
            Err("boom".to_string()),
        ]));
        let mut s = session();
        let a = s.add_scenario("Login bloqueado", ScenarioKind::Scenario);

        eng.start_focus(&mut s, vec![a], vec![Persona::Qa]).await.unwrap();
        assert!(eng.answer(&mut s, "resposta").await.is_err());

        let focus = s.scenario_focus.as_ref().unwrap();
        assert_eq!(focus.conversation.len(), 1);
        assert!(focus.conversation.awaiting_answer());
    }
}
