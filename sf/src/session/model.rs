//! Session aggregate and its state transitions
//!
//! A session holds one working story (or feature), the round-scoped
//! conversation state, and every derived artifact. All mutation goes
//! through the transition methods here; each is all-or-nothing so a failed
//! operation never leaves the session half-initialized.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionError;
use crate::domain::{
    ArtifactKind, ArtifactSlots, BddScenario, ComplexityAnalysis, Conversation, Persona, SKIP_ANSWER, ScenarioKind,
    Story,
};

/// Marker text recorded when every active persona reports satisfaction
pub const ROUND_COMPLETED: &str = "Rodada concluída";

/// What the session is refining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// User story refinement
    Story,
    /// BDD feature / scenario authoring
    Bdd,
}

/// Per-round lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Story submitted, personas not yet chosen
    Configuring,
    /// Question/answer round in progress
    InRound,
    /// Waiting for the user to pick a split story
    SelectingSplit,
}

/// Sub-conversation focused on one scenario or scenario group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioFocus {
    /// Ids of the focused scenarios (one entry for a single scenario)
    pub scenario_ids: Vec<u64>,
    pub conversation: Conversation,
}

/// One working session: story, round state, artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub mode: SessionMode,
    pub original_story: Story,
    pub phase: RoundPhase,

    // Round-scoped state, reset by reset_round()
    pub active_personas: Vec<Persona>,
    pub conversation: Conversation,
    pub satisfied_personas: BTreeSet<Persona>,
    pub suggested_story: Option<String>,
    pub complexity: Option<ComplexityAnalysis>,
    pub artifacts: ArtifactSlots,
    pub scenarios: Vec<BddScenario>,
    pub scenario_focus: Option<ScenarioFocus>,
    next_scenario_id: u64,

    /// Split-story queue; survives round resets so the selection screen can
    /// be revisited after a child story round completes
    pub split_queue: Vec<Story>,
}

impl Session {
    /// Create a session from a submitted story
    ///
    /// Validates the input before any state exists; an empty title or
    /// description never produces a session.
    pub fn submit_story(story: Story, mode: SessionMode) -> Result<Self, SessionError> {
        if story.title.trim().is_empty() {
            return Err(SessionError::EmptyInput("story title".to_string()));
        }
        if story.description.trim().is_empty() {
            return Err(SessionError::EmptyInput("story description".to_string()));
        }
        Ok(Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            mode,
            original_story: story,
            phase: RoundPhase::Configuring,
            active_personas: Vec::new(),
            conversation: Conversation::new(),
            satisfied_personas: BTreeSet::new(),
            suggested_story: None,
            complexity: None,
            artifacts: ArtifactSlots::new(),
            scenarios: Vec::new(),
            scenario_focus: None,
            next_scenario_id: 0,
            split_queue: Vec::new(),
        })
    }

    /// The current working text: accepted suggestion, else the original
    /// description. The title always comes from the original story.
    pub fn working_text(&self) -> &str {
        self.suggested_story.as_deref().unwrap_or(&self.original_story.description)
    }

    /// Clear all round-scoped state, preserving the split queue
    pub fn reset_round(&mut self) {
        self.active_personas.clear();
        self.conversation = Conversation::new();
        self.satisfied_personas.clear();
        self.suggested_story = None;
        self.complexity = None;
        self.artifacts.clear();
        self.scenarios.clear();
        self.scenario_focus = None;
        self.next_scenario_id = 0;
        self.phase = RoundPhase::Configuring;
    }

    /// Begin a round: install personas and seed the first question
    ///
    /// The caller obtains `first_question` from the gateway BEFORE invoking
    /// this, so a failed gateway call leaves the session untouched.
    pub fn start_round(
        &mut self,
        personas: Vec<Persona>,
        first_question: (Persona, String),
    ) -> Result<(), SessionError> {
        if personas.is_empty() {
            return Err(SessionError::InvariantViolation(
                "cannot start a round with zero personas".to_string(),
            ));
        }
        if !personas.contains(&first_question.0) {
            return Err(SessionError::InvariantViolation(
                "first question persona is not active".to_string(),
            ));
        }

        self.active_personas = personas;
        self.conversation = Conversation::new();
        self.satisfied_personas.clear();
        self.suggested_story = None;
        self.conversation.push_question(first_question.0, first_question.1)?;
        self.phase = RoundPhase::InRound;
        Ok(())
    }

    /// Attach an answer to the open question
    pub fn answer_current(&mut self, text: &str) -> Result<(), SessionError> {
        self.conversation.answer_last(text)?;
        Ok(())
    }

    /// Append the next persona's question
    pub fn append_question(&mut self, persona: Persona, question: String) -> Result<(), SessionError> {
        if !self.active_personas.contains(&persona) {
            return Err(SessionError::InvariantViolation(format!(
                "persona {} is not active this round",
                persona
            )));
        }
        self.conversation.push_question(persona, question)?;
        Ok(())
    }

    /// Store an accepted story rewrite
    pub fn accept_suggestion(&mut self, text: String) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput("suggestion".to_string()));
        }
        self.suggested_story = Some(text);
        Ok(())
    }

    /// Clear the suggestion; idempotent, a no-op when none exists
    pub fn discard_suggestion(&mut self) {
        self.suggested_story = None;
    }

    /// Record that a persona reported no open questions this round
    pub fn mark_satisfied(&mut self, persona: Persona) {
        self.satisfied_personas.insert(persona);
    }

    /// Whether every active persona is satisfied (gates suggestion/gherkin
    /// actions in the UI; does not block the question flow)
    pub fn all_personas_satisfied(&self) -> bool {
        !self.active_personas.is_empty()
            && self.active_personas.iter().all(|p| self.satisfied_personas.contains(p))
    }

    /// Active personas that have not reported satisfaction this round
    pub fn unsatisfied_personas(&self) -> Vec<Persona> {
        self.active_personas
            .iter()
            .copied()
            .filter(|p| !self.satisfied_personas.contains(p))
            .collect()
    }

    /// Close the round in the transcript with a marker turn
    ///
    /// A still-open question is recorded as skipped first, keeping the
    /// at-most-last-turn-unanswered invariant intact.
    pub fn push_round_marker(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        if self.conversation.awaiting_answer() {
            self.conversation.answer_last(SKIP_ANSWER)?;
        }
        self.conversation.push_marker(text)?;
        Ok(())
    }

    /// Move split candidates into the queue and enter selection
    pub fn accept_split(&mut self) -> Result<(), SessionError> {
        let candidates = self
            .complexity
            .as_ref()
            .map(|a| a.split_candidates().to_vec())
            .unwrap_or_default();
        if candidates.is_empty() {
            return Err(SessionError::InvariantViolation(
                "no split available: complexity verdict is not Alta".to_string(),
            ));
        }
        self.split_queue = candidates;
        self.phase = RoundPhase::SelectingSplit;
        Ok(())
    }

    /// Install a queued split story as the working story
    ///
    /// Resets all round-scoped state; the queue itself survives so the
    /// selection screen can be revisited for the remaining siblings.
    pub fn select_split(&mut self, index: usize) -> Result<(), SessionError> {
        let story = self.split_queue.get(index).cloned().ok_or(SessionError::NoSuchSplit(index))?;
        self.reset_round();
        self.original_story = story;
        Ok(())
    }

    /// Replace the split queue (transcript intake uses this too)
    pub fn set_split_queue(&mut self, stories: Vec<Story>) {
        self.split_queue = stories;
        self.phase = RoundPhase::SelectingSplit;
    }

    /// Add a scenario to the feature, returning its id
    pub fn add_scenario(&mut self, title: impl Into<String>, kind: ScenarioKind) -> u64 {
        let id = self.next_scenario_id;
        self.next_scenario_id += 1;
        self.scenarios.push(BddScenario::new(id, title, kind));
        id
    }

    pub fn scenario(&self, id: u64) -> Option<&BddScenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn scenario_mut(&mut self, id: u64) -> Option<&mut BddScenario> {
        self.scenarios.iter_mut().find(|s| s.id == id)
    }

    /// Store generated gherkin for a scenario and mark it completed
    pub fn complete_scenario(&mut self, id: u64, gherkin: String) -> Result<(), SessionError> {
        let scenario = self.scenario_mut(id).ok_or(SessionError::NoSuchScenario(id))?;
        scenario.gherkin = Some(gherkin);
        scenario.completed = true;
        Ok(())
    }

    /// Focus a scenario group for a clarifying sub-conversation
    pub fn focus_scenarios(&mut self, scenario_ids: Vec<u64>) -> Result<(), SessionError> {
        for id in &scenario_ids {
            if self.scenario(*id).is_none() {
                return Err(SessionError::NoSuchScenario(*id));
            }
        }
        if scenario_ids.is_empty() {
            return Err(SessionError::InvariantViolation(
                "cannot focus an empty scenario group".to_string(),
            ));
        }
        self.scenario_focus = Some(ScenarioFocus {
            scenario_ids,
            conversation: Conversation::new(),
        });
        Ok(())
    }

    /// Titles of the focused scenarios, in focus order
    pub fn focused_titles(&self) -> Vec<String> {
        self.scenario_focus
            .as_ref()
            .map(|f| {
                f.scenario_ids
                    .iter()
                    .filter_map(|id| self.scenario(*id).map(|s| s.title.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record a completed artifact derivation
    pub fn record_artifact(&mut self, kind: ArtifactKind, value: String) {
        self.artifacts.record(kind, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComplexityLevel, SKIP_ANSWER};

    fn session() -> Session {
        Session::submit_story(
            Story::new("Reset password", "Como usuário, quero redefinir minha senha..."),
            SessionMode::Story,
        )
        .unwrap()
    }

    #[test]
    fn test_submit_story_validates_input() {
        assert!(matches!(
            Session::submit_story(Story::new("", "desc"), SessionMode::Story),
            Err(SessionError::EmptyInput(_))
        ));
        assert!(matches!(
            Session::submit_story(Story::new("title", "  "), SessionMode::Story),
            Err(SessionError::EmptyInput(_))
        ));
        assert_eq!(session().phase, RoundPhase::Configuring);
    }

    #[test]
    fn test_working_text_prefers_suggestion() {
        let mut s = session();
        assert_eq!(s.working_text(), "Como usuário, quero redefinir minha senha...");
        s.accept_suggestion("Nova descrição".to_string()).unwrap();
        assert_eq!(s.working_text(), "Nova descrição");
        // Title always comes from the original
        assert_eq!(s.original_story.title, "Reset password");
    }

    #[test]
    fn test_discard_suggestion_idempotent() {
        let mut s = session();
        s.discard_suggestion();
        assert!(s.suggested_story.is_none());
        s.accept_suggestion("x".to_string()).unwrap();
        s.discard_suggestion();
        s.discard_suggestion();
        assert!(s.suggested_story.is_none());
    }

    #[test]
    fn test_start_round_requires_personas() {
        let mut s = session();
        let err = s.start_round(vec![], (Persona::Developer, "Q".to_string()));
        assert!(matches!(err, Err(SessionError::InvariantViolation(_))));
        // Session unchanged
        assert_eq!(s.phase, RoundPhase::Configuring);
        assert!(s.conversation.is_empty());
    }

    #[test]
    fn test_start_round_seeds_single_turn() {
        let mut s = session();
        s.start_round(
            vec![Persona::Developer, Persona::Qa],
            (Persona::Developer, "Qual o fluxo?".to_string()),
        )
        .unwrap();
        assert_eq!(s.phase, RoundPhase::InRound);
        assert_eq!(s.conversation.len(), 1);
        assert_eq!(s.conversation.open_question().unwrap().0, Persona::Developer);
    }

    #[test]
    fn test_append_question_rejects_inactive_persona() {
        let mut s = session();
        s.start_round(vec![Persona::Developer], (Persona::Developer, "Q1".to_string()))
            .unwrap();
        s.answer_current("A1").unwrap();
        let err = s.append_question(Persona::Ux, "Q2".to_string());
        assert!(matches!(err, Err(SessionError::InvariantViolation(_))));
    }

    #[test]
    fn test_satisfaction_gating() {
        let mut s = session();
        s.start_round(
            vec![Persona::Developer, Persona::Qa],
            (Persona::Developer, "Q1".to_string()),
        )
        .unwrap();
        assert!(!s.all_personas_satisfied());
        s.mark_satisfied(Persona::Developer);
        assert!(!s.all_personas_satisfied());
        s.mark_satisfied(Persona::Qa);
        assert!(s.all_personas_satisfied());
    }

    #[test]
    fn test_unsatisfied_personas_lists_remaining() {
        let mut s = session();
        s.start_round(
            vec![Persona::Developer, Persona::Qa],
            (Persona::Developer, "Q1".to_string()),
        )
        .unwrap();
        assert_eq!(s.unsatisfied_personas(), vec![Persona::Developer, Persona::Qa]);
        s.mark_satisfied(Persona::Developer);
        assert_eq!(s.unsatisfied_personas(), vec![Persona::Qa]);
        s.mark_satisfied(Persona::Qa);
        assert!(s.unsatisfied_personas().is_empty());
    }

    #[test]
    fn test_round_marker_skip_closes_open_question() {
        let mut s = session();
        s.start_round(vec![Persona::Developer], (Persona::Developer, "Q1".to_string()))
            .unwrap();
        assert!(s.conversation.awaiting_answer());

        s.push_round_marker(ROUND_COMPLETED).unwrap();

        // The open question was closed as skipped, then the marker appended
        assert!(!s.conversation.awaiting_answer());
        assert_eq!(s.conversation.len(), 2);
        assert_eq!(s.conversation.answered_count(), 0);
        assert!(s.conversation.render_transcript().contains(ROUND_COMPLETED));
        // The transcript is still answerable going forward
        s.append_question(Persona::Developer, "Q2".to_string()).unwrap();
        s.answer_current("A2").unwrap();
    }

    #[test]
    fn test_accept_split_requires_high_verdict() {
        let mut s = session();
        s.complexity = Some(ComplexityAnalysis {
            complexity: ComplexityLevel::Medium,
            justification: "ok".to_string(),
            suggested_stories: vec![Story::new("S1", "d1")],
        });
        assert!(s.accept_split().is_err());

        s.complexity = Some(ComplexityAnalysis {
            complexity: ComplexityLevel::High,
            justification: "big".to_string(),
            suggested_stories: vec![Story::new("S1", "d1"), Story::new("S2", "d2")],
        });
        s.accept_split().unwrap();
        assert_eq!(s.split_queue.len(), 2);
        assert_eq!(s.phase, RoundPhase::SelectingSplit);
    }

    #[test]
    fn test_select_split_resets_round_and_keeps_queue() {
        let mut s = session();
        s.start_round(vec![Persona::Developer], (Persona::Developer, "Q1".to_string()))
            .unwrap();
        s.answer_current("A1").unwrap();
        s.accept_suggestion("sugestão".to_string()).unwrap();
        s.set_split_queue(vec![Story::new("S1", "d1"), Story::new("S2", "d2")]);

        s.select_split(0).unwrap();
        assert_eq!(s.original_story.title, "S1");
        assert!(s.conversation.is_empty());
        assert!(s.suggested_story.is_none());
        assert!(s.active_personas.is_empty());
        assert_eq!(s.split_queue.len(), 2);
        assert_eq!(s.phase, RoundPhase::Configuring);
    }

    #[test]
    fn test_select_split_out_of_range() {
        let mut s = session();
        s.set_split_queue(vec![Story::new("S1", "d1")]);
        assert_eq!(s.select_split(3), Err(SessionError::NoSuchSplit(3)));
    }

    #[test]
    fn test_scenario_ids_monotonic() {
        let mut s = session();
        let a = s.add_scenario("Login ok", ScenarioKind::Scenario);
        let b = s.add_scenario("Login fails", ScenarioKind::Scenario);
        assert!(a < b);
        assert_eq!(s.scenario(a).unwrap().title, "Login ok");
    }

    #[test]
    fn test_focus_scenarios_validates_ids() {
        let mut s = session();
        let a = s.add_scenario("Login ok", ScenarioKind::Scenario);
        assert!(s.focus_scenarios(vec![a, 99]).is_err());
        assert!(s.focus_scenarios(vec![]).is_err());
        s.focus_scenarios(vec![a]).unwrap();
        assert_eq!(s.focused_titles(), vec!["Login ok"]);
    }

    #[test]
    fn test_serde_round_trip_full_session() {
        let mut s = session();
        s.start_round(
            vec![Persona::Developer, Persona::Qa],
            (Persona::Developer, "Q1".to_string()),
        )
        .unwrap();
        s.answer_current(SKIP_ANSWER).unwrap();
        s.add_scenario("Login ok", ScenarioKind::Scenario);
        s.record_artifact(ArtifactKind::Checklist, "## Clareza".to_string());
        s.set_split_queue(vec![Story::new("S1", "d1")]);

        let json = serde_json::to_string(&s).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, s.id);
        assert_eq!(back.conversation, s.conversation);
        assert_eq!(back.scenarios, s.scenarios);
        assert_eq!(back.split_queue, s.split_queue);
        assert_eq!(back.artifacts.value(ArtifactKind::Checklist), Some("## Clareza"));
    }
}
