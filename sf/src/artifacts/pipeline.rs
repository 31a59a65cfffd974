//! Derivation pipeline implementation
//!
//! Every slot-producing method follows the same shape: mark the slot in
//! flight, make one gateway call, then record the value or the failure on
//! that slot alone. Gherkin derivations write into the scenario list
//! instead of a slot.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{ArtifactKind, OutlineSkeleton, StepTechnology, Story};
use crate::export;
use crate::gateway::{
    GatewayError, GherkinGroupPayload, Operation, PromptGateway, TableColumnsPayload, TranscriptStoriesPayload,
};
use crate::planning::EngineError;
use crate::session::{Session, SessionError};

/// Result of a grouped gherkin derivation
///
/// Unmatched titles stay pending rather than failing the whole batch; the
/// caller decides whether to retry them individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOutcome {
    pub completed: Vec<u64>,
    pub unmatched: Vec<String>,
}

#[derive(Serialize)]
struct StoryContext {
    title: String,
    description: String,
}

#[derive(Serialize)]
struct GherkinSingleContext {
    feature: String,
    title: String,
    history: String,
}

#[derive(Serialize)]
struct GherkinGroupContext {
    feature: String,
    titles: Vec<String>,
    history: String,
}

#[derive(Serialize)]
struct OutlineContext {
    feature: String,
    title: String,
}

#[derive(Serialize)]
struct PrototypeStoryContext {
    title: String,
    description: String,
    style_snippet: Option<String>,
}

#[derive(Serialize)]
struct PrototypeFeatureContext {
    feature_file: String,
    style_snippet: Option<String>,
}

#[derive(Serialize)]
struct StepDefinitionsContext {
    feature_file: String,
    technology: &'static str,
    conventions: &'static str,
}

#[derive(Serialize)]
struct TranscriptContext {
    transcript: String,
}

#[derive(Serialize)]
struct TableColumnsContext {
    template: String,
}

/// Derives artifacts from session state, one gateway call per artifact
pub struct DerivationPipeline {
    gateway: PromptGateway,
}

impl DerivationPipeline {
    pub fn new(gateway: PromptGateway) -> Self {
        Self { gateway }
    }

    /// Derive the test scenario list from the working story
    pub async fn test_scenarios(&self, session: &mut Session) -> Result<String, EngineError> {
        let ctx = StoryContext {
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
        };
        self.fill_slot(session, ArtifactKind::TestScenarios, Operation::TestScenarios, &ctx)
            .await
    }

    /// Derive the PO readiness checklist from the working story
    pub async fn checklist(&self, session: &mut Session) -> Result<String, EngineError> {
        let ctx = StoryContext {
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
        };
        self.fill_slot(session, ArtifactKind::Checklist, Operation::Checklist, &ctx).await
    }

    /// Derive an HTML prototype from the working story
    pub async fn prototype_from_story(
        &self,
        session: &mut Session,
        style_snippet: Option<String>,
    ) -> Result<String, EngineError> {
        let ctx = PrototypeStoryContext {
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
            style_snippet,
        };
        self.fill_slot(session, ArtifactKind::Prototype, Operation::PrototypeFromStory, &ctx)
            .await
    }

    /// Derive an HTML prototype from the assembled feature file
    pub async fn prototype_from_feature(
        &self,
        session: &mut Session,
        style_snippet: Option<String>,
    ) -> Result<String, EngineError> {
        let ctx = PrototypeFeatureContext {
            feature_file: export::feature_file(session),
            style_snippet,
        };
        self.fill_slot(session, ArtifactKind::Prototype, Operation::PrototypeFromFeature, &ctx)
            .await
    }

    /// Derive step definitions for the assembled feature file
    pub async fn step_definitions(
        &self,
        session: &mut Session,
        technology: StepTechnology,
    ) -> Result<String, EngineError> {
        let ctx = StepDefinitionsContext {
            feature_file: export::feature_file(session),
            technology: technology.name(),
            conventions: technology.conventions(),
        };
        self.fill_slot(session, ArtifactKind::StepDefinitions, Operation::StepDefinitions, &ctx)
            .await
    }

    /// Analyze a meeting transcript into the fixed-heading report
    pub async fn transcript_analysis(&self, session: &mut Session, transcript: &str) -> Result<String, EngineError> {
        if transcript.trim().is_empty() {
            return Err(SessionError::EmptyInput("transcript".to_string()).into());
        }
        let ctx = TranscriptContext {
            transcript: transcript.to_string(),
        };
        self.fill_slot(session, ArtifactKind::TranscriptAnalysis, Operation::TranscriptAnalysis, &ctx)
            .await
    }

    /// Extract user stories from a meeting transcript
    pub async fn transcript_stories(&self, transcript: &str) -> Result<Vec<Story>, EngineError> {
        if transcript.trim().is_empty() {
            return Err(SessionError::EmptyInput("transcript".to_string()).into());
        }
        let ctx = TranscriptContext {
            transcript: transcript.to_string(),
        };
        let payload: TranscriptStoriesPayload = self.gateway.json(Operation::TranscriptStories, &ctx).await?;
        let stories: Vec<Story> = payload.stories.into_iter().filter(|s| s.is_valid()).collect();
        if stories.is_empty() {
            return Err(GatewayError::Schema("no usable stories extracted".to_string()).into());
        }
        Ok(stories)
    }

    /// Generate gherkin for a single scenario and mark it completed
    pub async fn gherkin_single(&self, session: &mut Session, scenario_id: u64) -> Result<(), EngineError> {
        let title = session
            .scenario(scenario_id)
            .map(|s| s.title.clone())
            .ok_or(SessionError::NoSuchScenario(scenario_id))?;
        debug!(%scenario_id, "DerivationPipeline::gherkin_single: called");

        let ctx = GherkinSingleContext {
            feature: session.working_text().to_string(),
            title,
            history: focus_history(session, scenario_id),
        };
        let gherkin = self.gateway.text(Operation::GherkinSingle, &ctx).await?;
        session.complete_scenario(scenario_id, gherkin)?;
        Ok(())
    }

    /// Generate gherkin for a scenario group in one call
    ///
    /// Replies are matched back by exact title; a reply whose title matches
    /// no requested scenario is dropped, and requested scenarios without a
    /// matching reply stay pending.
    pub async fn gherkin_group(&self, session: &mut Session, scenario_ids: &[u64]) -> Result<GroupOutcome, EngineError> {
        let mut titles = Vec::with_capacity(scenario_ids.len());
        for id in scenario_ids {
            titles.push(
                session
                    .scenario(*id)
                    .map(|s| s.title.clone())
                    .ok_or(SessionError::NoSuchScenario(*id))?,
            );
        }
        if titles.is_empty() {
            return Err(SessionError::InvariantViolation("empty scenario group".to_string()).into());
        }

        let ctx = GherkinGroupContext {
            feature: session.working_text().to_string(),
            titles: titles.clone(),
            history: group_history(session, scenario_ids),
        };
        let payload: GherkinGroupPayload = self.gateway.json(Operation::GherkinGroup, &ctx).await?;

        let mut completed = Vec::new();
        for entry in payload.scenarios {
            let matched = scenario_ids
                .iter()
                .find(|id| session.scenario(**id).map(|s| s.title == entry.title).unwrap_or(false));
            match matched {
                Some(id) => {
                    session.complete_scenario(*id, entry.gherkin)?;
                    completed.push(*id);
                }
                None => {
                    warn!(title = %entry.title, "DerivationPipeline::gherkin_group: reply title matches no scenario");
                }
            }
        }

        let unmatched: Vec<String> = scenario_ids
            .iter()
            .filter(|id| !completed.contains(id))
            .filter_map(|id| session.scenario(*id).map(|s| s.title.clone()))
            .collect();
        info!(
            completed = completed.len(),
            unmatched = unmatched.len(),
            "DerivationPipeline::gherkin_group: done"
        );
        Ok(GroupOutcome { completed, unmatched })
    }

    /// Generate a scenario-outline skeleton with normalized header order
    pub async fn outline_skeleton(&self, session: &Session, scenario_id: u64) -> Result<OutlineSkeleton, EngineError> {
        let title = session
            .scenario(scenario_id)
            .map(|s| s.title.clone())
            .ok_or(SessionError::NoSuchScenario(scenario_id))?;

        let ctx = OutlineContext {
            feature: session.working_text().to_string(),
            title,
        };
        let payload: crate::gateway::OutlineSkeletonPayload =
            self.gateway.json(Operation::OutlineSkeleton, &ctx).await?;

        // Header order comes from the template, not from the reply.
        Ok(OutlineSkeleton::normalized(payload.template, payload.headers))
    }

    /// Extract example-table column names from an outline template
    pub async fn table_columns(&self, template: &str) -> Result<Vec<String>, EngineError> {
        let ctx = TableColumnsContext {
            template: template.to_string(),
        };
        let payload: TableColumnsPayload = self.gateway.json(Operation::TableColumns, &ctx).await?;
        Ok(payload.columns)
    }

    /// Attach a filled example table to an outline skeleton and store the
    /// assembled block as the scenario's gherkin
    ///
    /// Rows are validated against the skeleton's header count; no gateway
    /// call is involved.
    pub fn complete_outline(
        &self,
        session: &mut Session,
        scenario_id: u64,
        skeleton: &OutlineSkeleton,
        rows: &[Vec<String>],
    ) -> Result<(), EngineError> {
        if rows.is_empty() {
            return Err(SessionError::EmptyInput("example table rows".to_string()).into());
        }
        for row in rows {
            if row.len() != skeleton.headers.len() {
                return Err(SessionError::InvariantViolation(format!(
                    "example row has {} cells, outline has {} columns",
                    row.len(),
                    skeleton.headers.len()
                ))
                .into());
            }
        }

        let mut block = skeleton.template.trim_end().to_string();
        block.push_str("\n\n  Examples:\n");
        block.push_str(&format!("    | {} |\n", skeleton.headers.join(" | ")));
        for row in rows {
            block.push_str(&format!("    | {} |\n", row.join(" | ")));
        }

        session.complete_scenario(scenario_id, block)?;
        Ok(())
    }

    /// Run one slot derivation with in-flight/done/failed status tracking
    async fn fill_slot<C: Serialize>(
        &self,
        session: &mut Session,
        kind: ArtifactKind,
        op: Operation,
        ctx: &C,
    ) -> Result<String, EngineError> {
        debug!(artifact = kind.name(), "DerivationPipeline::fill_slot: called");
        session.artifacts.mark_in_flight(kind);

        match self.gateway.text(op, ctx).await {
            Ok(value) => {
                session.artifacts.record(kind, value.clone());
                Ok(value)
            }
            Err(e) => {
                warn!(artifact = kind.name(), error = %e, "DerivationPipeline::fill_slot: failed");
                session.artifacts.record_failure(kind, e.to_string());
                Err(e.into())
            }
        }
    }
}

/// Skip-filtered history of the focus conversation when it covers the
/// given scenario, empty otherwise
fn focus_history(session: &Session, scenario_id: u64) -> String {
    group_history(session, &[scenario_id])
}

fn group_history(session: &Session, scenario_ids: &[u64]) -> String {
    let Some(focus) = session.scenario_focus.as_ref() else {
        return String::new();
    };
    if !scenario_ids.iter().all(|id| focus.scenario_ids.contains(id)) {
        return String::new();
    }
    crate::planning::render_answered_history(focus.conversation.answered_pairs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RequestStatus, ScenarioKind};
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use crate::session::SessionMode;
    use std::sync::Arc;

    fn pipeline(client: MockLlmClient) -> DerivationPipeline {
        DerivationPipeline::new(PromptGateway::new(Arc::new(client), PromptLoader::embedded_only(), 4096))
    }

    fn session() -> Session {
        Session::submit_story(
            Story::new("Login", "Autenticação de usuários com email e senha"),
            SessionMode::Bdd,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_slot_derivation_records_value() {
        let pipe = pipeline(MockLlmClient::texts(&["1. Login com sucesso\n2. Senha errada"]));
        let mut s = session();

        let out = pipe.test_scenarios(&mut s).await.unwrap();
        assert!(out.starts_with("1."));
        assert_eq!(s.artifacts.value(ArtifactKind::TestScenarios), Some(out.as_str()));
        assert_eq!(s.artifacts.get(ArtifactKind::TestScenarios).status, RequestStatus::Done);
    }

    #[tokio::test]
    async fn test_failed_slot_keeps_other_slots() {
        let pipe = pipeline(MockLlmClient::with_outcomes(vec![
            Ok(crate::llm::CompletionResponse::text("## Clareza\n- ok")),
            Err("down".to_string()),
        ]));
        let mut s = session();

        pipe.checklist(&mut s).await.unwrap();
        assert!(pipe.test_scenarios(&mut s).await.is_err());

        assert_eq!(s.artifacts.value(ArtifactKind::Checklist), Some("## Clareza\n- ok"));
        assert!(matches!(
            s.artifacts.get(ArtifactKind::TestScenarios).status,
            RequestStatus::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_gherkin_single_completes_scenario() {
        let pipe = pipeline(MockLlmClient::texts(&["Scenario: Login ok\n  Given a user\n  When login\n  Then home"]));
        let mut s = session();
        let id = s.add_scenario("Login ok", ScenarioKind::Scenario);

        pipe.gherkin_single(&mut s, id).await.unwrap();

        let scenario = s.scenario(id).unwrap();
        assert!(scenario.completed);
        assert!(scenario.gherkin.as_ref().unwrap().starts_with("Scenario: Login ok"));
    }

    #[tokio::test]
    async fn test_gherkin_group_matches_exact_titles() {
        let reply = r#"{"scenarios": [
            {"title": "Login ok", "gherkin": "Scenario: Login ok\n  Given..."},
            {"title": "Login renamed by model", "gherkin": "Scenario: nope"}
        ]}"#;
        let pipe = pipeline(MockLlmClient::texts(&[reply]));
        let mut s = session();
        let a = s.add_scenario("Login ok", ScenarioKind::Scenario);
        let b = s.add_scenario("Login falha", ScenarioKind::Scenario);

        let outcome = pipe.gherkin_group(&mut s, &[a, b]).await.unwrap();

        assert_eq!(outcome.completed, vec![a]);
        assert_eq!(outcome.unmatched, vec!["Login falha"]);
        assert!(s.scenario(a).unwrap().completed);
        // The reworded reply was dropped, not misassigned
        assert!(!s.scenario(b).unwrap().completed);
        assert!(s.scenario(b).unwrap().gherkin.is_none());
    }

    #[tokio::test]
    async fn test_outline_skeleton_headers_follow_template() {
        let reply = r#"{
            "template": "Scenario Outline: Senhas\n  Given \"<usuario>\"\n  When \"<senha>\"\n  Then \"<mensagem>\"",
            "headers": ["mensagem", "senha", "usuario"]
        }"#;
        let pipe = pipeline(MockLlmClient::texts(&[reply]));
        let mut s = session();
        let id = s.add_scenario("Senhas inválidas", ScenarioKind::Outline);

        let skeleton = pipe.outline_skeleton(&s, id).await.unwrap();
        assert_eq!(skeleton.headers, vec!["usuario", "senha", "mensagem"]);

        pipe.complete_outline(
            &mut s,
            id,
            &skeleton,
            &[vec!["ana".into(), "123".into(), "curta demais".into()]],
        )
        .unwrap();
        let gherkin = s.scenario(id).unwrap().gherkin.clone().unwrap();
        assert!(gherkin.contains("| usuario | senha | mensagem |"));
        assert!(gherkin.contains("| ana | 123 | curta demais |"));
    }

    #[tokio::test]
    async fn test_complete_outline_rejects_ragged_rows() {
        let pipe = pipeline(MockLlmClient::texts(&[]));
        let mut s = session();
        let id = s.add_scenario("Senhas", ScenarioKind::Outline);
        let skeleton = OutlineSkeleton::normalized(
            "Scenario Outline: S\n  Given <a>\n  When <b>".to_string(),
            vec![],
        );

        let result = pipe.complete_outline(&mut s, id, &skeleton, &[vec!["only-one".into()]]);
        assert!(matches!(
            result,
            Err(EngineError::Session(SessionError::InvariantViolation(_)))
        ));
        assert!(s.scenario(id).unwrap().gherkin.is_none());
    }

    #[tokio::test]
    async fn test_transcript_stories_filters_invalid() {
        let reply = r#"{"stories": [
            {"title": "Reset password", "description": "As a user..."},
            {"title": "", "description": "orphan"}
        ]}"#;
        let pipe = pipeline(MockLlmClient::texts(&[reply]));

        let stories = pipe.transcript_stories("PO: usuários esquecem senhas...").await.unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "Reset password");
    }

    #[tokio::test]
    async fn test_empty_transcript_rejected_without_call() {
        let client = Arc::new(MockLlmClient::texts(&["unused"]));
        let pipe = DerivationPipeline::new(PromptGateway::new(client.clone(), PromptLoader::embedded_only(), 4096));

        assert!(pipe.transcript_stories("   ").await.is_err());
        assert_eq!(client.call_count(), 0);
    }
}
