//! Complexity analysis and story splitting
//!
//! Classifies the working story as Baixa, Média, or Alta and, for Alta,
//! carries the suggested smaller stories the user may split into. The
//! split selection itself is a session transition; this engine only
//! produces the verdict.

use serde::Serialize;
use tracing::info;

use crate::domain::ComplexityAnalysis;
use crate::gateway::{Operation, PromptGateway};
use crate::planning::EngineError;
use crate::session::Session;

#[derive(Serialize)]
struct ComplexityContext {
    title: String,
    description: String,
}

/// Produces complexity verdicts for the session's working story
pub struct ComplexityEngine {
    gateway: PromptGateway,
}

impl ComplexityEngine {
    pub fn new(gateway: PromptGateway) -> Self {
        Self { gateway }
    }

    /// Analyze the working story and store the verdict on the session
    ///
    /// Re-running replaces the previous verdict; a failed request keeps it.
    pub async fn analyze(&self, session: &mut Session) -> Result<ComplexityAnalysis, EngineError> {
        let ctx = ComplexityContext {
            title: session.original_story.title.clone(),
            description: session.working_text().to_string(),
        };
        let analysis: ComplexityAnalysis = self.gateway.json(Operation::ComplexityAnalysis, &ctx).await?;

        info!(
            verdict = ?analysis.complexity,
            candidates = analysis.split_candidates().len(),
            "ComplexityEngine::analyze: verdict stored"
        );
        session.complexity = Some(analysis.clone());
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComplexityLevel, Story};
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use crate::session::{SessionMode, SessionError};
    use std::sync::Arc;

    fn engine(client: MockLlmClient) -> ComplexityEngine {
        ComplexityEngine::new(PromptGateway::new(Arc::new(client), PromptLoader::embedded_only(), 4096))
    }

    fn session() -> Session {
        Session::submit_story(
            Story::new("Checkout", "Como cliente, quero finalizar a compra..."),
            SessionMode::Story,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_low_verdict_has_no_split() {
        let reply = r#"{"complexity": "Baixa", "justification": "escopo pequeno"}"#;
        let eng = engine(MockLlmClient::texts(&[reply]));
        let mut s = session();

        eng.analyze(&mut s).await.unwrap();
        let analysis = s.complexity.as_ref().unwrap();
        assert_eq!(analysis.complexity, ComplexityLevel::Low);
        assert!(analysis.split_candidates().is_empty());
        assert!(matches!(s.accept_split(), Err(SessionError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn test_high_verdict_enables_split_flow() {
        let reply = r#"{"complexity": "Alta", "justification": "muitos fluxos", "suggestedStories": [
            {"title": "Pagamento", "description": "d1"},
            {"title": "Carrinho", "description": "d2"},
            {"title": "Confirmação", "description": "d3"}
        ]}"#;
        let eng = engine(MockLlmClient::texts(&[reply]));
        let mut s = session();

        eng.analyze(&mut s).await.unwrap();
        s.accept_split().unwrap();
        assert_eq!(s.split_queue.len(), 3);

        s.select_split(1).unwrap();
        assert_eq!(s.original_story.title, "Carrinho");
        assert!(s.complexity.is_none());
        // Queue survives the reset for the remaining siblings
        assert_eq!(s.split_queue.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_analysis_keeps_previous_verdict() {
        let eng = engine(MockLlmClient::failing("down"));
        let mut s = session();
        s.complexity = Some(ComplexityAnalysis {
            complexity: ComplexityLevel::Medium,
            justification: "anterior".to_string(),
            suggested_stories: vec![],
        });

        assert!(eng.analyze(&mut s).await.is_err());
        assert_eq!(s.complexity.as_ref().unwrap().complexity, ComplexityLevel::Medium);
    }
}
