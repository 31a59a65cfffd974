//! Prompt Gateway
//!
//! The single boundary between the orchestration core and the completion
//! service. Builds one request per operation (rendered template + optional
//! output schema), sends it, and parses the reply into either free text or
//! a schema-validated typed value. Single-shot: no implicit retry, and a
//! parse failure is treated the same as a transport failure.

mod operation;

pub use operation::{
    GherkinEntry, GherkinGroupPayload, Operation, OutlineSkeletonPayload, PersonaQuestion, QuestionBatchPayload,
    SatisfactionPayload, ScenarioTitleEntry, ScenarioTitlesPayload, TableColumnsPayload, TranscriptStoriesPayload,
};

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::prompts::PromptLoader;

/// Errors from gateway operations
///
/// Transport and schema failures are handled identically by callers:
/// surfaced once, operation-scoped, prior state untouched.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Completion service error: {0}")]
    Transport(#[from] LlmError),

    #[error("Response did not match the expected shape: {0}")]
    Schema(String),

    #[error("Prompt template error: {0}")]
    Template(String),
}

/// The boundary component wrapping the completion service
pub struct PromptGateway {
    llm: Arc<dyn LlmClient>,
    loader: PromptLoader,
    max_tokens: u32,
}

impl PromptGateway {
    pub fn new(llm: Arc<dyn LlmClient>, loader: PromptLoader, max_tokens: u32) -> Self {
        Self {
            llm,
            loader,
            max_tokens,
        }
    }

    /// Invoke a free-text operation
    pub async fn text<C: Serialize>(&self, op: Operation, context: &C) -> Result<String, GatewayError> {
        debug!(?op, "PromptGateway::text: called");
        let response = self.send(op, context).await?;
        let trimmed = response.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::Schema("empty response".to_string()));
        }
        Ok(trimmed.to_string())
    }

    /// Invoke a structured operation and parse the reply into `T`
    ///
    /// The reply must be valid JSON conforming to the operation's declared
    /// shape; anything else is a [`GatewayError::Schema`].
    pub async fn json<T, C>(&self, op: Operation, context: &C) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        C: Serialize,
    {
        debug!(?op, "PromptGateway::json: called");
        let response = self.send(op, context).await?;
        let cleaned = strip_code_fences(&response);

        serde_json::from_str(cleaned).map_err(|e| {
            warn!(?op, error = %e, "PromptGateway::json: schema violation");
            GatewayError::Schema(format!("{}: {}", op.template(), e))
        })
    }

    async fn send<C: Serialize>(&self, op: Operation, context: &C) -> Result<String, GatewayError> {
        let system_prompt = self
            .loader
            .render(op.template(), context)
            .map_err(|e| GatewayError::Template(e.to_string()))?;

        let mut request = CompletionRequest::text(system_prompt, user_message(op), self.max_tokens);
        if let Some(schema) = op.schema() {
            request = request.with_schema(schema);
        }

        let response = self.llm.complete(request).await?;
        response
            .content
            .ok_or_else(|| GatewayError::Schema("empty response".to_string()))
    }
}

/// Fixed user-turn text per operation; the rendered template carries the
/// actual context in the system prompt
fn user_message(op: Operation) -> &'static str {
    if op.is_structured() {
        "Respond with the requested JSON only."
    } else {
        "Respond with the requested output only."
    }
}

/// Strip markdown code fences some providers wrap JSON replies in
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(without_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag after the opening fence
    let body = without_open.split_once('\n').map(|(_, rest)| rest).unwrap_or(without_open);
    body.strip_suffix("```").map(str::trim).unwrap_or(body.trim())
}
