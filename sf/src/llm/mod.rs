//! LLM client module
//!
//! The completion service boundary: a single `complete(request)` capability
//! over HTTP, with optional structured-output schemas.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAiClient;
pub use types::{CompletionRequest, CompletionResponse, Message, ResponseSchema, Role, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Only OpenAI-compatible providers are supported; the base URL decides
/// which service is actually reached.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let resolved = config.resolve().map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    debug!(provider = %resolved.provider, model = %resolved.model, "create_client: called");
    match resolved.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiClient::from_config(&resolved)?)),
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: openai",
            other
        ))),
    }
}
