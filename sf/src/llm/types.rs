//! LLM request/response types
//!
//! Modeled on the OpenAI Chat Completions API but provider-agnostic.
//! StoryForge only ever sends text conversations; structured replies are
//! requested through a JSON schema attached to the request, not tools.

use serde::{Deserialize, Serialize};

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (rendered from a Handlebars template)
    pub system_prompt: String,

    /// Conversation messages
    pub messages: Vec<Message>,

    /// Max tokens for the response
    pub max_tokens: u32,

    /// When set, the provider is asked for JSON conforming to this schema
    pub response_schema: Option<ResponseSchema>,
}

impl CompletionRequest {
    /// Build a plain text request with a single user message
    pub fn text(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(user)],
            max_tokens,
            response_schema: None,
        }
    }

    /// Attach a structured-output schema to this request
    pub fn with_schema(mut self, schema: ResponseSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// A named JSON schema for structured output
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    /// Schema name (required by the provider's json_schema format)
    pub name: String,
    /// The JSON schema body
    pub schema: serde_json::Value,
}

impl ResponseSchema {
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Response from a completion request
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Text content (None when the provider returned an empty choice)
    pub content: Option<String>,

    /// Token usage for cost tracking
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Build a plain text response (used by tests and mocks)
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            usage: TokenUsage::default(),
        }
    }
}

/// Token usage for cost tracking
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
