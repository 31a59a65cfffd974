//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// This is the core abstraction for the completion service boundary. Every
/// request carries its full context; no conversation state lives behind the
/// trait. Calls are single-shot: a failure is surfaced once and the caller
/// decides whether to re-invoke.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock LLM client for unit tests
    ///
    /// Returns a fixed sequence of responses, one per call, and records the
    /// requests it received so tests can assert on prompt content.
    pub struct MockLlmClient {
        responses: Vec<Result<CompletionResponse, String>>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            Self {
                responses: responses.into_iter().map(Ok).collect(),
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Build a mock from explicit outcomes, Err entries become
        /// `LlmError::InvalidResponse` with the given message
        pub fn with_outcomes(responses: Vec<Result<CompletionResponse, String>>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Convenience: a mock that answers every call with the given texts
        pub fn texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| CompletionResponse::text(*t)).collect())
        }

        /// A mock whose single call fails with a transport-style error
        pub fn failing(message: &str) -> Self {
            Self::with_outcomes(vec![Err(message.to_string())])
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Requests captured so far, in call order
        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            self.requests.lock().unwrap().push(request);
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(idx) {
                Some(Ok(response)) => Ok(response.clone()),
                Some(Err(message)) => Err(LlmError::InvalidResponse(message.clone())),
                None => Err(LlmError::InvalidResponse("No more mock responses".to_string())),
            }
        }
    }

}
