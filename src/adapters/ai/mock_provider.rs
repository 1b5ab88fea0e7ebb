//! Mock AI Provider for testing.
//!
//! Configurable mock implementation of the AIProvider port, allowing tests
//! to run without calling real AI APIs.
//!
//! # Features
//!
//! - Pre-configured responses (consumed in order)
//! - Simulated delays for timeout testing
//! - Error injection for resilience testing
//! - Call tracking for verification

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, ProviderInfo,
};

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a successful completion with this content.
    Success(String),
    /// Return a rate-limit error.
    RateLimited { retry_after_secs: u32 },
    /// Return an unavailable error.
    Unavailable { message: String },
    /// Return a timeout error.
    Timeout { timeout_secs: u32 },
}

impl MockResponse {
    fn into_result(self) -> Result<CompletionResponse, AIError> {
        match self {
            MockResponse::Success(content) => Ok(CompletionResponse {
                content,
                model: "mock".to_string(),
                finish_reason: FinishReason::Stop,
            }),
            MockResponse::RateLimited { retry_after_secs } => {
                Err(AIError::rate_limited(retry_after_secs))
            }
            MockResponse::Unavailable { message } => Err(AIError::unavailable(message)),
            MockResponse::Timeout { timeout_secs } => Err(AIError::Timeout { timeout_secs }),
        }
    }
}

/// Mock AI provider for testing.
///
/// Responses are consumed in order; when the queue runs dry the provider
/// reports itself unavailable, which the classifier treats as "no AI
/// result".
#[derive(Debug, Clone, Default)]
pub struct MockAIProvider {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockAIProvider {
    /// Creates a provider with no scripted responses (always unavailable).
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(MockResponse::Success(content.into()));
        self
    }

    /// Queues an arbitrary scripted response.
    pub fn with_scripted(self, response: MockResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    /// Adds an artificial delay before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the requests this provider has received.
    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns how many times the provider was called.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        self.calls.lock().unwrap().push(request);

        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(response) => response.into_result(),
            None => Err(AIError::unavailable("no scripted response")),
        }
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("mock", "mock", 8_192)
    }
}
