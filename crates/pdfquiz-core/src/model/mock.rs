//! Mock model backend for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{GenerateRequest, LanguageModel, ModelError};

/// A configurable mock response for [`MockModel`].
#[derive(Clone, Debug)]
#[allow(dead_code)]
pub enum MockResponse {
    /// Return this text as the generation.
    Text(String),
    /// Simulate a 429 rate-limit response.
    RateLimited { retry_after: Option<Duration> },
    /// Simulate a 5xx response.
    ServerError(u16),
    /// Simulate a non-retryable 4xx response (e.g. a bad API key).
    ApiError(u16, String),
    /// Simulate a safety block with no candidates.
    Blocked(String),
}

/// A hand-rolled mock implementing [`LanguageModel`] for tests.
///
/// Supports:
/// - A fixed response (used for every call), **or**
/// - A sequence of responses (one per call, repeating the last if exhausted).
/// - Recording of every request for prompt assertions.
pub struct MockModel {
    /// Each call pops the next response (stored reversed).
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    requests: Mutex<Vec<GenerateRequest>>,
    call_count: AtomicUsize,
}

impl MockModel {
    /// Create a mock that always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: response,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MockResponse::Text(text.into()))
    }

    /// Create a mock that returns responses in order, repeating the last one.
    pub fn with_sequence(mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        responses.reverse();
        let fallback = responses.first().cloned().unwrap();
        Self {
            responses: Mutex::new(responses),
            fallback,
            requests: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `generate()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> MockResponse {
        let mut seq = self.responses.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn generate<'a>(
        &'a self,
        request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let response = self.next_response();

        Box::pin(async move {
            match response {
                MockResponse::Text(text) => Ok(text),
                MockResponse::RateLimited { retry_after } => {
                    Err(ModelError::RateLimited { retry_after })
                }
                MockResponse::ServerError(status) => Err(ModelError::Server {
                    status,
                    body: "upstream unavailable".into(),
                }),
                MockResponse::ApiError(status, body) => Err(ModelError::Api { status, body }),
                MockResponse::Blocked(reason) => Err(ModelError::Blocked(reason)),
            }
        })
    }
}
