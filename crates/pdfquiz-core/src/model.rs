//! Language-model seam: the request shape and the trait the summarizer and
//! quiz generator call through.

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// A single text-generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub system_prompt: String,
    pub user_query: String,
    /// When set, the model is asked for `application/json` output matching this schema.
    pub response_schema: Option<serde_json::Value>,
    /// Attach the provider's web search tool so answers can be grounded.
    pub grounded_search: bool,
}

impl GenerateRequest {
    pub fn new(system_prompt: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_query: user_query.into(),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn with_grounded_search(mut self) -> Self {
        self.grounded_search = true;
        self
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("an API key is required")]
    MissingApiKey,
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited by the model API (429)")]
    RateLimited { retry_after: Option<Duration> },
    #[error("model API server error ({status}): {body}")]
    Server { status: u16, body: String },
    #[error("model API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("model returned no candidates (blocked: {0})")]
    Blocked(String),
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Rate limits and 5xx responses are transient; everything else is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::RateLimited { .. } | ModelError::Server { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ModelError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A hosted model that turns a prompt into text.
pub trait LanguageModel: Send + Sync {
    /// Human-readable model identifier, used in logs.
    fn name(&self) -> &str;

    /// Run one generation and return the first candidate's text.
    fn generate<'a>(
        &'a self,
        request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>>;
}
