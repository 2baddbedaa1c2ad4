//! Retry with exponential backoff for transient model API failures.
//!
//! Only 429 and 5xx responses are retried. A server-provided Retry-After wins
//! over the computed backoff.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{GenerateRequest, LanguageModel, ModelError};

/// How many times to try a call and how long to wait between tries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Backoff after the zero-based `attempt` failed: 1s, 2s, 4s, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(Duration::MAX)
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
///
/// A date yields the time remaining until it, zero if it has passed.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    parse_retry_after_at(value, Utc::now())
}

fn parse_retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        let remaining = date.with_timezone(&Utc) - now;
        return Some(remaining.to_std().unwrap_or(Duration::ZERO));
    }
    // Obsolete date formats (RFC 850, asctime): fixed wait
    if value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

/// Map a non-success HTTP status and body onto a [`ModelError`].
pub fn classify_status(status: u16, retry_after: Option<&str>, body: String) -> ModelError {
    match status {
        429 => ModelError::RateLimited {
            retry_after: retry_after.and_then(parse_retry_after),
        },
        500..=599 => ModelError::Server { status, body },
        _ => ModelError::Api { status, body },
    }
}

/// Call `model.generate()` until it succeeds, fails permanently, or the
/// policy's attempts are used up.
pub async fn generate_with_retry(
    model: &dyn LanguageModel,
    request: &GenerateRequest,
    policy: RetryPolicy,
) -> Result<String, ModelError> {
    let mut attempt = 0;
    loop {
        match model.generate(request).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_retryable() && attempt + 1 < policy.max_attempts => {
                let wait = err.retry_after().unwrap_or_else(|| policy.backoff(attempt));
                tracing::info!(
                    model = model.name(),
                    attempt = attempt + 1,
                    error = %err,
                    "transient model error, retrying in {:.1}s",
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
