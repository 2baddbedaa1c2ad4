use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::{Value, json};

use crate::model::{GenerateRequest, LanguageModel, ModelError};
use crate::retry::classify_status;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the Gemini `generateContent` endpoint, authenticated with a
/// user-supplied API key.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into().trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Like [`GeminiClient::new`], but rejects a blank key up front.
    pub fn try_new(api_key: &str) -> Result<Self, ModelError> {
        if api_key.trim().is_empty() {
            return Err(ModelError::MissingApiKey);
        }
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another host (a proxy, or a mock server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share a connection pool with other clients.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Build the `generateContent` JSON body for a request.
pub fn build_payload(request: &GenerateRequest) -> Value {
    let mut body = json!({
        "contents": [{ "parts": [{ "text": request.user_query }] }],
        "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
    });

    if request.grounded_search {
        body["tools"] = json!([{ "google_search": {} }]);
    }

    if let Some(ref schema) = request.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }

    body
}

/// Pull the first candidate's text out of a `generateContent` response.
pub fn extract_candidate_text(response: &Value) -> Result<String, ModelError> {
    let candidate = response["candidates"]
        .as_array()
        .and_then(|arr| arr.first())
        .ok_or_else(|| {
            let reason = response["promptFeedback"]["blockReason"]
                .as_str()
                .unwrap_or("unknown reason");
            ModelError::Blocked(reason.to_string())
        })?;

    candidate["content"]["parts"]
        .as_array()
        .and_then(|parts| parts.first())
        .and_then(|p| p["text"].as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| {
            let finish = candidate["finishReason"].as_str().unwrap_or("none");
            ModelError::InvalidResponse(format!(
                "candidate has no text part (finishReason: {finish})"
            ))
        })
}

impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate<'a>(
        &'a self,
        request: &'a GenerateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, ModelError>> + Send + 'a>> {
        Box::pin(async move {
            let body = build_payload(request);

            let resp = self
                .client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .timeout(self.timeout)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let text = resp.text().await.unwrap_or_default();
                return Err(classify_status(
                    status.as_u16(),
                    retry_after.as_deref(),
                    text,
                ));
            }

            let data: Value = resp
                .json()
                .await
                .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

            let text = extract_candidate_text(&data)?;
            tracing::debug!(model = %self.model, chars = text.len(), "generation complete");
            Ok(text)
        })
    }
}
