use std::path::PathBuf;
use std::sync::Arc;

use pdfquiz_core::{ConfigFile, LanguageModel, ModelError, PdfBackend, RetryPolicy, SummaryOptions};

use crate::session::SessionStore;

/// Builds a model client for the API key a visitor entered.
pub trait ModelFactory: Send + Sync {
    fn for_key(&self, api_key: &str) -> Result<Arc<dyn LanguageModel>, ModelError>;
}

/// Gemini clients sharing one connection pool, configured from [`ConfigFile`].
pub struct GeminiFactory {
    config: ConfigFile,
    http: reqwest::Client,
}

impl GeminiFactory {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

impl ModelFactory for GeminiFactory {
    fn for_key(&self, api_key: &str) -> Result<Arc<dyn LanguageModel>, ModelError> {
        let client = self
            .config
            .gemini_client(api_key)?
            .with_http_client(self.http.clone());
        Ok(Arc::new(client))
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub pdf_backend: Arc<dyn PdfBackend>,
    pub models: Arc<dyn ModelFactory>,
    pub sessions: SessionStore,
    pub summary_options: SummaryOptions,
    pub retry: RetryPolicy,
    /// When set, every finished summary is also written to this file.
    pub summary_output_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(
        config: &ConfigFile,
        pdf_backend: Arc<dyn PdfBackend>,
        models: Arc<dyn ModelFactory>,
    ) -> Self {
        Self {
            pdf_backend,
            models,
            sessions: SessionStore::new(config.session_ttl()),
            summary_options: config.summary_options(),
            retry: config.retry_policy(),
            summary_output_path: config.summary_output_path(),
            max_upload_bytes: config.max_upload_bytes(),
        }
    }
}
