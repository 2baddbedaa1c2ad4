use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunk::{CHUNK_OVERLAP, CHUNK_SIZE};
use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiClient};
use crate::retry::RetryPolicy;
use crate::summarize::SummaryOptions;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 16;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_keys: Option<ApiKeysConfig>,
    pub model: Option<ModelConfig>,
    pub summary: Option<SummaryConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub gemini_api_key: Option<String>,
}

impl std::fmt::Debug for ApiKeysConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeysConfig")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    /// Also write every finished summary to this file.
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub max_upload_mb: Option<u64>,
    pub session_ttl_secs: Option<u64>,
}

/// Platform config directory path: `<config_dir>/pdfquiz/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdfquiz").join("config.toml"))
}

/// Load config by cascading CWD `.pdfquiz.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pdfquiz.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_keys = base.api_keys.unwrap_or_default();
    let over_keys = overlay.api_keys.unwrap_or_default();
    let base_model = base.model.unwrap_or_default();
    let over_model = overlay.model.unwrap_or_default();
    let base_summary = base.summary.unwrap_or_default();
    let over_summary = overlay.summary.unwrap_or_default();
    let base_server = base.server.unwrap_or_default();
    let over_server = overlay.server.unwrap_or_default();

    ConfigFile {
        api_keys: Some(ApiKeysConfig {
            gemini_api_key: over_keys.gemini_api_key.or(base_keys.gemini_api_key),
        }),
        model: Some(ModelConfig {
            name: over_model.name.or(base_model.name),
            base_url: over_model.base_url.or(base_model.base_url),
            timeout_secs: over_model.timeout_secs.or(base_model.timeout_secs),
            max_attempts: over_model.max_attempts.or(base_model.max_attempts),
        }),
        summary: Some(SummaryConfig {
            chunk_size: over_summary.chunk_size.or(base_summary.chunk_size),
            chunk_overlap: over_summary.chunk_overlap.or(base_summary.chunk_overlap),
            output_path: over_summary.output_path.or(base_summary.output_path),
        }),
        server: Some(ServerConfig {
            bind: over_server.bind.or(base_server.bind),
            max_upload_mb: over_server.max_upload_mb.or(base_server.max_upload_mb),
            session_ttl_secs: over_server.session_ttl_secs.or(base_server.session_ttl_secs),
        }),
    }
}

impl ConfigFile {
    /// Overlay values from environment variables:
    /// `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`, `PDFQUIZ_BIND`.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Like [`ConfigFile::with_env`] with an explicit variable lookup.
    pub fn with_env_from(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let env = ConfigFile {
            api_keys: Some(ApiKeysConfig {
                gemini_api_key: get("GEMINI_API_KEY"),
            }),
            model: Some(ModelConfig {
                name: get("GEMINI_MODEL"),
                base_url: get("GEMINI_BASE_URL"),
                ..Default::default()
            }),
            server: Some(ServerConfig {
                bind: get("PDFQUIZ_BIND"),
                ..Default::default()
            }),
            summary: None,
        };
        merge(self, env)
    }

    pub fn gemini_api_key(&self) -> Option<&str> {
        self.api_keys.as_ref()?.gemini_api_key.as_deref()
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.model
            .as_ref()
            .and_then(|m| m.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn model_timeout(&self) -> Duration {
        self.model
            .as_ref()
            .and_then(|m| m.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(crate::gemini::DEFAULT_TIMEOUT)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self.model.as_ref().and_then(|m| m.max_attempts) {
            Some(n) => RetryPolicy::new(n),
            None => RetryPolicy::default(),
        }
    }

    pub fn summary_options(&self) -> SummaryOptions {
        let summary = self.summary.as_ref();
        SummaryOptions {
            chunk_size: summary.and_then(|s| s.chunk_size).unwrap_or(CHUNK_SIZE),
            chunk_overlap: summary.and_then(|s| s.chunk_overlap).unwrap_or(CHUNK_OVERLAP),
            retry: self.retry_policy(),
        }
    }

    pub fn summary_output_path(&self) -> Option<PathBuf> {
        self.summary
            .as_ref()
            .and_then(|s| s.output_path.as_ref())
            .map(PathBuf::from)
    }

    pub fn bind_addr(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(DEFAULT_BIND)
    }

    pub fn max_upload_bytes(&self) -> usize {
        let mb = self
            .server
            .as_ref()
            .and_then(|s| s.max_upload_mb)
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);
        (mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(
            self.server
                .as_ref()
                .and_then(|s| s.session_ttl_secs)
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
        )
    }

    /// Build a Gemini client for `api_key` using the configured model settings.
    pub fn gemini_client(&self, api_key: &str) -> Result<GeminiClient, crate::ModelError> {
        Ok(GeminiClient::try_new(api_key)?
            .with_model(self.model_name())
            .with_base_url(self.base_url())
            .with_timeout(self.model_timeout()))
    }
}

/// Save a config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
