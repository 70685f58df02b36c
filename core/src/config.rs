//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::response::InlineMarkupResultStrategy;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// HTTP server configuration
    pub http: HttpConfig,

    /// Response processor configuration
    pub response: ResponseConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Directory to load tool plugins from, if any
    #[serde(rename = "tool-plugin-dir")]
    pub tool_plugin_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration with fallback chain: explicit path → project-local
    /// `.agentcore.yaml` → user-global `~/.config/agentcore/config.yaml` →
    /// defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".agentcore.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("agentcore").join("config.yaml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8787 }
    }
}

/// Response processor configuration, threaded through to
/// [`crate::response::ResponseProcessorConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    #[serde(rename = "native-tool-calling")]
    pub native_tool_calling: bool,

    #[serde(rename = "inline-markup-tool-calling")]
    pub inline_markup_tool_calling: bool,

    #[serde(rename = "execute-tools")]
    pub execute_tools: bool,

    #[serde(rename = "execute-on-stream")]
    pub execute_on_stream: bool,

    #[serde(rename = "inline-markup-result-strategy")]
    pub inline_markup_result_strategy: InlineMarkupResultStrategySetting,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            native_tool_calling: true,
            inline_markup_tool_calling: true,
            execute_tools: true,
            execute_on_stream: true,
            inline_markup_result_strategy: InlineMarkupResultStrategySetting::Emit,
        }
    }
}

/// Serializable mirror of [`InlineMarkupResultStrategy`] - the response
/// module's own enum has no `Serialize`/`Deserialize` impl since it's not
/// otherwise config-shaped, so config owns the YAML-facing copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InlineMarkupResultStrategySetting {
    Emit,
    Silent,
}

impl From<InlineMarkupResultStrategySetting> for InlineMarkupResultStrategy {
    fn from(value: InlineMarkupResultStrategySetting) -> Self {
        match value {
            InlineMarkupResultStrategySetting::Emit => InlineMarkupResultStrategy::Emit,
            InlineMarkupResultStrategySetting::Silent => InlineMarkupResultStrategy::Silent,
        }
    }
}

impl ResponseConfig {
    pub fn to_processor_config(&self) -> crate::response::ResponseProcessorConfig {
        crate::response::ResponseProcessorConfig {
            native_tool_calling: self.native_tool_calling,
            inline_markup_tool_calling: self.inline_markup_tool_calling,
            execute_tools: self.execute_tools,
            execute_on_stream: self.execute_on_stream,
            inline_markup_result_strategy: self.inline_markup_result_strategy.into(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for TaskStore data
    #[serde(rename = "taskstore-dir")]
    pub taskstore_dir: String,

    /// Warning threshold for JSONL file size in MB
    #[serde(rename = "jsonl-warn-mb")]
    pub jsonl_warn_mb: u32,

    /// Error threshold for JSONL file size in MB
    #[serde(rename = "jsonl-error-mb")]
    pub jsonl_error_mb: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            taskstore_dir: ".agentstore".to_string(),
            jsonl_warn_mb: 100,
            jsonl_error_mb: 500,
        }
    }
}
