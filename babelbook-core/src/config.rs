//! Translation provider configuration
//!
//! Configuration is read from a TOML file with one table per provider plus
//! a handful of run-wide settings. Every field has a sensible default so a
//! partial (or absent) file works; API keys can also come from the
//! environment, which wins over the file.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Supported translation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    DeepSeek,
}

impl ProviderKind {
    /// Stable lowercase identifier, used in config tables and logs
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::DeepSeek => "https://api.deepseek.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-3.5-turbo",
            ProviderKind::DeepSeek => "deepseek-chat",
        }
    }

    /// Environment variable consulted for this provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "BABELBOOK_OPENAI_API_KEY",
            ProviderKind::DeepSeek => "BABELBOOK_DEEPSEEK_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Connection and request parameters for one translation backend
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Character cap for one combined batch request
    pub batch_chars: usize,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            max_tokens: 2000,
            temperature: 0.3,
            batch_chars: 4000,
            retry_count: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl ProviderConfig {
    /// Defaults for a known backend (endpoint and model filled in)
    pub fn for_provider(kind: ProviderKind) -> Self {
        Self {
            base_url: kind.default_base_url().to_string(),
            model: kind.default_model().to_string(),
            ..Self::default()
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

// API keys stay out of Debug output; this is what ends up in logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("batch_chars", &self.batch_chars)
            .field("retry_count", &self.retry_count)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

/// Per-provider configuration tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderTable {
    pub openai: ProviderConfig,
    pub deepseek: ProviderConfig,
}

impl Default for ProviderTable {
    fn default() -> Self {
        Self {
            openai: ProviderConfig::for_provider(ProviderKind::OpenAi),
            deepseek: ProviderConfig::for_provider(ProviderKind::DeepSeek),
        }
    }
}

/// Run-wide translation settings plus the provider tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    pub default_provider: ProviderKind,
    /// Pages merged into one provider request
    pub batch_size: usize,
    pub providers: ProviderTable,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            default_provider: ProviderKind::OpenAi,
            batch_size: 1,
            providers: ProviderTable::default(),
        }
    }
}

impl TranslationConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `path` when given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Effective configuration for one backend: file values with blank
    /// endpoint/model backfilled from the provider defaults and the API key
    /// optionally overridden from the environment.
    pub fn provider_config(&self, kind: ProviderKind) -> ProviderConfig {
        self.provider_config_with_env(kind, std::env::var(kind.api_key_env()).ok())
    }

    /// [`Self::provider_config`] with the environment lookup supplied by
    /// the caller
    fn provider_config_with_env(
        &self,
        kind: ProviderKind,
        env_key: Option<String>,
    ) -> ProviderConfig {
        let mut config = match kind {
            ProviderKind::OpenAi => self.providers.openai.clone(),
            ProviderKind::DeepSeek => self.providers.deepseek.clone(),
        };
        if config.base_url.trim().is_empty() {
            config.base_url = kind.default_base_url().to_string();
        }
        if config.model.trim().is_empty() {
            config.model = kind.default_model().to_string();
        }
        if let Some(key) = env_key {
            if !key.trim().is_empty() {
                config.api_key = key;
            }
        }
        config
    }
}
