//! Translation provider gateway
//!
//! Speaks the OpenAI-compatible chat completions protocol: one POST per
//! translation carrying a system instruction and the user text. The gateway
//! owns its HTTP client and configuration; nothing here is global. Requests
//! are validated before any network traffic, transient failures are retried
//! with a fixed delay, and every call has a bounded timeout.

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::{ConfigError, Result, TranslationError};
use crate::orchestrator::CancelFlag;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// How often the retry wait looks at the cancellation flag
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Anything that can translate a piece of text.
///
/// The orchestrator only sees this trait; tests drive it with stub
/// implementations and production code uses [`ProviderGateway`].
#[async_trait]
pub trait TextTranslator: Send + Sync {
    /// Translate one piece of text. Blank input is returned unchanged.
    async fn translate(&self, text: &str) -> Result<String>;

    /// Provider label for logs and error context
    fn name(&self) -> &str;

    /// Issue a minimal real translation to see whether the backend answers.
    /// Any non-empty result counts as available.
    async fn is_available(&self) -> bool {
        match self.translate("Hello").await {
            Ok(result) => !result.trim().is_empty(),
            Err(e) => {
                tracing::warn!(provider = self.name(), error = %e, "availability probe failed");
                false
            }
        }
    }
}

/// Trim whitespace, strip one trailing slash, and default the scheme to
/// https when none is given
pub fn normalize_base_url(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if let Some(stripped) = url.strip_suffix('/') {
        url = stripped.to_string();
    }
    if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
        url = format!("https://{url}");
    }
    url
}

/// Chat completions endpoint for a normalized base URL; the `/v1` segment
/// is skipped when the base already ends with it
pub fn chat_endpoint(base_url: &str) -> String {
    if base_url.ends_with("/v1") {
        format!("{base_url}/chat/completions")
    } else {
        format!("{base_url}/v1/chat/completions")
    }
}

/// Reject configurations that could never produce a successful request.
/// Runs before any network call.
pub fn validate_config(
    provider: ProviderKind,
    config: &ProviderConfig,
) -> std::result::Result<(), ConfigError> {
    if config.base_url.trim().is_empty() {
        return Err(ConfigError::MissingField {
            provider: provider.name(),
            field: "base_url",
        });
    }
    if config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingField {
            provider: provider.name(),
            field: "api_key",
        });
    }
    if config.model.trim().is_empty() {
        return Err(ConfigError::MissingField {
            provider: provider.name(),
            field: "model",
        });
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP gateway to one OpenAI-compatible translation backend
pub struct ProviderGateway {
    provider: ProviderKind,
    config: ProviderConfig,
    client: Client,
    system_prompt: String,
    cancel: CancelFlag,
}

impl ProviderGateway {
    pub fn new(
        provider: ProviderKind,
        config: ProviderConfig,
        system_prompt: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TranslationError::ClientBuild(e.to_string()))?;
        Ok(Self {
            provider,
            config,
            client,
            system_prompt: system_prompt.into(),
            cancel: CancelFlag::default(),
        })
    }

    /// Share a cancellation flag so retry waits can be interrupted
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    async fn translate_text(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        validate_config(self.provider, &self.config)?;

        let attempts = self.config.retry_count.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                return Err(TranslationError::Cancelled.into());
            }
            match self.request_translation(text).await {
                Ok(translated) => {
                    if attempt > 1 {
                        tracing::info!(
                            provider = self.provider.name(),
                            attempt,
                            "translation succeeded after retry"
                        );
                    }
                    return Ok(translated);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = self.provider.name(),
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "translation attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < attempts && self.sleep_between_attempts().await {
                        return Err(TranslationError::Cancelled.into());
                    }
                }
            }
        }

        Err(TranslationError::RetriesExhausted {
            provider: self.provider.name(),
            attempts,
            last_error,
        }
        .into())
    }

    /// Sleep the configured retry delay in short slices, watching the
    /// cancellation flag the whole time. Returns true when cancelled.
    async fn sleep_between_attempts(&self) -> bool {
        let mut remaining = self.config.retry_delay();
        while !remaining.is_zero() {
            if self.cancel.is_cancelled() {
                return true;
            }
            let step = remaining.min(CANCEL_POLL_INTERVAL);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
        self.cancel.is_cancelled()
    }

    async fn request_translation(
        &self,
        text: &str,
    ) -> std::result::Result<String, TranslationError> {
        let provider = self.provider.name();
        let url = chat_endpoint(&normalize_base_url(&self.config.base_url));
        let request = ChatRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
        };

        tracing::debug!(provider, url = %url, chars = text.chars().count(), "sending translation request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| TranslationError::Request {
                provider,
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::Status {
                provider,
                status: status.as_u16(),
                url,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|_| TranslationError::UnparsableResponse { provider })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or(TranslationError::UnparsableResponse { provider })
    }
}

#[async_trait]
impl TextTranslator for ProviderGateway {
    async fn translate(&self, text: &str) -> Result<String> {
        self.translate_text(text).await
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

/// Build a boxed translator for the given backend
pub fn translator_for(
    kind: ProviderKind,
    config: ProviderConfig,
    system_prompt: impl Into<String>,
) -> Result<Box<dyn TextTranslator>> {
    Ok(Box::new(ProviderGateway::new(kind, config, system_prompt)?))
}
