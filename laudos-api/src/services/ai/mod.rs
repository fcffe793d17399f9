//! Language-model text generation
//!
//! Three hosted providers implement one [`TextGenerator`] capability. The
//! active provider comes from configuration; API keys resolve from the
//! environment first, then TOML.

pub mod providers;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use laudos_common::config::{resolve_secret, AiConfig};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use providers::{AnthropicClient, ChatCompletionsClient};

/// Environment variable overriding `ai.provider`
pub const PROVIDER_ENV: &str = "LAUDOS_AI_PROVIDER";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Text generation errors
#[derive(Debug, Clone, Error)]
pub enum AiError {
    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(AiProvider),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Provider returned no text")]
    EmptyResponse,
}

/// Hosted provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    OpenAi,
    OpenRouter,
    Anthropic,
}

impl AiProvider {
    pub const ALL: [AiProvider; 3] = [AiProvider::OpenAi, AiProvider::OpenRouter, AiProvider::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::OpenRouter => "openrouter",
            AiProvider::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "gpt-3.5-turbo",
            AiProvider::OpenRouter => "anthropic/claude-sonnet-4",
            AiProvider::Anthropic => "claude-3-haiku-20240307",
        }
    }

    pub fn default_max_tokens(&self) -> u32 {
        match self {
            AiProvider::OpenAi => 1000,
            AiProvider::OpenRouter => 20000,
            AiProvider::Anthropic => 1000,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "https://api.openai.com/v1/chat/completions",
            AiProvider::OpenRouter => "https://openrouter.ai/api/v1/chat/completions",
            AiProvider::Anthropic => "https://api.anthropic.com/v1/messages",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn key_env_var(&self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OPENAI_API_KEY",
            AiProvider::OpenRouter => "OPENROUTER_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn toml_key<'a>(&self, config: &'a AiConfig) -> Option<&'a str> {
        match self {
            AiProvider::OpenAi => config.openai_api_key.as_deref(),
            AiProvider::OpenRouter => config.openrouter_api_key.as_deref(),
            AiProvider::Anthropic => config.anthropic_api_key.as_deref(),
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(AiProvider::OpenAi),
            "openrouter" => Ok(AiProvider::OpenRouter),
            "anthropic" => Ok(AiProvider::Anthropic),
            other => Err(AiError::UnknownProvider(other.to_string())),
        }
    }
}

/// Prompt in, text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> AiProvider;

    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Effective AI settings after env/TOML resolution
#[derive(Debug, Clone)]
pub struct AiSettings {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub medical_context: bool,
    /// Providers with an API key present
    pub available: Vec<AiProvider>,
}

impl AiSettings {
    /// Resolve provider and keys from the environment and TOML
    pub fn resolve(config: &AiConfig) -> Result<Self, AiError> {
        let provider_name = std::env::var(PROVIDER_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| config.provider.clone());
        let provider: AiProvider = provider_name.parse()?;

        let mut available = Vec::new();
        let mut api_key = None;
        for candidate in AiProvider::ALL {
            if let Some((key, source)) =
                resolve_secret(candidate.key_env_var(), candidate.toml_key(config))
            {
                available.push(candidate);
                if candidate == provider {
                    info!("{} API key loaded from {}", candidate, source);
                    api_key = Some(key);
                }
            }
        }

        if api_key.is_none() {
            warn!(
                "No API key for AI provider {} (set {} or ai.{}_api_key); report generation disabled",
                provider,
                provider.key_env_var(),
                provider
            );
        }

        Ok(Self {
            provider,
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            max_tokens: config.max_tokens.unwrap_or_else(|| provider.default_max_tokens()),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            medical_context: config.medical_context,
            available,
        })
    }
}

/// Build the configured provider client
pub fn build_generator(settings: &AiSettings) -> Result<Arc<dyn TextGenerator>, AiError> {
    let api_key = settings
        .api_key
        .clone()
        .ok_or(AiError::MissingApiKey(settings.provider))?;

    let generator: Arc<dyn TextGenerator> = match settings.provider {
        AiProvider::OpenAi | AiProvider::OpenRouter => Arc::new(ChatCompletionsClient::new(
            settings.provider,
            api_key,
            settings.model.clone(),
            settings.max_tokens,
            settings.request_timeout,
        )?),
        AiProvider::Anthropic => Arc::new(AnthropicClient::new(
            api_key,
            settings.model.clone(),
            settings.max_tokens,
            settings.request_timeout,
        )?),
    };

    Ok(generator)
}
