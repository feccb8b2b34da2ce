//! Configuration management for toolchat.
//!
//! Configuration is read from environment variables:
//! - `OPENROUTER_API_KEY` - Preferred. Routes requests through OpenRouter.
//! - `OPENAI_API_KEY` - Used when no OpenRouter key is set.
//! - `OPENAI_MODEL` - Optional. Defaults to `openai/gpt-4o-mini` on OpenRouter, `gpt-4o-mini` on OpenAI.
//! - `OPENAI_BASE_URL` - Optional. Overrides the provider endpoint.
//! - `MAX_TOKENS` - Optional. Defaults to `1000`.
//! - `TEMPERATURE` - Optional. Defaults to `0.7`, must be within `0.0..=2.0`.
//! - `SYSTEM_PROMPT` - Optional. Replaces the built-in system prompt.
//! - `TOOLS_DIR` - Optional. Directory of tool manifests. Defaults to the built-in catalog.
//! - `SAVE_DIR` - Optional. Where saved conversations go. Defaults to `.`.
//! - `TURN_TIMEOUT_SECS` - Optional. Abandon a turn after this many seconds.
//! - `HTTP_REFERER` / `X_TITLE` - Optional. OpenRouter attribution headers.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::agent::DEFAULT_SYSTEM_PROMPT;
use crate::llm::CompletionOptions;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Set OPENROUTER_API_KEY or OPENAI_API_KEY")]
    MissingCredentials,

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Which API the key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
    OpenAi,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenRouter => OPENROUTER_BASE_URL,
            Provider::OpenAi => OPENAI_BASE_URL,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openai/gpt-4o-mini",
            Provider::OpenAi => "gpt-4o-mini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenRouter => f.write_str("OpenRouter"),
            Provider::OpenAi => f.write_str("OpenAI"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,

    pub api_key: String,

    /// Chat-completions base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Model identifier in the provider's format
    pub model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    pub system_prompt: String,

    /// Manifest directory; `None` means the built-in catalog
    pub tools_dir: Option<PathBuf>,

    pub save_dir: PathBuf,

    /// Caller-level limit for one turn
    pub turn_timeout: Option<Duration>,

    pub http_referer: String,

    pub x_title: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredentials` if neither API key is set and
    /// `ConfigError::InvalidValue` for unparseable numbers.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let (provider, api_key) = match (var("OPENROUTER_API_KEY"), var("OPENAI_API_KEY")) {
            (Some(key), _) => (Provider::OpenRouter, key),
            (None, Some(key)) => (Provider::OpenAi, key),
            (None, None) => return Err(ConfigError::MissingCredentials),
        };
        warn_on_unusual_key(provider, &api_key);

        let base_url = var("OPENAI_BASE_URL")
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let model = var("OPENAI_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let max_tokens = var("MAX_TOKENS")
            .map(|v| parse_max_tokens(&v))
            .transpose()?
            .unwrap_or(1000);

        let temperature = var("TEMPERATURE")
            .map(|v| parse_temperature(&v))
            .transpose()?
            .unwrap_or(0.7);

        let system_prompt = var("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let turn_timeout = var("TURN_TIMEOUT_SECS")
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| {
                        ConfigError::InvalidValue(
                            "TURN_TIMEOUT_SECS".to_string(),
                            format!("expected a positive number of seconds, got: {}", v),
                        )
                    })
            })
            .transpose()?;

        Ok(Self {
            provider,
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
            system_prompt,
            tools_dir: var("TOOLS_DIR").map(PathBuf::from),
            save_dir: var("SAVE_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            turn_timeout,
            http_referer: var("HTTP_REFERER").unwrap_or_else(|| "http://localhost".to_string()),
            x_title: var("X_TITLE").unwrap_or_else(|| "toolchat".to_string()),
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(provider: Provider, api_key: String, model: String) -> Self {
        Self {
            provider,
            api_key,
            base_url: provider.default_base_url().to_string(),
            model,
            max_tokens: 1000,
            temperature: 0.7,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tools_dir: None,
            save_dir: PathBuf::from("."),
            turn_timeout: None,
            http_referer: "http://localhost".to_string(),
            x_title: "toolchat".to_string(),
        }
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

fn parse_max_tokens(value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        Ok(n) => Err(ConfigError::InvalidValue(
            "MAX_TOKENS".to_string(),
            format!("must be at least 1, got: {}", n),
        )),
        Err(e) => Err(ConfigError::InvalidValue("MAX_TOKENS".to_string(), format!("{}", e))),
    }
}

fn parse_temperature(value: &str) -> Result<f32, ConfigError> {
    match value.trim().parse::<f32>() {
        Ok(t) if (0.0..=2.0).contains(&t) => Ok(t),
        Ok(t) => Err(ConfigError::InvalidValue(
            "TEMPERATURE".to_string(),
            format!("must be within 0.0..=2.0, got: {}", t),
        )),
        Err(e) => Err(ConfigError::InvalidValue("TEMPERATURE".to_string(), format!("{}", e))),
    }
}

/// Whether `key` looks like a key issued by `provider`.
pub fn key_looks_valid(provider: Provider, key: &str) -> bool {
    let pattern = match provider {
        Provider::OpenRouter => r"^sk-or-(v1-)?[A-Za-z0-9]{16,}$",
        Provider::OpenAi => r"^sk-[A-Za-z0-9_\-]{16,}$",
    };
    Regex::new(pattern)
        .map(|re| re.is_match(key.trim()))
        .unwrap_or(true)
}

fn warn_on_unusual_key(provider: Provider, key: &str) {
    if !key_looks_valid(provider, key) {
        tracing::warn!(
            "{} API key does not look like a {} key; requests may be rejected",
            provider,
            provider
        );
    }
}
