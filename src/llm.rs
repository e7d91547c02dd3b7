//! Pluggable text-generation providers.
//!
//! The provider name from configuration is resolved once, at
//! construction, into a tagged [`LlmProvider`] variant; an unrecognized
//! name is a hard configuration error raised before any request is
//! attempted. All providers satisfy the same capability interface,
//! [`TextGenerator`]: `(system prompt, user prompt) → text`.
//!
//! API keys are read from the environment (`OPENAI_API_KEY`,
//! `ANTHROPIC_API_KEY`, `GOOGLE_API_KEY`) and verified at construction
//! for the providers that need them.

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::http;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
    Google,
}

impl LlmProvider {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            "google" => Ok(Self::Google),
            other => bail!(
                "Unknown LLM provider: '{}'. Must be openai, anthropic, ollama, or google.",
                other
            ),
        }
    }
}

pub struct LlmClient {
    provider: LlmProvider,
    model: String,
    api_key: Option<String>,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let provider = LlmProvider::parse(&config.provider)?;

        let api_key = match provider {
            LlmProvider::OpenAi => Some(require_env("OPENAI_API_KEY")?),
            LlmProvider::Anthropic => Some(require_env("ANTHROPIC_API_KEY")?),
            LlmProvider::Google => Some(require_env("GOOGLE_API_KEY")?),
            LlmProvider::Ollama => None,
        };

        Ok(Self {
            provider,
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }

    async fn generate_openai(&self, system: &str, user: &str) -> Result<String> {
        let key = self.api_key.as_deref().unwrap_or_default();
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let json = http::post_json_with_retry(
            &self.client,
            "https://api.openai.com/v1/chat/completions",
            &[("Authorization", format!("Bearer {}", key))],
            &body,
            self.max_retries,
        )
        .await?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
    }

    async fn generate_anthropic(&self, system: &str, user: &str) -> Result<String> {
        let key = self.api_key.clone().unwrap_or_default();
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": 1024,
            "system": system,
            "messages": [{"role": "user", "content": user}],
        });
        let json = http::post_json_with_retry(
            &self.client,
            "https://api.anthropic.com/v1/messages",
            &[
                ("x-api-key", key),
                ("anthropic-version", "2023-06-01".to_string()),
            ],
            &body,
            self.max_retries,
        )
        .await?;
        json["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid Anthropic response: missing content text"))
    }

    async fn generate_ollama(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "stream": false,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let json =
            http::post_json_with_retry(&self.client, &url, &[], &body, self.max_retries).await?;
        json["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message content"))
    }

    async fn generate_google(&self, system: &str, user: &str) -> Result<String> {
        let key = self.api_key.as_deref().unwrap_or_default();
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, key
        );
        let body = serde_json::json!({
            "system_instruction": {"parts": [{"text": system}]},
            "contents": [{"parts": [{"text": user}]}],
        });
        let json =
            http::post_json_with_retry(&self.client, &url, &[], &body, self.max_retries).await?;
        json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid Google response: missing candidate text"))
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        match self.provider {
            LlmProvider::OpenAi => self.generate_openai(system, user).await,
            LlmProvider::Anthropic => self.generate_anthropic(system, user).await,
            LlmProvider::Ollama => self.generate_ollama(system, user).await,
            LlmProvider::Google => self.generate_google(system, user).await,
        }
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable not set", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_providers_parse() {
        for name in ["openai", "anthropic", "ollama", "google"] {
            assert!(LlmProvider::parse(name).is_ok());
        }
    }

    #[test]
    fn unknown_provider_is_a_configuration_error() {
        let err = LlmProvider::parse("mistral-local").unwrap_err();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
