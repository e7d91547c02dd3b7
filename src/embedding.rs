//! Embedding providers.
//!
//! Embeddings are produced by a remote model over HTTP. Two backends are
//! supported: the OpenAI embeddings API and a local Ollama server. Both
//! return dense float vectors whose dimensionality must match the
//! configured index dimensionality.

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::EmbeddingConfig;
use crate::http;

/// A provider that turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Vector dimensionality this embedder produces.
    fn dims(&self) -> usize;

    /// Model identifier, recorded alongside persisted indexes.
    fn model_name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the configured embedder.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set for the openai embedding provider")?;
            Ok(Arc::new(OpenAiEmbedder {
                model: config.model.clone(),
                dims: config.dims,
                api_key,
                max_retries: config.max_retries,
                client: http::client(config.timeout_secs)?,
            }))
        }
        "ollama" => Ok(Arc::new(OllamaEmbedder {
            model: config.model.clone(),
            dims: config.dims,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })),
        other => bail!("unknown embedding provider: {other}"),
    }
}

struct OpenAiEmbedder {
    model: String,
    dims: usize,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.model,
            "input": text,
        });
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let response = http::post_json_with_retry(
            &self.client,
            "https://api.openai.com/v1/embeddings",
            &headers,
            &body,
            self.max_retries,
        )
        .await?;
        parse_embedding(&response["data"][0]["embedding"])
            .context("openai embeddings response missing data[0].embedding")
    }
}

struct OllamaEmbedder {
    model: String,
    dims: usize,
    base_url: String,
    max_retries: u32,
    client: reqwest::Client,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.model,
            "prompt": text,
        });
        let url = format!("{}/api/embeddings", self.base_url);
        let response = http::post_json_with_retry(
            &self.client,
            &url,
            &[],
            &body,
            self.max_retries,
        )
        .await?;
        parse_embedding(&response["embedding"])
            .context("ollama embeddings response missing embedding field")
    }
}

fn parse_embedding(value: &serde_json::Value) -> Result<Vec<f32>> {
    let array = match value.as_array() {
        Some(array) => array,
        None => bail!("embedding field is not an array"),
    };
    let mut out = Vec::with_capacity(array.len());
    for item in array {
        match item.as_f64() {
            Some(f) => out.push(f as f32),
            None => bail!("embedding array contains a non-numeric value"),
        }
    }
    Ok(out)
}
