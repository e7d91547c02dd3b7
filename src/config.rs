use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub paths: PathsConfig,
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmSection,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Directory scanned for documents awaiting ingestion.
    pub pending_dir: PathBuf,
    /// Directory files are moved to once fully processed. The relocation
    /// is the durable marker of "already ingested".
    pub processed_dir: PathBuf,
    pub vector_index: PathBuf,
    pub lexical_store: PathBuf,
    pub chunk_manifest: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum tokens per chunk.
    pub chunk_size: usize,
    /// Tokens shared between consecutive chunks. Must be < chunk_size.
    #[serde(default)]
    pub overlap: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Candidates fetched from each index before fusion.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Passages surviving the rerank pass.
    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            rerank_top_k: default_rerank_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    10
}
fn default_rerank_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `openai` or `ollama`.
    pub provider: String,
    pub model: String,
    /// Expected embedding dimensionality. Every produced vector and every
    /// loaded index file is checked against this.
    pub dims: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the ollama provider.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Two independently configured language models: one generates per-chunk
/// context during ingestion, the other synthesizes answers at query time.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmSection {
    pub context: LlmConfig,
    pub generative: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// `openai`, `anthropic`, `ollama`, or `google`.
    pub provider: String,
    pub model: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct RerankConfig {
    /// Cross-encoder rerank endpoint (TEI/Jina-style `POST /rerank`).
    #[serde(default = "default_rerank_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rerank_endpoint(),
            model: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_rerank_endpoint() -> String {
    "http://localhost:8080/rerank".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Bound on concurrently processed documents.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Maximum documents per run; `None` means all pending.
    #[serde(default)]
    pub document_limit: Option<usize>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            document_limit: None,
            include_globs: default_include_globs(),
        }
    }
}

fn default_max_workers() -> usize {
    4
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.docx".to_string(),
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
    ]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Reject bad configuration before any processing starts.
pub fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!(
            "chunking.overlap ({}) must be < chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.rerank_top_k == 0 {
        anyhow::bail!("retrieval.rerank_top_k must be >= 1");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    for (name, llm) in [
        ("llm.context", &config.llm.context),
        ("llm.generative", &config.llm.generative),
    ] {
        match llm.provider.as_str() {
            "openai" | "anthropic" | "ollama" | "google" => {}
            other => anyhow::bail!(
                "Unknown {} provider: '{}'. Must be openai, anthropic, ollama, or google.",
                name,
                other
            ),
        }
    }

    if config.ingest.max_workers == 0 {
        anyhow::bail!("ingest.max_workers must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn base_config() -> Config {
        Config {
            paths: PathsConfig {
                pending_dir: PathBuf::from("data/pending"),
                processed_dir: PathBuf::from("data/processed"),
                vector_index: PathBuf::from("data/vector_index.json"),
                lexical_store: PathBuf::from("data/lexical_store.json"),
                chunk_manifest: PathBuf::from("data/chunks.json"),
            },
            chunking: ChunkingConfig {
                chunk_size: 200,
                overlap: 40,
            },
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig {
                provider: "openai".to_string(),
                model: "text-embedding-3-small".to_string(),
                dims: 1536,
                max_retries: 2,
                timeout_secs: 10,
                base_url: default_ollama_url(),
            },
            llm: LlmSection {
                context: LlmConfig {
                    provider: "ollama".to_string(),
                    model: "llama3".to_string(),
                    max_retries: 2,
                    timeout_secs: 30,
                    base_url: default_ollama_url(),
                },
                generative: LlmConfig {
                    provider: "ollama".to_string(),
                    model: "llama3".to_string(),
                    max_retries: 2,
                    timeout_secs: 30,
                    base_url: default_ollama_url(),
                },
            },
            rerank: RerankConfig::default(),
            ingest: IngestConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut cfg = base_config();
        cfg.chunking.overlap = 200;
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn unknown_embedding_provider_rejected() {
        let mut cfg = base_config();
        cfg.embedding.provider = "legalbert".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn unknown_llm_provider_rejected() {
        let mut cfg = base_config();
        cfg.llm.generative.provider = "mistral-local".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn parses_minimal_toml() {
        let toml_src = r#"
[paths]
pending_dir = "data/pending"
processed_dir = "data/processed"
vector_index = "data/vector_index.json"
lexical_store = "data/lexical_store.json"
chunk_manifest = "data/chunks.json"

[chunking]
chunk_size = 300
overlap = 50

[embedding]
provider = "openai"
model = "text-embedding-3-small"
dims = 1536

[llm.context]
provider = "anthropic"
model = "claude-sonnet-4-5"

[llm.generative]
provider = "openai"
model = "gpt-4o"
"#;
        let cfg: Config = toml::from_str(toml_src).unwrap();
        assert!(validate(&cfg).is_ok());
        assert_eq!(cfg.retrieval.top_k, 10);
        assert_eq!(cfg.ingest.max_workers, 4);
        assert_eq!(cfg.ingest.include_globs.len(), 4);
    }
}
