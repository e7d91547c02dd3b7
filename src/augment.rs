//! Chunk context augmentation via an LLM.
//!
//! For every chunk we ask a context model to describe how the chunk sits
//! inside its full document. The resulting context string is prepended to
//! the chunk text before embedding and indexing, which lifts retrieval
//! quality for chunks that are ambiguous in isolation.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::llm::TextGenerator;
use crate::prompts;

/// Wraps a context-generation model and produces situating context strings.
pub struct ContextAugmenter {
    generator: Arc<dyn TextGenerator>,
}

impl ContextAugmenter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Generate a short context for `chunk` given the full `document` text.
    pub async fn get_context(&self, chunk: &str, document: &str) -> Result<String> {
        let user = prompts::context_user_prompt(chunk, document);
        let context = self
            .generator
            .generate(prompts::CONTEXT_SYSTEM_PROMPT, &user)
            .await
            .context("context generation failed")?;
        Ok(context.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, _system: &str, user: &str) -> Result<String> {
            Ok(format!("  ctx for: {} bytes  ", user.len()))
        }
    }

    #[tokio::test]
    async fn trims_generated_context() {
        let augmenter = ContextAugmenter::new(Arc::new(EchoGenerator));
        let out = augmenter.get_context("chunk", "doc").await.unwrap();
        assert!(out.starts_with("ctx for:"));
        assert_eq!(out, out.trim());
    }
}
