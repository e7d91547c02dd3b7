//! Cross-encoder reranking of fused candidates.
//!
//! Candidates surviving fusion are scored jointly with the query by a
//! cross-encoder served over HTTP (TEI/Jina-style `POST /rerank`), then
//! sorted by descending relevance and truncated. A rerank failure degrades
//! to an empty result rather than aborting the query.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::RerankConfig;
use crate::http;

/// Scores query/passage pairs. One score per candidate, same order.
#[async_trait]
pub trait PassageScorer: Send + Sync {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;
}

/// `PassageScorer` backed by a remote cross-encoder endpoint.
pub struct HttpCrossEncoder {
    endpoint: String,
    model: Option<String>,
    max_retries: u32,
    client: reqwest::Client,
}

impl HttpCrossEncoder {
    pub fn new(config: &RerankConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl PassageScorer for HttpCrossEncoder {
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        let mut body = json!({
            "query": query,
            "documents": candidates,
        });
        if let Some(model) = &self.model {
            body["model"] = json!(model);
        }
        let response = http::post_json_with_retry(
            &self.client,
            &self.endpoint,
            &[],
            &body,
            self.max_retries,
        )
        .await?;

        let results = response["results"]
            .as_array()
            .context("rerank response missing results array")?;
        let mut scores = vec![f32::NEG_INFINITY; candidates.len()];
        for entry in results {
            let index = entry["index"]
                .as_u64()
                .context("rerank result missing index")? as usize;
            let score = entry["relevance_score"]
                .as_f64()
                .context("rerank result missing relevance_score")? as f32;
            if index >= scores.len() {
                bail!("rerank result index {index} out of range");
            }
            scores[index] = score;
        }
        Ok(scores)
    }
}

pub struct Reranker {
    scorer: Arc<dyn PassageScorer>,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn PassageScorer>) -> Self {
        Self { scorer }
    }

    /// Score and reorder `candidates`, keeping the `top_k` most relevant.
    ///
    /// On scorer failure or a malformed score vector this logs a warning
    /// and returns an empty list.
    pub async fn rerank(&self, query: &str, candidates: Vec<String>, top_k: usize) -> Vec<String> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let scores = match self.scorer.score(query, &candidates).await {
            Ok(scores) => scores,
            Err(e) => {
                eprintln!("Warning: rerank failed, returning no passages: {e:#}");
                return Vec::new();
            }
        };
        if scores.len() != candidates.len() {
            eprintln!(
                "Warning: rerank returned {} scores for {} candidates, returning no passages",
                scores.len(),
                candidates.len()
            );
            return Vec::new();
        }
        rank_by_scores(candidates, &scores, top_k)
    }
}

/// Stable descending sort by score, truncated to `top_k`.
fn rank_by_scores(candidates: Vec<String>, scores: &[f32], top_k: usize) -> Vec<String> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order.truncate(top_k);

    let mut slots: Vec<Option<String>> = candidates.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer(Vec<f32>);

    #[async_trait]
    impl PassageScorer for FixedScorer {
        async fn score(&self, _query: &str, _candidates: &[String]) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenScorer;

    #[async_trait]
    impl PassageScorer for BrokenScorer {
        async fn score(&self, _query: &str, _candidates: &[String]) -> Result<Vec<f32>> {
            bail!("cross-encoder unreachable")
        }
    }

    fn passages(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranks_descending_and_truncates() {
        let ranked = rank_by_scores(passages(&["a", "b", "c"]), &[0.1, 0.9, 0.5], 2);
        assert_eq!(ranked, passages(&["b", "c"]));
    }

    #[test]
    fn equal_scores_preserve_input_order() {
        let ranked = rank_by_scores(passages(&["a", "b", "c"]), &[0.5, 0.5, 0.5], 3);
        assert_eq!(ranked, passages(&["a", "b", "c"]));
    }

    #[tokio::test]
    async fn scorer_failure_returns_empty() {
        let reranker = Reranker::new(Arc::new(BrokenScorer));
        let out = reranker.rerank("q", passages(&["a", "b"]), 2).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn score_count_mismatch_returns_empty() {
        let reranker = Reranker::new(Arc::new(FixedScorer(vec![1.0])));
        let out = reranker.rerank("q", passages(&["a", "b"]), 2).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn reranks_fused_candidates() {
        let reranker = Reranker::new(Arc::new(FixedScorer(vec![0.2, 0.8, 0.4])));
        let out = reranker.rerank("q", passages(&["a", "b", "c"]), 2).await;
        assert_eq!(out, passages(&["b", "c"]));
    }
}
