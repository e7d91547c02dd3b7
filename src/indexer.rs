//! Ingestion and retrieval orchestration.
//!
//! The [`Indexer`] owns the two indexes, the chunk manifest, and the
//! model providers, and drives the full pipeline: load pending documents,
//! chunk and contextualize them in bounded parallel workers, merge the
//! results into both indexes atomically per document, and persist
//! everything. The same struct serves queries: embed, search both
//! indexes, fuse, rerank, and optionally synthesize an answer.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::augment::ContextAugmenter;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::RetrievalError;
use crate::fuse;
use crate::lexical_index::Bm25LexicalStore;
use crate::llm::{LlmClient, TextGenerator};
use crate::loader;
use crate::models::{
    hash_text, ChunkManifest, ChunkRecord, Document, PendingChunk, StoreDoc,
};
use crate::prompts;
use crate::rerank::{HttpCrossEncoder, PassageScorer, Reranker};
use crate::splitter;
use crate::vector_index::FlatVectorIndex;

/// Outcome of one `process_docs` run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Documents fully chunked, contextualized, and registered.
    pub processed: usize,
    /// Documents skipped because some chunk failed; they stay pending.
    pub skipped: usize,
    /// Chunks registered across all processed documents.
    pub chunks: usize,
}

pub struct Indexer {
    config: Config,
    augmenter: Arc<ContextAugmenter>,
    generative: Arc<dyn TextGenerator>,
    embedder: Arc<dyn Embedder>,
    reranker: Reranker,
    vector_index: FlatVectorIndex,
    lexical_store: Bm25LexicalStore,
    manifest: Vec<ChunkRecord>,
    pending: Vec<PendingChunk>,
}

impl Indexer {
    /// Build an indexer with the configured remote providers.
    pub fn new(config: Config) -> Result<Self> {
        let context_llm: Arc<dyn TextGenerator> = Arc::new(
            LlmClient::new(&config.llm.context).context("Failed to create context model")?,
        );
        let generative: Arc<dyn TextGenerator> = Arc::new(
            LlmClient::new(&config.llm.generative)
                .context("Failed to create generative model")?,
        );
        let embedder = create_embedder(&config.embedding)?;
        let scorer: Arc<dyn PassageScorer> = Arc::new(HttpCrossEncoder::new(&config.rerank)?);
        Ok(Self::with_providers(
            config,
            context_llm,
            generative,
            embedder,
            scorer,
        ))
    }

    /// Build an indexer for offline maintenance (state inspection,
    /// deletion). No API keys or endpoints are required; any operation
    /// that would reach a provider fails instead.
    pub fn offline(config: Config) -> Self {
        let dims = config.embedding.dims;
        Self::with_providers(
            config,
            Arc::new(UnconfiguredProvider),
            Arc::new(UnconfiguredProvider),
            Arc::new(UnconfiguredEmbedder { dims }),
            Arc::new(UnconfiguredProvider),
        )
    }

    /// Build an indexer with injected providers. Used by tests.
    pub fn with_providers(
        config: Config,
        context_llm: Arc<dyn TextGenerator>,
        generative: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        scorer: Arc<dyn PassageScorer>,
    ) -> Self {
        let vector_index = FlatVectorIndex::new(config.embedding.dims);
        let lexical_store = Bm25LexicalStore::new(&config.paths.lexical_store);
        Self {
            augmenter: Arc::new(ContextAugmenter::new(context_llm)),
            generative,
            embedder,
            reranker: Reranker::new(scorer),
            vector_index,
            lexical_store,
            manifest: Vec::new(),
            pending: Vec::new(),
            config,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.manifest.len() + self.pending.len()
    }

    /// Restore prior on-disk state, if any.
    ///
    /// The three artifacts (vector index, lexical store, chunk manifest)
    /// are written together, so partial presence means a broken install
    /// and is always an error. With `strict` set, so is full absence.
    pub fn load_state(&mut self, strict: bool) -> Result<()> {
        let paths = &self.config.paths;
        let present = [
            paths.vector_index.exists(),
            paths.lexical_store.exists(),
            paths.chunk_manifest.exists(),
        ];
        if present.iter().all(|p| !p) {
            if strict {
                bail!(
                    "No prior index state found under {} (required for an update run)",
                    paths.vector_index.display()
                );
            }
            return Ok(());
        }
        if !present.iter().all(|p| *p) {
            bail!(
                "Partial index state: vector_index={}, lexical_store={}, chunk_manifest={}. \
                 Refusing to load.",
                present[0],
                present[1],
                present[2]
            );
        }

        let vector_index =
            FlatVectorIndex::load(&paths.vector_index, self.config.embedding.dims)?;
        let lexical_store = Bm25LexicalStore::load(&paths.lexical_store)?;
        let manifest_json = std::fs::read_to_string(&paths.chunk_manifest)
            .with_context(|| format!("Failed to read manifest: {}", paths.chunk_manifest.display()))?;
        let manifest: ChunkManifest = serde_json::from_str(&manifest_json)
            .with_context(|| format!("Failed to parse manifest: {}", paths.chunk_manifest.display()))?;

        if manifest.chunks.len() != vector_index.len() {
            bail!(
                "Inconsistent state: manifest has {} chunks but vector index has {} entries",
                manifest.chunks.len(),
                vector_index.len()
            );
        }

        self.vector_index = vector_index;
        self.lexical_store = lexical_store;
        self.manifest = manifest.chunks;
        Ok(())
    }

    /// Process up to `limit` pending documents in parallel.
    ///
    /// Each document is handled by one worker: chunk, generate context,
    /// embed, then register all chunks and move the file in one step
    /// under the accumulator lock. A document whose any chunk fails is
    /// skipped whole and stays pending; the run continues.
    pub async fn process_docs(&mut self, limit: Option<usize>) -> Result<ProcessReport> {
        let limit = limit.or(self.config.ingest.document_limit);
        let documents = loader::load_documents(&self.config, limit)?;
        if documents.is_empty() {
            println!("No pending documents to process.");
            return Ok(ProcessReport::default());
        }
        println!("Processing {} document(s)...", documents.len());

        let accumulator: Arc<Mutex<Vec<PendingChunk>>> = Arc::new(Mutex::new(Vec::new()));
        let semaphore = Arc::new(Semaphore::new(self.config.ingest.max_workers));
        let mut join_set: JoinSet<(String, Result<usize>)> = JoinSet::new();

        for document in documents {
            let config = self.config.clone();
            let augmenter = Arc::clone(&self.augmenter);
            let embedder = Arc::clone(&self.embedder);
            let accumulator = Arc::clone(&accumulator);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let document_id = document.document_id();
                let result = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .context("worker semaphore closed")?;
                    process_document(&config, &augmenter, embedder.as_ref(), &document, &accumulator)
                        .await
                }
                .await;
                (document_id, result)
            });
        }

        let mut report = ProcessReport::default();
        while let Some(joined) = join_set.join_next().await {
            let (document_id, result) = joined.context("document worker panicked")?;
            match result {
                Ok(chunk_count) => {
                    println!("  {} -> {} chunk(s)", document_id, chunk_count);
                    report.processed += 1;
                    report.chunks += chunk_count;
                }
                Err(e) => {
                    eprintln!("Warning: skipping {}: {:#}", document_id, e);
                    report.skipped += 1;
                }
            }
        }

        let mut registered = Arc::try_unwrap(accumulator)
            .map_err(|_| anyhow::anyhow!("accumulator still shared after join"))?
            .into_inner();
        self.pending.append(&mut registered);
        Ok(report)
    }

    /// Merge every registered chunk into both indexes and persist all
    /// three artifacts. No provider calls happen here; embeddings were
    /// computed during registration.
    pub fn build_index(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            println!("No new chunks; indexes unchanged.");
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        let mut vectors = Vec::with_capacity(pending.len());
        let mut ids = Vec::with_capacity(pending.len());
        let mut store_docs = Vec::with_capacity(pending.len());
        let mut records = Vec::with_capacity(pending.len());
        for chunk in pending {
            vectors.push(chunk.embedding);
            ids.push(chunk.record.external_id.clone());
            store_docs.push(StoreDoc {
                file_path: chunk.record.file_path.clone(),
                document_id: chunk.record.document_id.clone(),
                content: chunk.record.combined_text(),
            });
            records.push(chunk.record);
        }

        let added = records.len();
        self.vector_index.add(vectors, ids)?;
        self.lexical_store.add_documents(store_docs);
        self.manifest.extend(records);

        self.vector_index.save(&self.config.paths.vector_index)?;
        self.lexical_store.save()?;
        self.save_chunks()?;
        println!(
            "Indexed {} new chunk(s); {} total.",
            added,
            self.manifest.len()
        );
        Ok(())
    }

    /// Persist the chunk manifest next to the index files.
    pub fn save_chunks(&self) -> Result<()> {
        let path = &self.config.paths.chunk_manifest;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let manifest = ChunkManifest {
            generated_at: chrono::Utc::now().timestamp(),
            chunks: self.manifest.clone(),
        };
        let json = serde_json::to_string(&manifest)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write manifest: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to finalize manifest: {}", path.display()))?;
        Ok(())
    }

    /// Remove every chunk of a document from both indexes and persist.
    pub fn delete_document(&mut self, document_id: &str) -> Result<usize> {
        let doomed: Vec<String> = self
            .manifest
            .iter()
            .filter(|c| c.document_id == document_id)
            .map(|c| c.external_id.clone())
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        self.vector_index.delete(&doomed);
        self.lexical_store.delete_document(document_id);
        self.manifest.retain(|c| c.document_id != document_id);

        self.vector_index.save(&self.config.paths.vector_index)?;
        self.lexical_store.save()?;
        self.save_chunks()?;
        Ok(doomed.len())
    }

    /// Full ingestion run: restore prior state, process pending
    /// documents, merge and persist.
    ///
    /// `update` requires prior state on disk; a fresh run tolerates its
    /// absence and starts empty.
    pub async fn run_ingest(&mut self, update: bool, limit: Option<usize>) -> Result<ProcessReport> {
        self.load_state(update)
            .context("Failed to load prior index state")?;
        let report = self
            .process_docs(limit)
            .await
            .context("Document processing failed")?;
        self.build_index().context("Failed to build indexes")?;
        if report.skipped > 0 {
            eprintln!(
                "Warning: {} document(s) skipped; they remain pending.",
                report.skipped
            );
        }
        Ok(report)
    }

    /// Hybrid retrieval: embed the query, search both indexes, fuse, and
    /// rerank down to the configured passage count.
    ///
    /// An empty query is a usage error and surfaces as
    /// [`RetrievalError::EmptyQuery`]. Failures past that point degrade
    /// to an empty result with a warning.
    pub async fn query_index(&mut self, query: &str, keep_duplicates: bool) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery.into());
        }
        match self.query_inner(query, keep_duplicates).await {
            Ok(passages) => Ok(passages),
            Err(e) => {
                eprintln!("Warning: retrieval failed: {e:#}");
                Ok(Vec::new())
            }
        }
    }

    async fn query_inner(&mut self, query: &str, keep_duplicates: bool) -> Result<Vec<String>> {
        if self.manifest.is_empty() {
            self.load_state(true)
                .context("No index to query; run ingest first")?;
        }

        let top_k = self.config.retrieval.top_k;
        let query_vector = self
            .embedder
            .embed(query)
            .await
            .context("Failed to embed query")?;

        let by_id: HashMap<&str, &ChunkRecord> = self
            .manifest
            .iter()
            .map(|c| (c.external_id.as_str(), c))
            .collect();
        let mut vector_results = Vec::new();
        for (id, _distance) in self.vector_index.search(&query_vector, top_k)? {
            match by_id.get(id.as_str()) {
                Some(record) => vector_results.push(record.combined_text()),
                None => bail!("vector index returned unknown chunk id: {id}"),
            }
        }

        let lexical_results: Vec<String> = self
            .lexical_store
            .search(query, top_k)?
            .into_iter()
            .map(|d| d.content)
            .collect();

        let fused = fuse::merge(vector_results, lexical_results, keep_duplicates);
        let top = self
            .reranker
            .rerank(query, fused, self.config.retrieval.rerank_top_k)
            .await;
        Ok(top)
    }

    /// Answer a question from the indexed corpus.
    ///
    /// When retrieval yields nothing the generative model is not called
    /// at all; the caller gets a fixed no-context reply.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let passages = self.query_index(question, false).await?;
        if passages.is_empty() {
            return Ok(
                "No relevant passages were found in the indexed documents, so the question \
                 cannot be answered from the available sources."
                    .to_string(),
            );
        }
        let user = prompts::answer_user_prompt(question, &passages);
        self.generative
            .generate(prompts::ANSWER_SYSTEM_PROMPT, &user)
            .await
            .context("Answer generation failed")
    }
}

/// Estimate an ingest run without touching any provider or writing any
/// state: extract and chunk each pending document, returning
/// `(document id, chunk count)` pairs in processing order.
pub fn preview_ingest(config: &Config, limit: Option<usize>) -> Result<Vec<(String, usize)>> {
    let limit = limit.or(config.ingest.document_limit);
    let documents = loader::load_documents(config, limit)?;
    let mut rows = Vec::with_capacity(documents.len());
    for document in &documents {
        let chunks = splitter::split(
            &document.content,
            config.chunking.chunk_size,
            config.chunking.overlap,
        )?;
        rows.push((document.document_id(), chunks.len()));
    }
    Ok(rows)
}

/// Placeholder providers for [`Indexer::offline`]. Every call is an
/// error; offline maintenance never makes one.
struct UnconfiguredProvider;

#[async_trait]
impl TextGenerator for UnconfiguredProvider {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        bail!("no text generation provider configured")
    }
}

#[async_trait]
impl PassageScorer for UnconfiguredProvider {
    async fn score(&self, _query: &str, _candidates: &[String]) -> Result<Vec<f32>> {
        bail!("no rerank provider configured")
    }
}

struct UnconfiguredEmbedder {
    dims: usize,
}

#[async_trait]
impl Embedder for UnconfiguredEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("no embedding provider configured")
    }
}

/// Process one document end to end and register its chunks.
///
/// All chunks are appended and the source file moved under one lock
/// acquisition; if the move fails the appended chunks are rolled back,
/// so a document is either fully registered or untouched.
async fn process_document(
    config: &Config,
    augmenter: &ContextAugmenter,
    embedder: &dyn Embedder,
    document: &Document,
    accumulator: &Mutex<Vec<PendingChunk>>,
) -> Result<usize> {
    let texts = splitter::split(
        &document.content,
        config.chunking.chunk_size,
        config.chunking.overlap,
    )?;
    if texts.is_empty() {
        bail!("document produced no chunks");
    }

    let document_id = document.document_id();
    let file_path = document.file_path.to_string_lossy().to_string();
    let mut chunks = Vec::with_capacity(texts.len());
    for (i, text) in texts.into_iter().enumerate() {
        let context = augmenter
            .get_context(&text, &document.content)
            .await
            .with_context(|| format!("chunk {i}: context generation failed"))?;
        let combined = crate::models::combined_text(&context, &text);
        let embedding = embedder
            .embed(&combined)
            .await
            .with_context(|| format!("chunk {i}: embedding failed"))?;
        if embedding.len() != embedder.dims() {
            return Err(RetrievalError::DimensionMismatch {
                expected: embedder.dims(),
                actual: embedding.len(),
            })
            .with_context(|| format!("chunk {i}: embedding dimension check failed"));
        }
        chunks.push(PendingChunk {
            record: ChunkRecord {
                external_id: Uuid::new_v4().to_string(),
                document_id: document_id.clone(),
                file_path: file_path.clone(),
                hash: hash_text(&text),
                text,
                context,
            },
            embedding,
        });
    }

    let count = chunks.len();
    let mut registered = accumulator.lock().await;
    let checkpoint = registered.len();
    registered.extend(chunks);
    if let Err(e) = loader::mark_processed(config, &document.file_path) {
        registered.truncate(checkpoint);
        return Err(e).context("failed to archive processed file");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_report_defaults_to_zero() {
        let report = ProcessReport::default();
        assert_eq!(
            report,
            ProcessReport {
                processed: 0,
                skipped: 0,
                chunks: 0
            }
        );
    }
}
