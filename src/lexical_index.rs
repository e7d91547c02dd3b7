//! BM25 lexical store with JSON persistence.
//!
//! Keeps the raw document list in memory and rebuilds the Okapi BM25
//! ranking structure from the full corpus on every mutation. Rebuilding
//! is O(corpus size) and is an accepted cost at ingestion time, never at
//! query time; incremental updates are deliberately avoided because BM25
//! normalization is corpus-size-dependent.
//!
//! Tokenization is lowercase whitespace splitting — a documented
//! approximation. The same tokenizer is applied to documents and queries
//! so ranking never silently loses recall to an asymmetry.
//!
//! Persistence covers only the raw document list (`{"documents": [...]}`);
//! the ranking structure is always rebuilt on load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::RetrievalError;
use crate::models::StoreDoc;

const K1: f64 = 1.5;
const B: f64 = 0.75;
/// Floor factor for non-positive idf values, after `rank_bm25`.
const IDF_EPSILON: f64 = 0.25;

pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Okapi BM25 scoring structure over a tokenized corpus.
#[derive(Debug, Clone)]
struct Bm25Index {
    idf: HashMap<String, f64>,
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
}

impl Bm25Index {
    fn build(tokenized_corpus: &[Vec<String>]) -> Self {
        let n_docs = tokenized_corpus.len();
        let mut term_freqs = Vec::with_capacity(n_docs);
        let mut doc_lens = Vec::with_capacity(n_docs);
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for tokens in tokenized_corpus {
            doc_lens.push(tokens.len());
            let mut tf: HashMap<String, usize> = HashMap::new();
            for token in tokens {
                *tf.entry(token.clone()).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let avgdl = if n_docs == 0 {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / n_docs as f64
        };

        // Okapi idf; terms appearing in more than half the corpus come out
        // non-positive and are floored at epsilon * average idf.
        let mut idf: HashMap<String, f64> = HashMap::new();
        let mut idf_sum = 0.0;
        let mut negative_terms: Vec<String> = Vec::new();
        for (term, df) in &doc_freq {
            let value = ((n_docs as f64 - *df as f64 + 0.5) / (*df as f64 + 0.5)).ln();
            idf_sum += value;
            if value < 0.0 {
                negative_terms.push(term.clone());
            }
            idf.insert(term.clone(), value);
        }
        if !idf.is_empty() {
            let eps = IDF_EPSILON * (idf_sum / idf.len() as f64).abs();
            for term in negative_terms {
                idf.insert(term, eps);
            }
        }

        Self {
            idf,
            term_freqs,
            doc_lens,
            avgdl,
        }
    }

    fn scores(&self, query_tokens: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.term_freqs.len()];
        for term in query_tokens {
            let Some(idf) = self.idf.get(term) else {
                continue;
            };
            for (i, tf_map) in self.term_freqs.iter().enumerate() {
                let tf = *tf_map.get(term).unwrap_or(&0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let dl = self.doc_lens[i] as f64;
                let denom = tf + K1 * (1.0 - B + B * dl / self.avgdl);
                scores[i] += idf * tf * (K1 + 1.0) / denom;
            }
        }
        scores
    }
}

/// Serialized shape of the lexical store file.
#[derive(Serialize, Deserialize)]
struct StoreFile {
    documents: Vec<StoreDoc>,
}

#[derive(Debug)]
pub struct Bm25LexicalStore {
    store_path: PathBuf,
    documents: Vec<StoreDoc>,
    bm25: Option<Bm25Index>,
}

impl Bm25LexicalStore {
    /// Empty store persisting to `store_path`.
    pub fn new(store_path: &Path) -> Self {
        Self {
            store_path: store_path.to_path_buf(),
            documents: Vec::new(),
            bm25: None,
        }
    }

    /// Restore a store from disk and rebuild the ranking structure.
    /// A missing file is [`RetrievalError::IndexNotFound`].
    pub fn load(store_path: &Path) -> Result<Self> {
        if !store_path.exists() {
            return Err(RetrievalError::IndexNotFound(store_path.to_path_buf()).into());
        }
        let content = std::fs::read_to_string(store_path)
            .with_context(|| format!("Failed to read lexical store: {}", store_path.display()))?;
        let file: StoreFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse lexical store: {}", store_path.display()))?;
        let mut store = Self {
            store_path: store_path.to_path_buf(),
            documents: file.documents,
            bm25: None,
        };
        store.rebuild();
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Append documents, then rebuild the ranking structure from the full
    /// corpus.
    pub fn add_documents(&mut self, docs: Vec<StoreDoc>) {
        self.documents.extend(docs);
        self.rebuild();
    }

    /// Drop every entry for `document_id`, then rebuild.
    pub fn delete_document(&mut self, document_id: &str) {
        self.documents.retain(|d| d.document_id != document_id);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        if self.documents.is_empty() {
            self.bm25 = None;
            return;
        }
        let tokenized: Vec<Vec<String>> = self
            .documents
            .iter()
            .map(|d| tokenize(&d.content))
            .collect();
        self.bm25 = Some(Bm25Index::build(&tokenized));
    }

    /// Top-`k` documents by descending BM25 relevance. Ties preserve
    /// corpus order. Signals [`RetrievalError::IndexNotBuilt`] if no
    /// documents have ever been added.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<StoreDoc>> {
        let bm25 = self
            .bm25
            .as_ref()
            .ok_or(RetrievalError::IndexNotBuilt)?;

        let query_tokens = tokenize(query);
        let scores = bm25.scores(&query_tokens);

        let mut order: Vec<usize> = (0..self.documents.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(k);

        Ok(order.into_iter().map(|i| self.documents[i].clone()).collect())
    }

    /// Persist the raw document list. The ranking structure is never
    /// serialized. Temp-write-then-rename keeps the file whole on crash.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StoreFile {
            documents: self.documents.clone(),
        };
        let json = serde_json::to_string(&file)?;
        let tmp = self.store_path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write lexical store: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.store_path).with_context(|| {
            format!(
                "Failed to finalize lexical store: {}",
                self.store_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(id: &str, content: &str) -> StoreDoc {
        StoreDoc {
            file_path: format!("/data/{}", id),
            document_id: id.to_string(),
            content: content.to_string(),
        }
    }

    fn sample_store(path: &Path) -> Bm25LexicalStore {
        let mut store = Bm25LexicalStore::new(path);
        store.add_documents(vec![
            doc("a.txt", "the court issued a final ruling on the appeal"),
            doc("b.txt", "weather forecast rain tomorrow morning"),
            doc("c.txt", "the appeal was dismissed by the court"),
        ]);
        store
    }

    #[test]
    fn search_before_any_documents_signals_not_built() {
        let tmp = TempDir::new().unwrap();
        let store = Bm25LexicalStore::new(&tmp.path().join("lex.json"));
        let err = store.search("anything", 3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetrievalError>(),
            Some(RetrievalError::IndexNotBuilt)
        ));
    }

    #[test]
    fn relevant_documents_rank_first() {
        let tmp = TempDir::new().unwrap();
        let store = sample_store(&tmp.path().join("lex.json"));
        let results = store.search("court appeal ruling", 3).unwrap();
        assert_eq!(results.len(), 3);
        // Both court documents outrank the weather one.
        assert_ne!(results[0].document_id, "b.txt");
        assert_ne!(results[1].document_id, "b.txt");
    }

    #[test]
    fn query_tokenization_matches_document_tokenization() {
        let tmp = TempDir::new().unwrap();
        let store = sample_store(&tmp.path().join("lex.json"));
        // Case differences must not lose recall.
        let lower = store.search("court", 1).unwrap();
        let upper = store.search("COURT", 1).unwrap();
        assert_eq!(lower[0].document_id, upper[0].document_id);
    }

    #[test]
    fn delete_document_rebuilds_ranking() {
        let tmp = TempDir::new().unwrap();
        let mut store = sample_store(&tmp.path().join("lex.json"));
        store.delete_document("a.txt");
        assert_eq!(store.len(), 2);
        let results = store.search("court appeal", 3).unwrap();
        assert!(results.iter().all(|d| d.document_id != "a.txt"));
    }

    #[test]
    fn save_load_round_trip_preserves_search_results() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lex.json");
        let store = sample_store(&path);
        store.save().unwrap();

        let restored = Bm25LexicalStore::load(&path).unwrap();
        assert_eq!(
            store.search("court appeal", 2).unwrap(),
            restored.search("court appeal", 2).unwrap()
        );
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = Bm25LexicalStore::load(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetrievalError>(),
            Some(RetrievalError::IndexNotFound(_))
        ));
    }

    #[test]
    fn store_file_shape_is_documents_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lex.json");
        sample_store(&path).save().unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("documents").unwrap().is_array());
        let first = &raw["documents"][0];
        assert!(first.get("file_path").is_some());
        assert!(first.get("document_id").is_some());
        assert!(first.get("content").is_some());
    }
}
