//! Flat (brute-force) vector index with JSON persistence.
//!
//! Stores fixed-dimension embedding vectors keyed by external id and
//! answers nearest-neighbor queries by exhaustive scan under squared
//! Euclidean distance (lower = more similar), matching a flat L2 index.
//! The metric is identical at build and query time.
//!
//! Entries are created by [`FlatVectorIndex::add`], never mutated, and
//! removed only by [`FlatVectorIndex::delete`] — which rebuilds the
//! backing storage with a full scan. Deletion cost is O(n); acceptable
//! at ingestion time, never on the query path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::RetrievalError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatVectorIndex {
    dims: usize,
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl FlatVectorIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append vectors with their external ids.
    ///
    /// Rejects any vector whose dimension disagrees with the index's
    /// configured dimension — checked, not assumed.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, ids: Vec<String>) -> Result<()> {
        if vectors.len() != ids.len() {
            anyhow::bail!(
                "vector/id count mismatch: {} vectors, {} ids",
                vectors.len(),
                ids.len()
            );
        }
        for v in &vectors {
            if v.len() != self.dims {
                return Err(RetrievalError::DimensionMismatch {
                    expected: self.dims,
                    actual: v.len(),
                }
                .into());
            }
        }
        self.vectors.extend(vectors);
        self.ids.extend(ids);
        Ok(())
    }

    /// Nearest neighbors of `query`, ascending squared Euclidean distance.
    /// Ties preserve insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        if query.len() != self.dims {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            }
            .into());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .map(|v| squared_l2(query, v))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, d)| (self.ids[i].clone(), d))
            .collect())
    }

    /// Remove entries by external id. Implemented as a full rebuild of the
    /// backing vectors; O(n) per call.
    pub fn delete(&mut self, ids: &[String]) {
        let doomed: std::collections::HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut kept_ids = Vec::with_capacity(self.ids.len());
        let mut kept_vectors = Vec::with_capacity(self.vectors.len());
        for (id, vector) in self.ids.drain(..).zip(self.vectors.drain(..)) {
            if !doomed.contains(id.as_str()) {
                kept_ids.push(id);
                kept_vectors.push(vector);
            }
        }
        self.ids = kept_ids;
        self.vectors = kept_vectors;
    }

    /// Serialize the full index. Writes to a temporary sibling path and
    /// renames over the target so a crash never leaves a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write vector index: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to finalize vector index: {}", path.display()))?;
        Ok(())
    }

    /// Restore the index from `path`.
    ///
    /// A missing file is [`RetrievalError::IndexNotFound`], not a crash.
    /// A stored dimension that disagrees with `expected_dims` is a hard
    /// consistency failure — the file must never be trusted.
    pub fn load(path: &Path, expected_dims: usize) -> Result<Self> {
        if !path.exists() {
            return Err(RetrievalError::IndexNotFound(path.to_path_buf()).into());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vector index: {}", path.display()))?;
        let index: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse vector index: {}", path.display()))?;
        if index.dims != expected_dims {
            return Err(RetrievalError::DimensionMismatch {
                expected: expected_dims,
                actual: index.dims,
            }
            .into());
        }
        if index.ids.len() != index.vectors.len() {
            anyhow::bail!(
                "corrupt vector index: {} ids but {} vectors",
                index.ids.len(),
                index.vectors.len()
            );
        }
        Ok(index)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_index() -> FlatVectorIndex {
        let mut index = FlatVectorIndex::new(3);
        index
            .add(
                vec![
                    vec![0.0, 0.0, 0.0],
                    vec![1.0, 0.0, 0.0],
                    vec![0.0, 2.0, 0.0],
                ],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap();
        index
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let index = sample_index();
        let results = index.search(&[0.9, 0.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(results[0].1 <= results[1].1);
        assert!(results[1].1 <= results[2].1);
    }

    #[test]
    fn search_truncates_to_k() {
        let index = sample_index();
        assert_eq!(index.search(&[0.0, 0.0, 0.0], 2).unwrap().len(), 2);
        // k beyond the corpus returns everything.
        assert_eq!(index.search(&[0.0, 0.0, 0.0], 50).unwrap().len(), 3);
    }

    #[test]
    fn wrong_dimension_vector_is_rejected() {
        let mut index = FlatVectorIndex::new(3);
        let err = index
            .add(vec![vec![1.0, 2.0]], vec!["x".into()])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetrievalError>(),
            Some(RetrievalError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn wrong_dimension_query_is_rejected() {
        let index = sample_index();
        assert!(index.search(&[1.0], 3).is_err());
    }

    #[test]
    fn delete_removes_entries() {
        let mut index = sample_index();
        index.delete(&["b".to_string()]);
        assert_eq!(index.len(), 2);
        let results = index.search(&[1.0, 0.0, 0.0], 3).unwrap();
        assert!(results.iter().all(|(id, _)| id != "b"));
    }

    #[test]
    fn save_load_round_trip_preserves_search_results() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vector_index.json");
        let index = sample_index();
        index.save(&path).unwrap();

        let restored = FlatVectorIndex::load(&path, 3).unwrap();
        let query = [0.5, 0.5, 0.0];
        assert_eq!(
            index.search(&query, 3).unwrap(),
            restored.search(&query, 3).unwrap()
        );
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = FlatVectorIndex::load(&tmp.path().join("absent.json"), 3).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetrievalError>(),
            Some(RetrievalError::IndexNotFound(_))
        ));
    }

    #[test]
    fn load_with_disagreeing_dims_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vector_index.json");
        sample_index().save(&path).unwrap();
        let err = FlatVectorIndex::load(&path, 8).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetrievalError>(),
            Some(RetrievalError::DimensionMismatch { .. })
        ));
    }
}
