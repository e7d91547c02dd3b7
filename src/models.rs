//! Core data models that flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// A raw document loaded from the pending directory. Source of truth for
/// chunking; ephemeral once chunked and archived.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_path: PathBuf,
    pub content: String,
}

impl Document {
    /// Stable document identifier: the file's base name.
    pub fn document_id(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.file_path.to_string_lossy().to_string())
    }
}

/// One fully processed chunk, as persisted in the chunk manifest.
///
/// `external_id` is minted once at ingestion time and never reused; it
/// correlates the vector index entry with the manifest entry across
/// rebuilds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub external_id: String,
    pub document_id: String,
    pub file_path: String,
    /// Raw chunk text produced by the splitter.
    pub text: String,
    /// Contextual summary produced by the language model.
    pub context: String,
    /// SHA-256 of the raw chunk text.
    pub hash: String,
}

impl ChunkRecord {
    /// The unit actually embedded and stored in the lexical index.
    pub fn combined_text(&self) -> String {
        combined_text(&self.context, &self.text)
    }
}

/// Fixed textual template joining a chunk with its generated context.
/// Both indexes always store this exact form so they never diverge.
pub fn combined_text(context: &str, chunk: &str) -> String {
    format!("{}\n\n{}", context, chunk)
}

/// A chunk registered during the current run, not yet merged into the
/// indexes. Carries its embedding so `build_index` performs no further
/// provider calls.
#[derive(Debug, Clone)]
pub struct PendingChunk {
    pub record: ChunkRecord,
    pub embedding: Vec<f32>,
}

/// An entry in the lexical store: searchable content plus the document
/// association needed for deletion by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreDoc {
    pub file_path: String,
    pub document_id: String,
    pub content: String,
}

/// The chunk manifest persisted alongside the two index files. Sufficient
/// to reconstruct the orchestrator's state without re-running extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkManifest {
    pub generated_at: i64,
    pub chunks: Vec<ChunkRecord>,
}

/// SHA-256 hex digest of a text, used for manifest staleness checks.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_text_template_is_fixed() {
        assert_eq!(combined_text("ctx", "body"), "ctx\n\nbody");
    }

    #[test]
    fn document_id_is_base_name() {
        let doc = Document {
            file_path: PathBuf::from("/data/pending/ruling_17.pdf"),
            content: String::new(),
        };
        assert_eq!(doc.document_id(), "ruling_17.pdf");
    }

    #[test]
    fn hash_text_is_deterministic() {
        assert_eq!(hash_text("alpha"), hash_text("alpha"));
        assert_ne!(hash_text("alpha"), hash_text("beta"));
    }
}
