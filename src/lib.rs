//! # Ragline
//!
//! A contextual retrieval pipeline for local document collections.
//!
//! Ragline ingests documents (PDF, DOCX, plain text, Markdown) from a
//! pending directory, splits them into overlapping chunks, asks a
//! language model to situate each chunk within its document, and indexes
//! the context-enriched chunks in two complementary indexes: a flat
//! vector index for semantic similarity and a BM25 store for lexical
//! match. Queries search both, fuse the candidates, and rerank them with
//! a cross-encoder.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────┐   ┌─────────────────┐
//! │ pending/ │──▶│ chunk + context   │──▶│ vector index     │
//! │ PDF DOCX │   │ + embed (workers) │   │ BM25 store       │
//! └──────────┘   └───────────────────┘   └───────┬─────────┘
//!                                                │
//!                              query ──▶ fuse ──▶ rerank ──▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ragline ingest                          # process pending documents
//! ragline query "termination notice"      # retrieve top passages
//! ragline ask "what is the notice period?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`loader`] | Pending-directory scanning and archiving |
//! | [`extract`] | Per-format text extraction |
//! | [`splitter`] | Overlapping token-window chunking |
//! | [`augment`] | LLM chunk contextualization |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`vector_index`] | Flat L2 vector index |
//! | [`lexical_index`] | BM25 lexical store |
//! | [`fuse`] | Candidate fusion and deduplication |
//! | [`rerank`] | Cross-encoder reranking |
//! | [`indexer`] | Pipeline orchestration |

pub mod augment;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fuse;
pub mod http;
pub mod indexer;
pub mod lexical_index;
pub mod llm;
pub mod loader;
pub mod models;
pub mod prompts;
pub mod rerank;
pub mod splitter;
pub mod vector_index;
