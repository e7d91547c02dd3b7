//! # Ragline CLI
//!
//! The `ragline` binary drives the contextual retrieval pipeline: ingest
//! pending documents into the hybrid indexes, retrieve passages for a
//! query, or ask a question and get a synthesized answer.
//!
//! ## Usage
//!
//! ```bash
//! ragline --config ./config/ragline.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragline ingest` | Chunk, contextualize, embed, and index pending documents |
//! | `ragline query "<text>"` | Retrieve the top reranked passages |
//! | `ragline ask "<question>"` | Answer a question from the indexed corpus |
//! | `ragline delete <document-id>` | Remove a document's chunks from both indexes |
//!
//! ## Examples
//!
//! ```bash
//! # Process every pending document
//! ragline ingest --config ./config/ragline.toml
//!
//! # Incremental update (requires prior index state)
//! ragline ingest --update --limit 10
//!
//! # Show what would be ingested without calling any provider
//! ragline ingest --dry-run
//!
//! # Retrieve passages
//! ragline query "notice period for termination"
//!
//! # Question answering
//! ragline ask "What is the notice period?"
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ragline::config;
use ragline::indexer::{self, Indexer};

/// Ragline CLI — contextual hybrid retrieval over local documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ragline.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ragline",
    about = "Ragline — contextual hybrid (semantic + lexical) retrieval over local documents",
    version,
    long_about = "Ragline ingests local documents, splits them into overlapping chunks, \
    enriches each chunk with LLM-generated document context, and indexes the result in a \
    flat vector index and a BM25 store. Queries search both indexes, fuse the candidates, \
    and rerank them with a cross-encoder."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ragline.toml`. All path, chunking, provider,
    /// and retrieval settings are read from this file.
    #[arg(long, global = true, default_value = "./config/ragline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest pending documents into the indexes.
    ///
    /// Scans the pending directory, chunks and contextualizes each
    /// document, embeds the enriched chunks, merges them into the vector
    /// and lexical indexes, and archives the source files. Documents
    /// whose processing fails stay pending and are retried next run.
    Ingest {
        /// Require existing index state; extend it instead of starting fresh.
        #[arg(long)]
        update: bool,

        /// Maximum number of documents to process in this run.
        #[arg(long)]
        limit: Option<usize>,

        /// Report document and chunk counts without calling any provider or writing state.
        #[arg(long)]
        dry_run: bool,
    },

    /// Retrieve the top reranked passages for a query.
    Query {
        /// The query string.
        query: String,

        /// Keep passages returned by both indexes as duplicates instead of merging them.
        #[arg(long)]
        keep_duplicates: bool,
    },

    /// Answer a question from the indexed documents.
    ///
    /// Retrieves passages for the question and asks the generative model
    /// to answer strictly from them. With no relevant passages, replies
    /// that the question cannot be answered from the available sources.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Remove every chunk of a document from both indexes.
    Delete {
        /// Document id (the source file's base name, e.g. `ruling_17.pdf`).
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest {
            update,
            limit,
            dry_run,
        } => {
            if dry_run {
                let rows = indexer::preview_ingest(&config, limit)?;
                for (document_id, chunks) in &rows {
                    println!("{} -> {} chunk(s)", document_id, chunks);
                }
                let total: usize = rows.iter().map(|(_, n)| n).sum();
                println!(
                    "{} document(s), {} chunk(s) would be processed.",
                    rows.len(),
                    total
                );
                return Ok(());
            }
            let mut indexer = Indexer::new(config)?;
            let report = indexer.run_ingest(update, limit).await?;
            println!(
                "Done: {} processed, {} skipped, {} chunk(s) added.",
                report.processed, report.skipped, report.chunks
            );
        }
        Commands::Query {
            query,
            keep_duplicates,
        } => {
            let mut indexer = Indexer::new(config)?;
            let passages = indexer.query_index(&query, keep_duplicates).await?;
            if passages.is_empty() {
                println!("No relevant passages found.");
            }
            for (i, passage) in passages.iter().enumerate() {
                println!("--- [{}] ---", i + 1);
                println!("{passage}");
            }
        }
        Commands::Ask { question } => {
            let mut indexer = Indexer::new(config)?;
            let answer = indexer.ask(&question).await?;
            println!("{answer}");
        }
        Commands::Delete { document_id } => {
            // Deletion only touches local state; no provider is needed.
            let mut indexer = Indexer::offline(config);
            indexer.load_state(true)?;
            let removed = indexer.delete_document(&document_id)?;
            println!("Removed {} chunk(s) for {}.", removed, document_id);
        }
    }

    Ok(())
}
