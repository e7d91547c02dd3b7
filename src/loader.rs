//! Filesystem document loading.
//!
//! Loads pending documents from the configured directory, filtered by the
//! include globs and sorted by path for deterministic runs. Files whose
//! text extraction fails are skipped with a warning and remain pending,
//! so a later run with a fixed file picks them up again.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::config::Config;
use crate::extract;
use crate::models::Document;

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .with_context(|| format!("Invalid include glob: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build include glob set")
}

/// List pending files matching the include globs, sorted by path.
pub fn list_pending_files(config: &Config) -> Result<Vec<PathBuf>> {
    let pending_dir = &config.paths.pending_dir;
    if !pending_dir.exists() {
        return Ok(Vec::new());
    }
    let globs = build_globset(&config.ingest.include_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(pending_dir).follow_links(false) {
        let entry = entry.with_context(|| {
            format!("Failed to walk pending dir: {}", pending_dir.display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(pending_dir)
            .unwrap_or(entry.path());
        if globs.is_match(relative) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Load up to `limit` pending documents, extracting their text.
///
/// Extraction failures are reported and skipped; the file stays in the
/// pending directory.
pub fn load_documents(config: &Config, limit: Option<usize>) -> Result<Vec<Document>> {
    let files = list_pending_files(config)?;
    let mut documents = Vec::new();
    for path in files {
        if let Some(limit) = limit {
            if documents.len() >= limit {
                break;
            }
        }
        match extract::extract_text(&path) {
            Ok(content) => {
                if content.trim().is_empty() {
                    eprintln!("Warning: {} contains no text, skipping", path.display());
                    continue;
                }
                documents.push(Document {
                    file_path: path,
                    content,
                });
            }
            Err(e) => {
                eprintln!("Warning: failed to extract {}: {}", path.display(), e);
            }
        }
    }
    Ok(documents)
}

/// Move a fully processed file into the processed directory.
///
/// Called once every chunk of the document has been registered, in the
/// same step as the registration itself. The relocation is what a rerun
/// keys off: files still in the pending directory are retried, moved
/// files are skipped.
pub fn mark_processed(config: &Config, file_path: &Path) -> Result<()> {
    let processed_dir = &config.paths.processed_dir;
    fs::create_dir_all(processed_dir).with_context(|| {
        format!("Failed to create processed dir: {}", processed_dir.display())
    })?;
    let file_name = file_path
        .file_name()
        .with_context(|| format!("Path has no file name: {}", file_path.display()))?;
    let target = processed_dir.join(file_name);
    fs::rename(file_path, &target).with_context(|| {
        format!(
            "Failed to move {} to {}",
            file_path.display(),
            target.display()
        )
    })?;
    Ok(())
}
