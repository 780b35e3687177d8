use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::sanitize::{sanitize_content, sanitize_metadata};
use crate::splitter::TextSplitter;
use crate::types::{Chunk, Document, Metadata, SkippedFile};

/// Output of [`DocumentIngestor::collect`]: sanitized chunks plus batch statistics.
#[derive(Debug, Default)]
pub struct CollectedChunks {
    pub chunks: Vec<Chunk>,
    pub files_matched: usize,
    pub num_documents: usize,
    pub skipped_files: Vec<SkippedFile>,
}

/// Output of [`DocumentIngestor::discover`].
#[derive(Debug, Default)]
pub struct Discovery {
    pub files: Vec<PathBuf>,
    /// Directories or entries the walk failed on, e.g. permission denied.
    pub skipped: Vec<SkippedFile>,
}

/// Finds files under a folder, loads them as UTF-8, sanitizes and splits them.
///
/// A file that cannot be read or decoded is logged and skipped; the rest of
/// the batch carries on.
#[derive(Debug, Clone)]
pub struct DocumentIngestor {
    splitter: TextSplitter,
}

impl DocumentIngestor {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        Ok(Self { splitter: TextSplitter::new(chunk_size, chunk_overlap)? })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn collect(&self, folder: &Path, patterns: &[String]) -> Result<CollectedChunks> {
        let Discovery { files, skipped } = self.discover(folder, patterns)?;
        info!("Found {} files under {} matching {:?}", files.len(), folder.display(), patterns);
        let mut out = CollectedChunks {
            files_matched: files.len(),
            skipped_files: skipped,
            ..Default::default()
        };
        for (file_index, path) in files.iter().enumerate() {
            debug!("Processing file {}/{}: {}", file_index + 1, files.len(), path.display());
            match load_document(path) {
                Ok(document) => {
                    let chunks = self.split_document(&document);
                    debug!("{} -> {} chunks", path.display(), chunks.len());
                    out.num_documents += 1;
                    out.chunks.extend(chunks);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    out.skipped_files.push(SkippedFile {
                        path: path.to_string_lossy().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Processed {} documents into {} chunks ({} skipped)",
            out.num_documents,
            out.chunks.len(),
            out.skipped_files.len()
        );
        Ok(out)
    }

    /// Resolve glob patterns relative to `folder`. `*` stays within one
    /// directory level, `**` descends. Files are sorted and unique; entries
    /// the walk could not read are reported in [`Discovery::skipped`].
    pub fn discover(&self, folder: &Path, patterns: &[String]) -> Result<Discovery> {
        if !folder.is_dir() {
            return Err(Error::NotFound(format!("folder {}", folder.display())));
        }
        let globs = build_globset(patterns)?;
        let mut out = Discovery::default();
        for entry in walkdir::WalkDir::new(folder) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(folder);
                    warn!("Cannot read {}: {}", path.display(), e);
                    out.skipped.push(SkippedFile {
                        path: path.to_string_lossy().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(folder).unwrap_or(path);
            if globs.is_match(relative) {
                out.files.push(path.to_path_buf());
            }
        }
        out.files.sort();
        out.files.dedup();
        Ok(out)
    }

    /// Sanitize a document, split it, and stamp every chunk with its metadata.
    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        let content = sanitize_content(&document.content);
        let metadata = sanitize_metadata(&document.metadata);
        self.splitter
            .split_text(&content)
            .into_iter()
            .map(|piece| Chunk { content: piece, metadata: metadata.clone() })
            .collect()
    }
}

/// Read a file as strict UTF-8 and attach `source`, `title` and `type` metadata.
pub fn load_document(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8(bytes).map_err(|e| {
        Error::Validation(format!("{} is not valid UTF-8: {}", path.display(), e.utf8_error()))
    })?;
    let mut metadata = Metadata::new();
    metadata.insert("source".into(), Value::String(path.to_string_lossy().to_string()));
    if let Some(stem) = path.file_stem() {
        metadata.insert("title".into(), Value::String(stem.to_string_lossy().to_string()));
    }
    if let Some(ext) = path.extension() {
        metadata.insert("type".into(), Value::String(ext.to_string_lossy().to_string()));
    }
    Ok(Document { content, metadata })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("invalid file pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| Error::InvalidConfig(format!("invalid file patterns: {e}")))
}
