use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;
use docsearch_core::types::{Chunk, SkippedFile};
use docsearch_vector::VectorStore;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub num_documents: usize,
    pub num_chunks: usize,
    pub skipped_files: Vec<SkippedFile>,
    /// Where the rebuilt store lives; `None` when nothing was indexed.
    pub store_path: Option<PathBuf>,
}

/// Embed chunk contents in batches of `batch_size`, with a progress bar.
/// All vectors must share one length, equal to `embedder.dim()` when that is known.
pub fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let pb = ProgressBar::new(chunks.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
             {pos}/{len} chunks ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb.set_message(embedder.model_id().to_string());

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embedded =
            embedder.embed_batch(&texts).map_err(|e| Error::provider("embedding", e))?;
        if embedded.len() != texts.len() {
            let e = anyhow::anyhow!(
                "{} returned {} vectors for {} texts",
                embedder.model_id(),
                embedded.len(),
                texts.len()
            );
            return Err(Error::provider("embedding", e));
        }
        vectors.extend(embedded);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    let expected = match (embedder.dim(), vectors.first()) {
        (0, Some(first)) => first.len(),
        (dim, _) => dim,
    };
    if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != expected) {
        return Err(Error::Validation(format!(
            "embedding {} has {} dimensions, expected {}",
            i,
            v.len(),
            expected
        )));
    }
    debug!("Embedded {} chunks with {} (dim {})", vectors.len(), embedder.model_id(), expected);
    Ok(vectors)
}

/// Embed `chunks` and build a fresh store in `dir`.
pub fn build_store(
    embedder: &dyn Embedder,
    chunks: Vec<Chunk>,
    dir: &Path,
    batch_size: usize,
) -> Result<VectorStore> {
    info!("Embedding {} chunks in batches of {}", chunks.len(), batch_size);
    let vectors = embed_chunks(embedder, &chunks, batch_size)?;
    VectorStore::from_embeddings(dir, chunks, vectors)
}
