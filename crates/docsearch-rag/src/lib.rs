//! docsearch-rag
//!
//! `RagService` ties the pieces together: ingestion rebuilds the vector store
//! from a folder, search retrieves chunks and asks the generator for an answer.

pub mod ollama;
pub mod pipeline;
pub mod search;

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use docsearch_core::config::Config;
use docsearch_core::error::{Error, Result};
use docsearch_core::ingest::DocumentIngestor;
use docsearch_core::traits::{Embedder, Generator};
use docsearch_embed::embedder_from_config;
use docsearch_vector::{
    persist, remove_store, staging_dir, swap_into_place, ReadLock, StoreLock, VectorStore,
};

pub use ollama::OllamaGenerator;
pub use pipeline::IngestReport;
pub use search::{SearchAnswer, SearchEngine, Source};

pub struct RagService {
    config: Config,
    ingestor: DocumentIngestor,
    embedder: Box<dyn Embedder>,
    generator: Box<dyn Generator>,
}

impl RagService {
    pub fn new(
        config: Config,
        embedder: Box<dyn Embedder>,
        generator: Box<dyn Generator>,
    ) -> Result<Self> {
        config.validate()?;
        let ingestor = DocumentIngestor::from_config(&config.rag)?;
        Ok(Self { config, ingestor, embedder, generator })
    }

    /// Build providers from configuration (embedder per `embedding.provider`, Ollama generator).
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder = embedder_from_config(&config.embedding)?;
        let generator = OllamaGenerator::from_config(&config.generation)
            .map_err(|e| Error::provider("ollama", e))?;
        Self::new(config, embedder, Box::new(generator))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store_path(&self) -> PathBuf {
        self.config.vector_store_path()
    }

    /// Rebuild the store from `folder`. `patterns` defaults to `rag.supported_file_types`.
    ///
    /// When no chunks come out of the folder any previous store is removed
    /// and the report's `store_path` is `None`.
    pub fn ingest(&self, folder: &Path, patterns: Option<&[String]>) -> Result<IngestReport> {
        let patterns = patterns
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| self.config.rag.supported_file_types.clone());
        let target = self.store_path();
        let _lock = StoreLock::acquire(&target)?;

        info!("Ingesting {} with patterns {:?}", folder.display(), patterns);
        let collected = self.ingestor.collect(folder, &patterns)?;
        let mut report = IngestReport {
            num_documents: collected.num_documents,
            num_chunks: collected.chunks.len(),
            skipped_files: collected.skipped_files,
            store_path: None,
        };
        if collected.chunks.is_empty() {
            warn!("No chunks produced from {}; clearing {}", folder.display(), target.display());
            remove_store(&target)?;
            return Ok(report);
        }

        let staging = staging_dir(&target)?;
        {
            let store = pipeline::build_store(
                self.embedder.as_ref(),
                collected.chunks,
                staging.path(),
                self.config.embedding.batch_size,
            )?;
            persist::save(&store, staging.path())?;
        }
        info!("Replacing vector store at {} with a full rebuild", target.display());
        swap_into_place(staging, &target)?;

        info!(
            "Indexed {} documents as {} chunks ({} files skipped)",
            report.num_documents,
            report.num_chunks,
            report.skipped_files.len()
        );
        report.store_path = Some(target);
        Ok(report)
    }

    /// Ingest, then load the rebuilt store. `None` when nothing was indexed.
    ///
    /// The returned store is not guarded against a later rebuild of the same
    /// path; [`RagService::search`] is.
    pub fn process(
        &self,
        folder: &Path,
        patterns: Option<&[String]>,
    ) -> Result<Option<VectorStore>> {
        let report = self.ingest(folder, patterns)?;
        match report.store_path {
            Some(_) => self.load_store().map(Some),
            None => Ok(None),
        }
    }

    /// Load the configured store, opting in to the index loader only when
    /// `rag.trust_local_index` is set.
    pub fn load_store(&self) -> Result<VectorStore> {
        persist::load(&self.store_path(), self.config.rag.trust_local_index)
    }

    /// Answer `query` from the `num_results` closest chunks (default `search.default_limit`).
    ///
    /// The store is loaded and queried under a [`ReadLock`], so a concurrent
    /// rebuild cannot swap it out mid-read. Generation runs after the lock is
    /// released.
    pub fn search(&self, query: &str, num_results: Option<usize>) -> Result<SearchAnswer> {
        let engine = self.engine();
        let k = num_results.unwrap_or(self.config.search.default_limit);
        let (query, results) = {
            let _read = ReadLock::acquire(&self.store_path())?;
            let store = self.load_store()?;
            let (query, k) = engine.prepare(query, k)?;
            let results = engine.retrieve(&store, &query, k)?;
            (query, results)
        };
        engine.answer(query, results)
    }

    pub fn engine(&self) -> SearchEngine<'_> {
        SearchEngine::new(
            self.embedder.as_ref(),
            self.generator.as_ref(),
            self.config.search.max_limit,
        )
    }
}

/// `true` when a store was built. Errors are logged, not returned.
pub fn ingest_documents(service: &RagService, folder: &Path, patterns: Option<&[String]>) -> bool {
    match service.ingest(folder, patterns) {
        Ok(report) => report.store_path.is_some(),
        Err(e) => {
            error!("Error ingesting documents: {}", e);
            false
        }
    }
}

/// The generated answer, or `None` after logging the error.
pub fn search_local_documents(
    service: &RagService,
    query: &str,
    num_results: usize,
) -> Option<String> {
    match service.search(query, Some(num_results)) {
        Ok(answer) => Some(answer.answer),
        Err(e) => {
            error!("Error searching documents: {}", e);
            None
        }
    }
}
