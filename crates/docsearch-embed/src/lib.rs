//! Embedding providers behind the `docsearch_core::traits::Embedder` trait.
//!
//! - `ollama`: remote model served by Ollama (default)
//! - `local`: in-process XLM-RoBERTa via candle
//! - `hash`: deterministic hashing embedder for tests and offline runs

mod device;
mod hash;
mod local;
mod ollama;
mod pool;
mod tokenize;

use std::time::Duration;

use docsearch_core::config::{EmbeddingConfig, EmbeddingProvider};
use docsearch_core::error::{Error, Result};
use docsearch_core::traits::Embedder;
use tracing::info;

pub use device::select_device;
pub use hash::HashEmbedder;
pub use local::{resolve_model_dir, LocalEmbedder};
pub use ollama::OllamaEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

/// Build the embedder selected by `embedding.provider`.
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let embedder: Box<dyn Embedder> = match config.provider {
        EmbeddingProvider::Hash => Box::new(HashEmbedder::new(config.dimension)),
        EmbeddingProvider::Ollama => {
            let timeout = Duration::from_secs(config.timeout_secs);
            Box::new(
                OllamaEmbedder::new(&config.base_url, &config.model, 0, timeout)
                    .map_err(|e| Error::provider("ollama", e))?,
            )
        }
        EmbeddingProvider::Local => {
            let dir = resolve_model_dir(config.model_dir.as_deref())
                .map_err(|e| Error::provider("local", e))?;
            let embedder = LocalEmbedder::load(&dir, config.max_len)
                .map_err(|e| Error::provider("local", e))?;
            Box::new(embedder)
        }
    };
    info!("Using embedder {} (dim {})", embedder.model_id(), embedder.dim());
    Ok(embedder)
}
