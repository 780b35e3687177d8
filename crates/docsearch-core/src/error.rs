use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The sidecar (or the index it is checked against) has the wrong shape.
    #[error("Invalid vector store: {0}")]
    Validation(String),

    #[error("Vector store index not found at {}", .0.display())]
    IndexMissing(PathBuf),

    #[error("Vector store metadata not found at {}", .0.display())]
    MetadataMissing(PathBuf),

    #[error(
        "Refusing to load vector store at {}: the native index format is loaded by the index \
         library's own deserialization routine, which is unsafe against a tampered file. \
         Set allow_unsafe_deserialize only if you trust the source of this store.",
        .0.display()
    )]
    UnsafeDeserialization(PathBuf),

    #[error("{provider} provider failed: {source}")]
    Provider {
        provider: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Query is empty after sanitization")]
    EmptyQuery,

    #[error(
        "Vector store at {} is locked by another ingestion (lock file {})",
        .store.display(),
        .lock.display()
    )]
    StoreBusy { store: PathBuf, lock: PathBuf },

    #[error("Vector index operation failed: {0}")]
    Index(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn provider(provider: &'static str, source: anyhow::Error) -> Self {
        Self::Provider { provider, source: source.into() }
    }

    /// Missing index or missing sidecar.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::IndexMissing(_) | Self::MetadataMissing(_))
    }

    pub fn is_security_policy(&self) -> bool {
        matches!(self, Self::UnsafeDeserialization(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
