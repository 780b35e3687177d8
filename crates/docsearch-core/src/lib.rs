//! docsearch-core
//!
//! Configuration, the error taxonomy, content sanitization and the document
//! ingestor (discovery, loading, splitting).

pub mod config;
pub mod error;
pub mod ingest;
pub mod sanitize;
pub mod splitter;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
