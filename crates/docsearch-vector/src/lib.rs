//! docsearch-vector
//!
//! LanceDB-backed vector store with a sanitized JSON sidecar, plus the
//! lock/staging/swap helpers used to rebuild a store directory.

pub mod index;
pub mod persist;
pub mod schema;
pub mod store;
pub mod swap;

pub use index::{LanceIndex, INDEX_DIR};
pub use persist::{load, save, METADATA_FILE};
pub use store::{Docstore, VectorStore};
pub use swap::{remove_store, staging_dir, swap_into_place, ReadLock, StoreLock};
