//! On-disk store: the LanceDB table plus a JSON sidecar.
//!
//! ```text
//! <store>/
//!   index.lance/     vectors, ids, and the index's own copy of content/metadata
//!   metadata.json    { "<id>": { "page_content": str, "metadata": {..} } }
//! ```
//!
//! The sidecar is the source of truth for chunk text and metadata. The index
//! is trusted for vector geometry only, and only after the caller opts in.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use docsearch_core::error::{Error, Result};
use docsearch_core::sanitize::{sanitize_content, sanitize_metadata};
use docsearch_core::types::{Chunk, Metadata};

use crate::index::{LanceIndex, INDEX_DIR};
use crate::store::{Docstore, VectorStore};

pub const METADATA_FILE: &str = "metadata.json";

/// Write `store` to `path`: the index (copied when it was built elsewhere) and
/// the sidecar. The sidecar goes to a temp file first and is renamed into place.
pub fn save(store: &VectorStore, path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    if !same_dir(store.index().dir(), path) {
        let target = path.join(INDEX_DIR);
        if target.exists() {
            fs::remove_dir_all(&target)?;
        }
        copy_dir(&store.index().dir().join(INDEX_DIR), &target)?;
    }
    write_sidecar(store.docstore(), path)?;
    info!("Saved vector store with {} chunks to {}", store.len(), path.display());
    Ok(())
}

/// Load a store written by [`save`].
///
/// Fails with [`Error::UnsafeDeserialization`] unless `allow_unsafe_deserialize`
/// is set, before looking at the directory at all.
///
/// A caller that may race a rebuild of `path` should hold a
/// [`ReadLock`](crate::swap::ReadLock) for as long as it uses the store.
pub fn load(path: &Path, allow_unsafe_deserialize: bool) -> Result<VectorStore> {
    if !allow_unsafe_deserialize {
        return Err(Error::UnsafeDeserialization(path.to_path_buf()));
    }
    let index_path = path.join(INDEX_DIR);
    if !index_path.exists() {
        return Err(Error::IndexMissing(index_path));
    }
    let sidecar_path = path.join(METADATA_FILE);
    if !sidecar_path.is_file() {
        return Err(Error::MetadataMissing(sidecar_path));
    }

    let docstore = read_sidecar(&sidecar_path)?;
    let index = LanceIndex::open(path)?;

    // The index's own content/metadata is dropped; only its ids are checked.
    let rows = index.rows()?;
    let mut diverged = 0usize;
    let mut index_ids = HashSet::with_capacity(rows.len());
    for row in &rows {
        let Some(chunk) = docstore.get(&row.id) else {
            return Err(Error::Validation(format!("index id {} has no sidecar entry", row.id)));
        };
        if row.content != chunk.content || !metadata_matches(&row.metadata, &chunk.metadata) {
            diverged += 1;
        }
        index_ids.insert(row.id.as_str());
    }
    if let Some((id, _)) = docstore.iter().find(|(id, _)| !index_ids.contains(id.as_str())) {
        return Err(Error::Validation(format!("sidecar id {id} is not in the index")));
    }
    if diverged > 0 {
        debug!("{} index rows diverged from the sidecar; sidecar content used", diverged);
    }
    info!("Loaded vector store with {} chunks from {}", docstore.len(), path.display());
    Ok(VectorStore::from_parts(index, docstore))
}

/// Parse, validate and re-sanitize a sidecar file.
pub fn read_sidecar(path: &Path) -> Result<Docstore> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| Error::Validation(format!("{} is not valid JSON: {e}", path.display())))?;
    let Value::Object(entries) = value else {
        return Err(Error::Validation(format!("{} must contain a JSON object", path.display())));
    };

    let mut docstore = Docstore::new();
    for (id, entry) in entries {
        let content = entry
            .get("page_content")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Validation(format!("entry {id} has no string page_content")))?;
        let metadata = entry
            .get("metadata")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::Validation(format!("entry {id} has no metadata object")))?;
        let chunk = Chunk {
            content: sanitize_content(content),
            metadata: sanitize_metadata(metadata),
        };
        docstore.insert(id, chunk);
    }
    Ok(docstore)
}

fn write_sidecar(docstore: &Docstore, dir: &Path) -> Result<()> {
    let mut entries = Map::with_capacity(docstore.len());
    for (id, chunk) in docstore.iter() {
        let entry = serde_json::to_value(chunk)
            .map_err(|e| Error::Validation(format!("chunk {id} is not serializable: {e}")))?;
        entries.insert(id.clone(), entry);
    }
    let body = serde_json::to_string_pretty(&Value::Object(entries))
        .map_err(|e| Error::Validation(format!("sidecar is not serializable: {e}")))?;

    let final_path = dir.join(METADATA_FILE);
    let temp_path = dir.join(format!("{METADATA_FILE}.tmp"));
    fs::write(&temp_path, body)?;
    fs::rename(&temp_path, &final_path)?;
    debug!("Wrote sidecar {}", final_path.display());
    Ok(())
}

fn metadata_matches(raw: &str, metadata: &Metadata) -> bool {
    serde_json::from_str::<Metadata>(raw).map(|m| &m == metadata).unwrap_or(false)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let dest = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
