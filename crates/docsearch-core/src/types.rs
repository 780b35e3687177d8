//! Domain types shared by the ingestor, the vector store and the search engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type ChunkId = String;

/// Document metadata. Arbitrary keys before sanitization, allow-listed keys after.
pub type Metadata = Map<String, Value>;

/// A loaded source file. Lives only until it has been split into chunks.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: Metadata,
}

/// A bounded, possibly overlapping slice of a sanitized document.
///
/// Serialized field names match the sidecar schema (`page_content`, `metadata`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(rename = "page_content")]
    pub content: String,
    pub metadata: Metadata,
}

impl Chunk {
    /// The `source` metadata field as a display label.
    pub fn source(&self) -> &str {
        self.metadata.get("source").and_then(Value::as_str).unwrap_or("Unknown")
    }
}

/// A file the ingestor matched but could not load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// One similarity-search hit.
///
/// `distance` is the raw cosine distance reported by the index (lower is
/// closer, range `[0, 2]`). `relevance` is the bounded display figure derived
/// from it, see [`relevance_from_distance`].
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: ChunkId,
    pub ordinal: usize,
    pub chunk: Chunk,
    pub distance: f32,
    pub relevance: f32,
}

/// Map a cosine distance in `[0, 2]` onto a relevance in `[0, 1]`.
pub fn relevance_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}
