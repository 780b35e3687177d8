use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use docsearch_core::error::{Error, Result};
use docsearch_core::types::{relevance_from_distance, Chunk, ChunkId, SearchResult};

use crate::index::{IndexRow, LanceIndex};

/// Chunks keyed by id, remembering insertion order.
#[derive(Debug, Clone, Default)]
pub struct Docstore {
    entries: Vec<(ChunkId, Chunk)>,
    positions: HashMap<ChunkId, usize>,
}

impl Docstore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk. A repeated id replaces the chunk but keeps its first position.
    pub fn insert(&mut self, id: ChunkId, chunk: Chunk) {
        if let Some(&pos) = self.positions.get(&id) {
            self.entries[pos].1 = chunk;
            return;
        }
        self.positions.insert(id.clone(), self.entries.len());
        self.entries.push((id, chunk));
    }

    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.positions.get(id).map(|&pos| &self.entries[pos].1)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkId, &Chunk)> {
        self.entries.iter().map(|(id, chunk)| (id, chunk))
    }
}

/// Native vector index plus the docstore that is authoritative for chunk text.
pub struct VectorStore {
    index: LanceIndex,
    docstore: Docstore,
}

impl VectorStore {
    pub(crate) fn from_parts(index: LanceIndex, docstore: Docstore) -> Self {
        Self { index, docstore }
    }

    /// Build a fresh index in `dir` from chunks and their embeddings, assigning
    /// each chunk a new id. `vectors[i]` belongs to `chunks[i]`.
    pub fn from_embeddings(dir: &Path, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::Validation(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                vectors.len()
            )));
        }
        let dim = vectors.first().map(Vec::len).unwrap_or(0);
        if dim == 0 {
            return Err(Error::Validation("embeddings are empty".into()));
        }

        let mut docstore = Docstore::new();
        let mut rows = Vec::with_capacity(chunks.len());
        for (ordinal, (chunk, vector)) in chunks.into_iter().zip(vectors).enumerate() {
            let id = Uuid::new_v4().to_string();
            let metadata = serde_json::to_string(&chunk.metadata).map_err(|e| {
                Error::Validation(format!("chunk metadata is not serializable: {e}"))
            })?;
            let ordinal = u32::try_from(ordinal)
                .map_err(|_| Error::Validation("too many chunks".into()))?;
            rows.push(IndexRow {
                id: id.clone(),
                ordinal,
                content: chunk.content.clone(),
                metadata,
                vector,
            });
            docstore.insert(id, chunk);
        }
        let index = LanceIndex::create(dir, &rows, dim)?;
        Ok(Self { index, docstore })
    }

    /// The `k` chunks closest to `vector`, nearest first. Equal distances keep
    /// insertion order, including a tie that straddles the `k`-th place.
    pub fn similarity_search_by_vector(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        if k == 0 || self.docstore.is_empty() {
            return Ok(Vec::new());
        }
        let total = self.docstore.len();
        let mut limit = k.saturating_add(1).min(total);
        let hits = loop {
            let mut hits = self.index.search(vector, limit)?;
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            // rows tied with the k-th hit may lie past the fetched window
            let cut_through_tie = hits.len() > k
                && hits.len() == limit
                && limit < total
                && hits[limit - 1].distance.total_cmp(&hits[k - 1].distance).is_eq();
            if !cut_through_tie {
                break hits;
            }
            limit = limit.saturating_mul(2).min(total);
        };

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let (Some(ordinal), Some(chunk)) =
                (self.docstore.position(&hit.id), self.docstore.get(&hit.id))
            else {
                return Err(Error::Validation(format!(
                    "index returned id {} with no docstore entry",
                    hit.id
                )));
            };
            results.push(SearchResult {
                id: hit.id,
                ordinal,
                chunk: chunk.clone(),
                distance: hit.distance,
                relevance: relevance_from_distance(hit.distance),
            });
        }
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.ordinal.cmp(&b.ordinal)));
        results.truncate(k);
        debug!("Similarity search returned {} of {} requested", results.len(), k);
        Ok(results)
    }

    pub fn docstore(&self) -> &Docstore {
        &self.docstore
    }

    pub fn index(&self) -> &LanceIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.docstore.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docstore.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }
}
