//! Blocking wrapper around a single LanceDB table.
//!
//! LanceDB is async; `LanceIndex` owns a tokio runtime and blocks on it, so
//! callers stay synchronous. Do not call into it from inside another runtime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt32Array,
};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType, Table};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use docsearch_core::error::{Error, Result};

use crate::schema::{build_chunk_schema, vector_dim};

pub const TABLE_NAME: &str = "index";
/// Directory LanceDB creates for [`TABLE_NAME`] inside the store directory.
pub const INDEX_DIR: &str = "index.lance";

/// A row to insert.
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub id: String,
    pub ordinal: u32,
    pub content: String,
    pub metadata: String,
    pub vector: Vec<f32>,
}

/// Content and metadata as the table itself reports them.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: String,
    pub content: String,
    pub metadata: String,
}

#[derive(Debug, Clone)]
pub struct IndexHit {
    pub id: String,
    pub distance: f32,
}

pub struct LanceIndex {
    rt: Runtime,
    _db: Connection,
    table: Table,
    dir: PathBuf,
    dim: usize,
}

impl LanceIndex {
    /// Create the table in `dir` and insert `rows`. Vectors must all be `dim` wide.
    pub fn create(dir: &Path, rows: &[IndexRow], dim: usize) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::Validation("cannot build an index from zero chunks".into()));
        }
        let width = i32::try_from(dim)
            .map_err(|_| Error::Validation(format!("embedding dimension {dim} too large")))?;
        std::fs::create_dir_all(dir)?;
        let schema = build_chunk_schema(width);
        let batch = rows_to_record_batch(rows, schema.clone(), width)?;
        let uri = dir.to_string_lossy().to_string();

        let rt = Runtime::new()?;
        let (db, table) = rt.block_on(async {
            let db = connect(&uri)
                .execute()
                .await
                .map_err(|e| Error::Index(format!("failed to connect to {uri}: {e}")))?;
            let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
            let table = db
                .create_table(TABLE_NAME, reader)
                .execute()
                .await
                .map_err(|e| Error::Index(format!("failed to create table: {e}")))?;
            Ok::<_, Error>((db, table))
        })?;
        info!("Created index with {} rows (dim {}) in {}", rows.len(), dim, dir.display());
        Ok(Self { rt, _db: db, table, dir: dir.to_path_buf(), dim })
    }

    /// Open an existing table with LanceDB's own loader.
    pub fn open(dir: &Path) -> Result<Self> {
        let uri = dir.to_string_lossy().to_string();
        let rt = Runtime::new()?;
        let (db, table, schema) = rt.block_on(async {
            let db = connect(&uri)
                .execute()
                .await
                .map_err(|e| Error::Index(format!("failed to connect to {uri}: {e}")))?;
            let table = db
                .open_table(TABLE_NAME)
                .execute()
                .await
                .map_err(|e| Error::Index(format!("failed to open table: {e}")))?;
            let schema = table
                .schema()
                .await
                .map_err(|e| Error::Index(format!("failed to read schema: {e}")))?;
            Ok::<_, Error>((db, table, schema))
        })?;
        let dim = vector_dim(&schema).ok_or_else(|| {
            Error::Validation(format!("index at {} has no vector column", dir.display()))
        })?;
        debug!("Opened index at {} (dim {})", dir.display(), dim);
        Ok(Self { rt, _db: db, table, dir: dir.to_path_buf(), dim })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Directory holding the table (the store directory, not `index.lance`).
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn count_rows(&self) -> Result<usize> {
        self.rt
            .block_on(self.table.count_rows(None))
            .map_err(|e| Error::Index(format!("failed to count rows: {e}")))
    }

    /// Every row's id, content and metadata, in storage order.
    pub fn rows(&self) -> Result<Vec<StoredRow>> {
        self.rt.block_on(async {
            let mut stream = self
                .table
                .query()
                .select(Select::columns(&["id", "content", "metadata"]))
                .execute()
                .await
                .map_err(|e| Error::Index(format!("failed to scan table: {e}")))?;
            let mut out = Vec::new();
            while let Some(batch) = stream
                .try_next()
                .await
                .map_err(|e| Error::Index(format!("failed to read rows: {e}")))?
            {
                let ids = string_column(&batch, "id")?;
                let contents = string_column(&batch, "content")?;
                let metadata = string_column(&batch, "metadata")?;
                for i in 0..batch.num_rows() {
                    out.push(StoredRow {
                        id: ids.value(i).to_string(),
                        content: contents.value(i).to_string(),
                        metadata: metadata.value(i).to_string(),
                    });
                }
            }
            Ok(out)
        })
    }

    /// Exact cosine nearest neighbours. Lower distance is closer. Rows tied at
    /// the `k`-th place come back in no particular order.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        if vector.len() != self.dim {
            return Err(Error::Validation(format!(
                "query vector has {} dimensions, index has {}",
                vector.len(),
                self.dim
            )));
        }
        self.rt.block_on(async {
            let mut stream = self
                .table
                .vector_search(vector.to_vec())
                .map_err(|e| Error::Index(format!("failed to build vector query: {e}")))?
                .distance_type(DistanceType::Cosine)
                .limit(k)
                .execute()
                .await
                .map_err(|e| Error::Index(format!("vector search failed: {e}")))?;
            let mut hits = Vec::new();
            while let Some(batch) = stream
                .try_next()
                .await
                .map_err(|e| Error::Index(format!("failed to read hits: {e}")))?
            {
                let ids = string_column(&batch, "id")?;
                let distances = batch
                    .column_by_name("_distance")
                    .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                    .ok_or_else(|| Error::Index("search result has no _distance column".into()))?;
                for i in 0..batch.num_rows() {
                    hits.push(IndexHit {
                        id: ids.value(i).to_string(),
                        distance: distances.value(i),
                    });
                }
            }
            Ok(hits)
        })
    }
}

fn rows_to_record_batch(
    rows: &[IndexRow],
    schema: Arc<arrow_schema::Schema>,
    dim: i32,
) -> Result<RecordBatch> {
    for row in rows {
        if row.vector.len() != dim as usize {
            return Err(Error::Validation(format!(
                "chunk {} has a {}-dimensional vector, expected {}",
                row.id,
                row.vector.len(),
                dim
            )));
        }
    }
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let ordinals: Vec<u32> = rows.iter().map(|r| r.ordinal).collect();
    let contents: Vec<String> = rows.iter().map(|r| r.content.clone()).collect();
    let metadata: Vec<String> = rows.iter().map(|r| r.metadata.clone()).collect();
    let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
        rows.iter().map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>())),
        dim,
    );
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(UInt32Array::from(ordinals)),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(metadata)),
        Arc::new(vectors),
    ];
    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::Index(format!("failed to build record batch: {e}")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| Error::Index(format!("column {name} missing or not utf8")))
}
