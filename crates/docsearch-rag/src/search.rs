use serde::Serialize;
use tracing::{debug, info};

use docsearch_core::error::{Error, Result};
use docsearch_core::sanitize::sanitize_query;
use docsearch_core::traits::{Embedder, Generator};
use docsearch_core::types::{ChunkId, SearchResult};
use docsearch_vector::VectorStore;

/// One retrieved chunk as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub id: ChunkId,
    pub source: String,
    pub content: String,
    pub distance: f32,
    pub relevance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchAnswer {
    /// The query after sanitization.
    pub query: String,
    pub answer: String,
    pub context: String,
    pub sources: Vec<Source>,
}

/// Retrieve-then-generate over a loaded store.
pub struct SearchEngine<'a> {
    embedder: &'a dyn Embedder,
    generator: &'a dyn Generator,
    max_limit: usize,
}

impl<'a> SearchEngine<'a> {
    pub fn new(embedder: &'a dyn Embedder, generator: &'a dyn Generator, max_limit: usize) -> Self {
        Self { embedder, generator, max_limit: max_limit.max(1) }
    }

    pub fn search(&self, store: &VectorStore, query: &str, k: usize) -> Result<SearchAnswer> {
        let (query, k) = self.prepare(query, k)?;
        let results = self.retrieve(store, &query, k)?;
        self.answer(query, results)
    }

    /// Sanitize `query` and clamp `k` to `1..=max_limit`.
    pub fn prepare(&self, query: &str, k: usize) -> Result<(String, usize)> {
        let query = sanitize_query(query);
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        Ok((query, k.clamp(1, self.max_limit)))
    }

    /// Build the context from `results` and ask the generator. `query` must
    /// already be sanitized.
    pub fn answer(&self, query: String, results: Vec<SearchResult>) -> Result<SearchAnswer> {
        info!("Retrieved {} chunks for query {:?}", results.len(), query);
        let context = build_context(&results);
        let prompt = build_prompt(&query, &context);
        debug!("Prompt is {} chars", prompt.chars().count());
        let answer = self
            .generator
            .generate(&prompt)
            .map_err(|e| Error::provider("generation", e))?;

        let sources = results
            .into_iter()
            .map(|r| Source {
                source: r.chunk.source().to_string(),
                id: r.id,
                content: r.chunk.content,
                distance: r.distance,
                relevance: r.relevance,
            })
            .collect();
        Ok(SearchAnswer { query, answer, context, sources })
    }

    /// Embed `query` and return the `k` nearest chunks.
    pub fn retrieve(
        &self,
        store: &VectorStore,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchResult>> {
        let mut embedded = self
            .embedder
            .embed_batch(&[query.to_string()])
            .map_err(|e| Error::provider("embedding", e))?;
        if embedded.is_empty() {
            let e = anyhow::anyhow!("no vector returned for the query");
            return Err(Error::provider("embedding", e));
        }
        let vector = embedded.swap_remove(0);
        store.similarity_search_by_vector(&vector, k)
    }
}

/// `Document {n} (from {source}):\n{content}` blocks separated by a blank line.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!("Document {} (from {}):\n{}", i + 1, r.chunk.source(), r.chunk.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "Based on the following documents, please answer this question: {query}\n\
         \n\
         Documents:\n\
         {context}\n\
         \n\
         If you find any pricing or structured data in the documents, please format it clearly \
         in your response.\n\
         Please provide a clear and concise answer based only on the information in these \
         documents.\n\
         If you see a document that matches the query exactly (like a pricing document when \
         asked about prices),\n\
         focus on that document rather than summarizing all documents.\n\
         If the documents don't contain enough information to answer the question, please say so.\n\
         \n\
         Answer:"
    )
}
