/// Turns text into vectors. Implementations live in `docsearch-embed`.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model, used in logs.
    fn model_id(&self) -> &str;
    /// Expected embedding dimensionality, or 0 when only known after the first call.
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Produces an answer for a fully assembled prompt.
pub trait Generator: Send + Sync {
    fn model_id(&self) -> &str;
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
