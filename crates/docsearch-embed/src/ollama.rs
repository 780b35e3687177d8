use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docsearch_core::traits::Embedder;

/// Blocking client for Ollama's `/api/embed` endpoint.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    /// `dim` is the expected vector length, 0 to accept whatever the model returns.
    pub fn new(base_url: &str, model: &str, dim: usize, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing Ollama embedding model name");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Ollama HTTP client")?;
        let endpoint = format!("{}/api/embed", base_url.trim_end_matches('/'));
        Ok(Self { client, endpoint, model: model.to_string(), dim })
    }
}

impl Embedder for OllamaEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbedRequest { model: &self.model, input: texts };
        debug!("POST {} ({} inputs)", self.endpoint, texts.len());
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .with_context(|| format!("failed to reach Ollama at {}", self.endpoint))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("Ollama embed request failed ({}): {}", status, body);
        }
        let parsed: EmbedResponse = resp.json().context("failed to parse Ollama embed response")?;
        anyhow::ensure!(
            parsed.embeddings.len() == texts.len(),
            "Ollama returned {} embeddings for {} inputs",
            parsed.embeddings.len(),
            texts.len()
        );
        Ok(parsed.embeddings)
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}
