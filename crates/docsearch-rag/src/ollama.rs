use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docsearch_core::config::GenerationConfig;
use docsearch_core::traits::Generator;

/// Blocking client for Ollama's `/api/generate` endpoint (non-streaming).
#[derive(Clone)]
pub struct OllamaGenerator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing Ollama generation model name");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Ollama HTTP client")?;
        let endpoint = format!("{}/api/generate", base_url.trim_end_matches('/'));
        Ok(Self { client, endpoint, model: model.to_string(), temperature })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.model,
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

impl Generator for OllamaGenerator {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature },
        };
        debug!("POST {} (prompt {} chars)", self.endpoint, prompt.chars().count());
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .with_context(|| format!("failed to reach Ollama at {}", self.endpoint))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("Ollama generate request failed ({}): {}", status, body);
        }
        let parsed: GenerateResponse =
            resp.json().context("failed to parse Ollama generate response")?;
        Ok(parsed.response.trim().to_string())
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}
