//! Pure Ollama REST API client
//!
//! A clean, minimal client for an Ollama-style local inference server with
//! no domain-specific logic. Supports text generation, embeddings, and an
//! availability probe.
//!
//! # Example
//!
//! ```rust,ignore
//! use ollama_client::{OllamaClient, GenerateRequest, GenerateOptions};
//!
//! let client = OllamaClient::from_env();
//!
//! // Text generation
//! let response = client
//!     .generate(GenerateRequest::new("llama3.1", "Say hello").options(
//!         GenerateOptions::default().temperature(0.0).num_predict(256),
//!     ))
//!     .await?;
//!
//! // Embeddings
//! let vector = client.embed("nomic-embed-text", "text to embed").await?;
//! ```

pub mod error;
pub mod types;

pub use error::{OllamaError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// Default base URL for a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Timeout applied to generation calls unless overridden per request.
const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout applied to embedding calls.
const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the availability probe. Deliberately short: the probe is a
/// liveness check, not a real request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pure Ollama API client.
#[derive(Clone)]
pub struct OllamaClient {
    http_client: Client,
    base_url: String,
    generate_timeout: Duration,
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl OllamaClient {
    /// Create a new client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
        }
    }

    /// Create from the `OLLAMA_BASE_URL` environment variable, falling back
    /// to the local default when unset.
    pub fn from_env() -> Self {
        match std::env::var("OLLAMA_BASE_URL") {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::new(DEFAULT_BASE_URL),
        }
    }

    /// Set the timeout used for generation calls.
    pub fn with_generate_timeout(mut self, timeout: Duration) -> Self {
        self.generate_timeout = timeout;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text for a prompt, using the client's default timeout.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.generate_with_timeout(request, self.generate_timeout)
            .await
    }

    /// Generate text with an explicit per-call timeout.
    pub async fn generate_with_timeout(
        &self,
        request: GenerateRequest,
        timeout: Duration,
    ) -> Result<GenerateResponse> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model = %request.model, prompt_len = request.prompt.len(), "generate request");

        let response = self
            .http_client
            .post(&url)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "generate request failed");
                OllamaError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api(format!("HTTP {}: {}", status, body)));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))
    }

    /// Generate an embedding vector for the given text.
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbeddingRequest::new(model, text);

        let response = self
            .http_client
            .post(&url)
            .timeout(EMBED_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| OllamaError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed = response
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))?;

        if parsed.embedding.is_empty() {
            return Err(OllamaError::Api("empty embedding returned".to_string()));
        }

        Ok(parsed.embedding)
    }

    /// Probe whether the server is reachable.
    ///
    /// Never errors; an unreachable or misbehaving server reports `false`.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .http_client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "availability probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }
}
