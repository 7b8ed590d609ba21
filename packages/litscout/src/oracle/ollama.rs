//! Ollama-backed implementations of the oracle traits.
//!
//! Reference adapter over the `ollama-client` crate; enabled with the
//! `ollama` feature. Applications that target other inference servers
//! implement [`Oracle`] and [`Embedder`] directly.

use async_trait::async_trait;
use ollama_client::{GenerateOptions, GenerateRequest, OllamaClient};
use tracing::debug;

use crate::error::{Result, ScoutError};
use crate::traits::oracle::{Embedder, Oracle, OracleRequest};

/// Oracle and embedder backed by a local Ollama server.
#[derive(Clone)]
pub struct OllamaOracle {
    client: OllamaClient,
    model: String,
    embed_model: String,
}

impl OllamaOracle {
    /// Create an adapter for the given generation and embedding models.
    pub fn new(
        client: OllamaClient,
        model: impl Into<String>,
        embed_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            embed_model: embed_model.into(),
        }
    }

    /// Probe server availability (short timeout).
    pub async fn is_available(&self) -> bool {
        self.client.is_available().await
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn generate(&self, request: &OracleRequest) -> Result<String> {
        let mut options = GenerateOptions::default()
            .temperature(request.temperature)
            .num_predict(request.max_tokens);
        if let Some(ctx) = request.context_hint {
            options = options.num_ctx(ctx);
        }
        if let Some(seed) = request.seed {
            options = options.seed(seed);
        }

        debug!(
            model = %self.model,
            temperature = request.temperature,
            prompt_len = request.prompt.len(),
            "ollama generate"
        );

        let response = self
            .client
            .generate_with_timeout(
                GenerateRequest::new(&self.model, &request.prompt).options(options),
                request.timeout,
            )
            .await
            .map_err(|e| ScoutError::Oracle(Box::new(e)))?;

        Ok(response.response)
    }
}

#[async_trait]
impl Embedder for OllamaOracle {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .embed(&self.embed_model, text)
            .await
            .map_err(|e| ScoutError::Embedding(e.to_string()))
    }

    fn model_id(&self) -> &str {
        &self.embed_model
    }
}
