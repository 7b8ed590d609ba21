//! Ollama API request and response types.

use serde::{Deserialize, Serialize};

// =============================================================================
// Generation
// =============================================================================

/// Text generation request (`POST /api/generate`).
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model to use (e.g., "llama3.1", "qwen2.5:14b")
    pub model: String,

    /// The prompt to complete
    pub prompt: String,

    /// Disable streaming; the full response arrives in one body
    pub stream: bool,

    /// Sampling and decoding options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    /// Create a new non-streaming generate request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
            options: None,
        }
    }

    /// Set generation options.
    pub fn options(mut self, options: GenerateOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Decoding options for a generate request.
///
/// All fields are optional; the server applies model defaults for any
/// that are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateOptions {
    /// Sampling temperature (0.0 = greedy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,

    /// Context window size hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,

    /// Fixed seed for reproducible sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl GenerateOptions {
    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generated-token cap.
    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.num_predict = Some(num_predict);
        self
    }

    /// Set the context window hint.
    pub fn num_ctx(mut self, num_ctx: u32) -> Self {
        self.num_ctx = Some(num_ctx);
        self
    }

    /// Set the sampling seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Text generation response.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    /// The model that produced the response
    pub model: String,

    /// Generated text
    pub response: String,

    /// Whether generation ran to completion
    pub done: bool,

    /// Total wall time in nanoseconds, when reported
    #[serde(default)]
    pub total_duration: Option<u64>,

    /// Number of tokens generated, when reported
    #[serde(default)]
    pub eval_count: Option<u32>,
}

// =============================================================================
// Embeddings
// =============================================================================

/// Embedding request (`POST /api/embeddings`).
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRequest {
    /// Embedding model to use (e.g., "nomic-embed-text")
    pub model: String,

    /// Text to embed
    pub prompt: String,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }
}

/// Embedding response.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vector
    pub embedding: Vec<f32>,
}
