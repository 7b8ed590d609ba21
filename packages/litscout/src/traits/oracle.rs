//! Oracle and embedder traits for text-generation operations.
//!
//! The pipeline never depends on stable model behavior beyond "produces
//! text usually containing a JSON object". Implementations wrap specific
//! inference servers and handle transport details; response parsing and
//! repair belong to the pipeline, not the trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Timeout for the broad extraction call, the longest oracle operation.
pub const BROAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for focused classification calls.
pub const FOCUSED_TIMEOUT: Duration = Duration::from_secs(45);

/// Timeout for triage and ranking calls.
pub const TRIAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// A single text-generation request with sampling parameters.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    /// The full prompt
    pub prompt: String,

    /// Sampling temperature (0.0 = greedy)
    pub temperature: f32,

    /// Cap on generated tokens
    pub max_tokens: u32,

    /// Context window size hint, when the server supports one
    pub context_hint: Option<u32>,

    /// Fixed seed for reproducible sampling
    pub seed: Option<u64>,

    /// Per-call timeout; a timeout is an ordinary recoverable failure of
    /// this call, never a pipeline-wide cancellation
    pub timeout: Duration,
}

impl OracleRequest {
    /// Request shaped for the broad extraction phase.
    pub fn broad(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_tokens: 1024,
            context_hint: Some(8192),
            seed: None,
            timeout: BROAD_TIMEOUT,
        }
    }

    /// Request shaped for a focused classification call.
    pub fn focused(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: 256,
            context_hint: None,
            seed: None,
            timeout: FOCUSED_TIMEOUT,
        }
    }

    /// Request shaped for a triage or ranking call.
    pub fn triage(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
            max_tokens: 256,
            context_hint: None,
            seed: None,
            timeout: TRIAGE_TIMEOUT,
        }
    }

    /// Set the sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Text-generation oracle boundary.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate raw text for a prompt. No structural guarantees.
    async fn generate(&self, request: &OracleRequest) -> Result<String>;
}

/// Embedding oracle boundary.
///
/// Each call may fail independently; callers degrade per term rather than
/// aborting batch operations.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate a fixed-dimension vector for the text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier of the embedding model, stored in the registry so
    /// fingerprints from different models are never compared.
    fn model_id(&self) -> &str;
}
