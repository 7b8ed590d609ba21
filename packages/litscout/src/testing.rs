//! Test doubles for the pipeline boundaries.
//!
//! Available outside `cfg(test)` so integration tests and downstream
//! consumers can drive the pipeline without a live inference server or
//! network access.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{FetchError, FetchResult, Result, ScoutError};
use crate::registry::store::RegistryStore;
use crate::traits::fetcher::Fetcher;
use crate::traits::oracle::{Embedder, Oracle, OracleRequest};
use crate::traits::sink::RecordSink;
use crate::types::page::CandidatePage;
use crate::types::record::{ExtractionSample, ValidatedRecord};
use crate::types::registry::Registry;

/// Scripted oracle: responses are matched by prompt substring, first
/// match wins, and every prompt is recorded.
#[derive(Default)]
pub struct MockOracle {
    responses: Vec<(String, String)>,
    fail_all: bool,
    fail_remaining: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` to any prompt containing `needle`.
    /// Unmatched prompts get `"{}"`.
    pub fn with_response(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.push((needle.into(), response.into()));
        self
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Fail the first `n` calls, then behave normally.
    pub fn fail_first_n(self, n: usize) -> Self {
        *self.fail_remaining.lock().unwrap() = n;
        self
    }

    /// Every prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn generate(&self, request: &OracleRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if self.fail_all {
            return Err(ScoutError::Oracle("mock oracle failure".into()));
        }
        {
            let mut remaining = self.fail_remaining.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ScoutError::Oracle("mock oracle failure".into()));
            }
        }

        let response = self
            .responses
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| "{}".to_string());
        Ok(response)
    }
}

/// Deterministic embedder: the vector is derived from a hash of the
/// text, so equal inputs embed identically and different inputs almost
/// never collide.
#[derive(Default)]
pub struct MockEmbedder {
    fail_all: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail_all {
            return Err(ScoutError::Embedding("mock embedder failure".to_string()));
        }

        let mut vector = Vec::with_capacity(8);
        for salt in 0u64..8 {
            let mut hasher = DefaultHasher::new();
            salt.hash(&mut hasher);
            text.hash(&mut hasher);
            // Map the hash onto [-1, 1]
            let unit = (hasher.finish() % 2001) as f32 / 1000.0 - 1.0;
            vector.push(unit);
        }
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        "mock-embed"
    }
}

/// Canned fetcher: pages and raw bodies are registered by URL, anything
/// else fails. Fetched URLs are recorded.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, CandidatePage>,
    raw: HashMap<String, String>,
    failures: Vec<String>,
    fetched: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page under its own URL.
    pub fn with_page(mut self, page: CandidatePage) -> Self {
        self.pages.insert(page.url.clone(), page);
        self
    }

    /// Register a raw body (sitemap XML) under a URL.
    pub fn with_raw(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.raw.insert(url.into(), body.into());
        self
    }

    /// Make a specific URL fail with a timeout.
    pub fn fail_url(mut self, url: impl Into<String>) -> Self {
        self.failures.push(url.into());
        self
    }

    /// URLs requested through [`Fetcher::fetch`], in call order.
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<CandidatePage> {
        self.fetched.lock().unwrap().push(url.to_string());

        if self.failures.iter().any(|f| f == url) {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Http {
                url: url.to_string(),
                source: "no mock page registered".into(),
            })
    }

    async fn fetch_raw(&self, url: &str) -> FetchResult<String> {
        if self.failures.iter().any(|f| f == url) {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }
        self.raw.get(url).cloned().ok_or_else(|| FetchError::Http {
            url: url.to_string(),
            source: "no mock body registered".into(),
        })
    }
}

/// Capturing sink with optional failure injection.
#[derive(Default)]
pub struct MockSink {
    fail_all: bool,
    submitted: Mutex<Vec<ValidatedRecord>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every submission.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Records submitted so far, in order.
    pub fn submissions(&self) -> Vec<ValidatedRecord> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MockSink {
    async fn submit(&self, record: &ValidatedRecord, _processed_at: DateTime<Utc>) -> Result<()> {
        if self.fail_all {
            return Err(ScoutError::Sink("mock sink failure".into()));
        }
        self.submitted.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock-sink"
    }
}

/// In-memory registry store, no filesystem involved.
#[derive(Default)]
pub struct MemoryRegistryStore {
    inner: RwLock<Option<Registry>>,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistryStore {
    async fn load(&self) -> Result<Option<Registry>> {
        Ok(self.inner.read().unwrap().clone())
    }

    async fn save(&self, registry: &mut Registry) -> Result<()> {
        registry.last_updated = Utc::now();
        *self.inner.write().unwrap() = Some(registry.clone());
        Ok(())
    }
}

/// A minimal accepted record for deduplication and sink tests.
pub fn sample_record(name: &str, email: &str, organization: &str) -> ValidatedRecord {
    let mut record = ExtractionSample::unknown("https://acme.com/team");
    record.name = name.to_string();
    record.email = email.to_string();
    record.organization = organization.to_string();

    ValidatedRecord {
        record,
        confidence: 70,
        consensus_score: 1.0,
        needs_review: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_oracle_substring_dispatch() {
        let oracle = MockOracle::new()
            .with_response("alpha", "A")
            .with_response("beta", "B");

        let a = oracle
            .generate(&OracleRequest::focused("has alpha inside"))
            .await
            .unwrap();
        assert_eq!(a, "A");

        let fallback = oracle
            .generate(&OracleRequest::focused("nothing matches"))
            .await
            .unwrap();
        assert_eq!(fallback, "{}");
        assert_eq!(oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new();
        let a = embedder.embed("crime").await.unwrap();
        let b = embedder.embed("crime").await.unwrap();
        let c = embedder.embed("fantasy").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 8);
    }

    #[tokio::test]
    async fn test_mock_fetcher_failures() {
        let fetcher = MockFetcher::new().fail_url("https://acme.com/down");

        let err = fetcher.fetch("https://acme.com/down").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }));

        let err = fetcher.fetch("https://acme.com/missing").await.unwrap_err();
        assert!(matches!(err, FetchError::Http { .. }));
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryRegistryStore::new();
        assert!(store.load().await.unwrap().is_none());

        let mut registry = Registry::new("mock-embed");
        store.save(&mut registry).await.unwrap();
        assert!(store.load().await.unwrap().is_some());
    }
}
