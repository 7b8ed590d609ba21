//! Top-level facade tying the pipeline together.
//!
//! A `Scout` owns the fetch, oracle, embedding, and storage boundaries
//! plus the process-scoped registry cache, and exposes the operations a
//! caller actually performs: extract one page, crawl one or many sites,
//! and manage the vocabulary registry.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::pipeline::crawl::{run_crawl, CrawlOutcome, CrawlReport};
use crate::registry::cache::RegistryCache;
use crate::registry::seed::seed_terms;
use crate::registry::store::{add_approved, load_or_init, RegistryStore};
use crate::traits::fetcher::Fetcher;
use crate::traits::oracle::{Embedder, Oracle};
use crate::traits::sink::RecordSink;
use crate::types::config::{CrawlMode, CrawlOptions};
use crate::types::registry::{Registry, TermCategory};

/// The assembled pipeline.
pub struct Scout<F, O, E, S> {
    fetcher: Arc<F>,
    oracle: O,
    embedder: E,
    store: S,
    sink: Option<Arc<dyn RecordSink>>,
    cache: RegistryCache,
    options: CrawlOptions,
}

impl<F, O, E, S> Scout<F, O, E, S>
where
    F: Fetcher + 'static,
    O: Oracle,
    E: Embedder,
    S: RegistryStore,
{
    /// Assemble a pipeline over the given boundaries with default options.
    pub fn new(fetcher: F, oracle: O, embedder: E, store: S) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            oracle,
            embedder,
            store,
            sink: None,
            cache: RegistryCache::new(),
            options: CrawlOptions::default(),
        }
    }

    /// Attach a persistence sink; accepted records are submitted to it.
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the crawl options.
    pub fn with_options(mut self, options: CrawlOptions) -> Self {
        self.options = options;
        self
    }

    /// Current registry, from the cache when warm, otherwise loaded from
    /// storage (seed-initialized on first use).
    pub async fn registry(&self) -> Arc<Registry> {
        if let Some(cached) = self.cache.get() {
            return cached;
        }
        let registry = load_or_init(&self.store, &self.embedder, &seed_terms()).await;
        self.cache.put(registry)
    }

    /// Extract records from exactly one page. No discovery, no triage.
    pub async fn extract(&self, url: &str) -> Result<CrawlOutcome> {
        let registry = self.registry().await;
        run_crawl(
            &self.fetcher,
            &self.oracle,
            &self.embedder,
            &registry,
            self.sink.as_deref(),
            url,
            CrawlMode::Single,
            true,
            &self.options,
        )
        .await
    }

    /// Run the full pipeline against one seed URL.
    ///
    /// With `confirm_overflow` false the run stops at the candidate cap
    /// and returns [`CrawlOutcome::TooManyLinks`] instead of fetching.
    pub async fn crawl(
        &self,
        url: &str,
        mode: CrawlMode,
        confirm_overflow: bool,
    ) -> Result<CrawlOutcome> {
        let registry = self.registry().await;
        run_crawl(
            &self.fetcher,
            &self.oracle,
            &self.embedder,
            &registry,
            self.sink.as_deref(),
            url,
            mode,
            confirm_overflow,
            &self.options,
        )
        .await
    }

    /// Crawl several seed URLs and merge the reports.
    ///
    /// Candidate overflow is applied as truncation rather than stopping
    /// the batch; per-seed failures end that seed's run, not the batch.
    pub async fn crawl_all(&self, urls: &[String], mode: CrawlMode) -> Result<CrawlReport> {
        let mut merged = CrawlReport::default();

        for url in urls {
            match self.crawl(url, mode, true).await? {
                CrawlOutcome::Completed(report) => merged.merge(report),
                // Unreachable with confirm_overflow set, kept total
                CrawlOutcome::TooManyLinks { .. } => {}
            }
        }

        info!(seeds = urls.len(), records = merged.records.len(), "batch crawl complete");
        Ok(merged)
    }

    /// Approve a reviewed term into the registry and drop the cached view.
    pub async fn approve_term(&self, name: &str, category: TermCategory) -> Result<()> {
        let mut registry = (*self.registry().await).clone();
        add_approved(&self.store, &self.embedder, &mut registry, name, category).await?;
        self.cache.invalidate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRegistryStore, MockEmbedder, MockFetcher, MockOracle, MockSink};
    use crate::types::page::CandidatePage;
    use crate::types::record::UNKNOWN;

    fn agent_page(url: &str) -> CandidatePage {
        CandidatePage::new(
            url,
            "Jane Doe is a literary agent at Acme Literary. \
             Query her at jane@acme.com with fiction submissions.",
        )
        .with_title("Jane Doe")
    }

    fn broad_response() -> String {
        format!(
            r#"{{"name": "Jane Doe", "role": "Agent", "organization": "Acme Literary",
                "organization_evidence": "{u}", "email": "jane@acme.com",
                "website": "{u}", "country": "{u}", "open_to_submissions": true,
                "genres_raw": "{u}", "bio": "{u}"}}"#,
            u = UNKNOWN
        )
    }

    #[tokio::test]
    async fn test_extract_single_page() {
        let fetcher = MockFetcher::new().with_page(agent_page("https://acme.com/jane"));
        let oracle = MockOracle::new().with_response(
            "extracting literary-agent contact details",
            &broad_response(),
        );
        let scout = Scout::new(fetcher, oracle, MockEmbedder::new(), MemoryRegistryStore::new());

        let outcome = scout.extract("https://acme.com/jane").await.unwrap();
        let CrawlOutcome::Completed(report) = outcome else {
            panic!("single-page extraction never warns about overflow");
        };

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].record.name, "Jane Doe");
        assert_eq!(report.records[0].record.email, "jane@acme.com");
    }

    #[tokio::test]
    async fn test_extract_submits_to_sink() {
        let fetcher = MockFetcher::new().with_page(agent_page("https://acme.com/jane"));
        let oracle = MockOracle::new().with_response(
            "extracting literary-agent contact details",
            &broad_response(),
        );
        let sink = Arc::new(MockSink::new());
        let scout = Scout::new(fetcher, oracle, MockEmbedder::new(), MemoryRegistryStore::new())
            .with_sink(sink.clone());

        let outcome = scout.extract("https://acme.com/jane").await.unwrap();
        let CrawlOutcome::Completed(report) = outcome else {
            panic!("expected a completed run");
        };

        assert_eq!(report.sink_submitted, 1);
        assert_eq!(report.sink_failed, 0);
        assert_eq!(sink.submissions().len(), 1);
        assert_eq!(sink.submissions()[0].record.name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_registry_seeded_on_first_use_and_cached() {
        let scout = Scout::new(
            MockFetcher::new(),
            MockOracle::new(),
            MockEmbedder::new(),
            MemoryRegistryStore::new(),
        );

        let first = scout.registry().await;
        assert_eq!(first.entries.len(), seed_terms().len());

        let second = scout.registry().await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_approve_term_invalidates_cache() {
        let scout = Scout::new(
            MockFetcher::new(),
            MockOracle::new(),
            MockEmbedder::new(),
            MemoryRegistryStore::new(),
        );

        let before = scout.registry().await;
        assert!(before.find("Climbing", TermCategory::Nonfiction).is_none());

        scout
            .approve_term("Climbing", TermCategory::Nonfiction)
            .await
            .unwrap();

        let after = scout.registry().await;
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.find("Climbing", TermCategory::Nonfiction).is_some());
    }

    #[tokio::test]
    async fn test_approve_duplicate_term_errors() {
        let scout = Scout::new(
            MockFetcher::new(),
            MockOracle::new(),
            MockEmbedder::new(),
            MemoryRegistryStore::new(),
        );

        scout
            .approve_term("Climbing", TermCategory::Nonfiction)
            .await
            .unwrap();
        let err = scout
            .approve_term("climbing", TermCategory::Nonfiction)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ScoutError::DuplicateTerm { .. }));
    }
}
