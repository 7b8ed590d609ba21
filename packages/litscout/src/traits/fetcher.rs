//! Fetch boundary trait.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::page::CandidatePage;

/// Fetch boundary: URL in, processed page out.
///
/// Implementations must enforce a request timeout and a maximum retained
/// text length, normalize relative links to absolute, and filter outbound
/// links to the page's origin.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a page and extract text, title, links, and contact addresses.
    async fn fetch(&self, url: &str) -> FetchResult<CandidatePage>;

    /// Fetch a URL's body without HTML processing.
    ///
    /// Used for sitemap XML, where tag stripping would destroy the
    /// `<loc>` entries the pipeline needs.
    async fn fetch_raw(&self, url: &str) -> FetchResult<String>;
}
