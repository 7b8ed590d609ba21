//! Candidate page discovery.
//!
//! Prefers a sitemap listing at the well-known paths; a sitemap index is
//! expanded up to a bounded number of sub-sitemaps. When no listing
//! exists, falls back to harvesting same-origin links from the seed page.

use tracing::{debug, info};
use url::Url;

use crate::traits::fetcher::Fetcher;

/// Well-known sitemap locations, tried in order.
const SITEMAP_PATHS: [&str; 4] = [
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/wp-sitemap.xml",
    "/sitemap-index.xml",
];

/// Sub-sitemaps expanded from a sitemap index.
const MAX_SUB_SITEMAPS: usize = 3;

/// Extract `<loc>` entries from sitemap XML.
fn parse_sitemap_locs(xml: &str) -> Vec<String> {
    let pattern = regex::Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").unwrap();
    pattern
        .captures_iter(xml)
        .map(|cap| cap[1].trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// True when a sitemap's entries point at further sitemaps rather than
/// pages.
fn is_sitemap_index(locs: &[String]) -> bool {
    !locs.is_empty() && locs.iter().all(|loc| loc.ends_with(".xml"))
}

fn same_origin(url: &str, origin: &Url) -> bool {
    Url::parse(url)
        .map(|u| u.host_str() == origin.host_str())
        .unwrap_or(false)
}

/// Discover candidate page URLs for a site.
///
/// Returns an empty list only when both the sitemap probe and the
/// link-harvest fallback come up empty; the orchestrator still extracts
/// the seed URL itself in that case.
pub async fn discover_candidates<F: Fetcher>(fetcher: &F, seed_url: &str) -> Vec<String> {
    let Ok(origin) = Url::parse(seed_url) else {
        return Vec::new();
    };
    let base = format!(
        "{}://{}",
        origin.scheme(),
        origin.host_str().unwrap_or_default()
    );

    // Sitemap probe
    for path in SITEMAP_PATHS {
        let sitemap_url = format!("{}{}", base, path);
        let Ok(xml) = fetcher.fetch_raw(&sitemap_url).await else {
            continue;
        };

        let locs = parse_sitemap_locs(&xml);
        if locs.is_empty() {
            continue;
        }

        let urls = if is_sitemap_index(&locs) {
            debug!(sitemap = %sitemap_url, children = locs.len(), "expanding sitemap index");
            let mut expanded = Vec::new();
            for child in locs.iter().take(MAX_SUB_SITEMAPS) {
                if let Ok(child_xml) = fetcher.fetch_raw(child).await {
                    expanded.extend(parse_sitemap_locs(&child_xml));
                }
            }
            expanded
        } else {
            locs
        };

        let same_site: Vec<String> = urls
            .into_iter()
            .filter(|u| same_origin(u, &origin))
            .collect();
        if !same_site.is_empty() {
            info!(sitemap = %sitemap_url, candidates = same_site.len(), "discovered via sitemap");
            return same_site;
        }
    }

    // Fallback: harvest links from the seed page
    match fetcher.fetch(seed_url).await {
        Ok(page) => {
            info!(url = %seed_url, candidates = page.links.len(), "discovered via link harvest");
            page.links
        }
        Err(e) => {
            debug!(url = %seed_url, error = %e, "seed fetch failed during discovery");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::types::page::CandidatePage;

    #[test]
    fn test_parse_sitemap_locs() {
        let xml = r#"
            <urlset>
              <url><loc>https://acme.com/jane</loc></url>
              <url><loc> https://acme.com/john </loc></url>
            </urlset>
        "#;
        assert_eq!(
            parse_sitemap_locs(xml),
            vec![
                "https://acme.com/jane".to_string(),
                "https://acme.com/john".to_string(),
            ]
        );
    }

    #[test]
    fn test_is_sitemap_index() {
        assert!(is_sitemap_index(&[
            "https://acme.com/a.xml".to_string(),
            "https://acme.com/b.xml".to_string(),
        ]));
        assert!(!is_sitemap_index(&[
            "https://acme.com/a.xml".to_string(),
            "https://acme.com/jane".to_string(),
        ]));
        assert!(!is_sitemap_index(&[]));
    }

    #[tokio::test]
    async fn test_discover_prefers_sitemap() {
        let fetcher = MockFetcher::new().with_raw(
            "https://acme.com/sitemap.xml",
            "<urlset><url><loc>https://acme.com/agents</loc></url></urlset>",
        );

        let urls = discover_candidates(&fetcher, "https://acme.com/").await;
        assert_eq!(urls, vec!["https://acme.com/agents".to_string()]);
    }

    #[tokio::test]
    async fn test_discover_expands_index_bounded() {
        let mut index_xml = String::from("<sitemapindex>");
        for i in 0..5 {
            index_xml.push_str(&format!(
                "<sitemap><loc>https://acme.com/sub{}.xml</loc></sitemap>",
                i
            ));
        }
        index_xml.push_str("</sitemapindex>");

        let mut fetcher = MockFetcher::new().with_raw("https://acme.com/sitemap.xml", index_xml);
        for i in 0..5 {
            fetcher = fetcher.with_raw(
                format!("https://acme.com/sub{}.xml", i),
                format!(
                    "<urlset><url><loc>https://acme.com/page{}</loc></url></urlset>",
                    i
                ),
            );
        }

        let urls = discover_candidates(&fetcher, "https://acme.com/").await;
        // Only the first MAX_SUB_SITEMAPS children are expanded
        assert_eq!(urls.len(), MAX_SUB_SITEMAPS);
        assert!(urls.contains(&"https://acme.com/page0".to_string()));
        assert!(!urls.contains(&"https://acme.com/page4".to_string()));
    }

    #[tokio::test]
    async fn test_discover_filters_foreign_origin_sitemap_entries() {
        let fetcher = MockFetcher::new().with_raw(
            "https://acme.com/sitemap.xml",
            "<urlset><url><loc>https://other.com/x</loc></url>\
             <url><loc>https://acme.com/agents</loc></url></urlset>",
        );

        let urls = discover_candidates(&fetcher, "https://acme.com/").await;
        assert_eq!(urls, vec!["https://acme.com/agents".to_string()]);
    }

    #[tokio::test]
    async fn test_discover_falls_back_to_links() {
        let fetcher = MockFetcher::new().with_page(
            CandidatePage::new("https://acme.com/", "home text")
                .with_links(["https://acme.com/agents", "https://acme.com/about"]),
        );

        let urls = discover_candidates(&fetcher, "https://acme.com/").await;
        assert_eq!(urls.len(), 2);
    }
}
