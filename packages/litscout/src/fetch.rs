//! HTTP fetch boundary implementation.
//!
//! Fetches a page, strips it to plain text, and opportunistically harvests
//! same-origin links, email addresses, and web addresses from the content.

use chrono::Utc;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::Fetcher;
use crate::types::page::CandidatePage;

/// Fetcher that retrieves pages over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    max_text_len: usize,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a fetcher with default settings (30s timeout, 20k text cap).
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent: "LitscoutBot/1.0".to_string(),
            max_text_len: 20_000,
        }
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the maximum retained text length.
    pub fn with_max_text_len(mut self, max: usize) -> Self {
        self.max_text_len = max;
        self
    }

    async fn get_body(&self, url: &str) -> FetchResult<(String, Url)> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    warn!(url = %url, error = %e, "HTTP request failed");
                    FetchError::Http {
                        url: url.to_string(),
                        source: Box::new(e),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                source: Box::new(std::io::Error::other(format!("HTTP {}", status))),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: Box::new(e),
        })?;

        Ok((body, final_url))
    }

    /// Strip HTML down to readable text.
    fn html_to_text(&self, html: &str) -> String {
        let mut text = html.to_string();

        // Remove scripts and styles wholesale
        let script_pattern = Regex::new(r"(?s)<script[^>]*>.*?</script>").unwrap();
        let style_pattern = Regex::new(r"(?s)<style[^>]*>.*?</style>").unwrap();
        text = script_pattern.replace_all(&text, "").to_string();
        text = style_pattern.replace_all(&text, "").to_string();

        // Block elements become line breaks so words don't run together
        let block_pattern = Regex::new(r"</?(p|div|br|li|h[1-6]|tr|section|article)[^>]*>").unwrap();
        text = block_pattern.replace_all(&text, "\n").to_string();

        // Remaining tags
        let tag_pattern = Regex::new(r"<[^>]+>").unwrap();
        text = tag_pattern.replace_all(&text, " ").to_string();

        // Decode the common entities
        text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'");

        // Collapse whitespace runs
        let spaces = Regex::new(r"[ \t]{2,}").unwrap();
        text = spaces.replace_all(&text, " ").to_string();
        let newlines = Regex::new(r"\n{3,}").unwrap();
        text = newlines.replace_all(&text, "\n\n").to_string();

        text.trim().to_string()
    }

    /// Extract the page title.
    fn extract_title(&self, html: &str) -> Option<String> {
        let title_pattern = Regex::new(r"(?s)<title[^>]*>(.*?)</title>").ok()?;
        title_pattern
            .captures(html)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    /// Same-origin outbound links, absolute.
    fn extract_links(&self, base_url: &Url, html: &str) -> Vec<String> {
        let href_pattern = Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap();
        let mut links = Vec::new();

        for cap in href_pattern.captures_iter(html) {
            let href = cap[1].trim();
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
            {
                continue;
            }

            let Ok(resolved) = base_url.join(href) else {
                continue;
            };
            if resolved.host_str() != base_url.host_str() {
                continue;
            }

            let mut resolved = resolved;
            resolved.set_fragment(None);
            let absolute = resolved.to_string();
            if !links.contains(&absolute) {
                links.push(absolute);
            }
        }

        links
    }

    /// Harvest email addresses from text.
    fn extract_emails(&self, text: &str) -> Vec<String> {
        let email_pattern =
            Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap();
        let mut emails = Vec::new();
        for m in email_pattern.find_iter(text) {
            let email = m.as_str().to_lowercase();
            if !emails.contains(&email) {
                emails.push(email);
            }
        }
        emails
    }

    /// Harvest absolute web addresses from text.
    fn extract_urls(&self, text: &str) -> Vec<String> {
        let url_pattern = Regex::new(r#"https?://[^\s"'<>)\]]+"#).unwrap();
        let mut urls = Vec::new();
        for m in url_pattern.find_iter(text) {
            let found = m.as_str().trim_end_matches(['.', ',']).to_string();
            if !urls.contains(&found) {
                urls.push(found);
            }
        }
        urls
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<CandidatePage> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let (html, final_url) = self.get_body(url).await?;
        debug!(url = %url, body_len = html.len(), "page fetched");

        let title = self.extract_title(&html).unwrap_or_default();
        let links = self.extract_links(&final_url, &html);

        let mut text = self.html_to_text(&html);
        let emails = self.extract_emails(&text);
        let harvested_urls = self.extract_urls(&text);
        if text.len() > self.max_text_len {
            let mut cut = self.max_text_len;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }

        Ok(CandidatePage {
            url: final_url.to_string(),
            title,
            text,
            links,
            emails,
            harvested_urls,
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_raw(&self, url: &str) -> FetchResult<String> {
        let (body, _) = self.get_body(url).await?;
        Ok(body)
    }
}
