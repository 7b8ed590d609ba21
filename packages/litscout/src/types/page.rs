//! Fetched page types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page produced by the fetch boundary, consumed once per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePage {
    /// Final URL of the page
    pub url: String,

    /// Page title, empty when none was found
    #[serde(default)]
    pub title: String,

    /// Tag-stripped text, bounded to the fetcher's retention limit
    pub text: String,

    /// Same-origin outbound links, absolute
    #[serde(default)]
    pub links: Vec<String>,

    /// Email addresses harvested opportunistically from the text
    #[serde(default)]
    pub emails: Vec<String>,

    /// Web addresses harvested opportunistically from the text
    #[serde(default)]
    pub harvested_urls: Vec<String>,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CandidatePage {
    /// Create a new page with the given URL and text.
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            text: text.into(),
            links: Vec::new(),
            emails: Vec::new(),
            harvested_urls: Vec::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set same-origin links.
    pub fn with_links(mut self, links: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.links = links.into_iter().map(|l| l.into()).collect();
        self
    }

    /// Set harvested emails.
    pub fn with_emails(mut self, emails: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.emails = emails.into_iter().map(|e| e.into()).collect();
        self
    }

    /// A short preview for triage prompts: title plus leading text.
    pub fn preview(&self, max_chars: usize) -> String {
        let text: String = self.text.chars().take(max_chars).collect();
        if self.title.is_empty() {
            text
        } else {
            format!("{}: {}", self.title, text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_includes_title() {
        let page = CandidatePage::new("https://example.com", "Body text here").with_title("About");
        assert_eq!(page.preview(4), "About: Body");
    }

    #[test]
    fn test_preview_bounds_text() {
        let page = CandidatePage::new("https://example.com", "abcdefgh");
        assert_eq!(page.preview(3), "abc");
    }
}
