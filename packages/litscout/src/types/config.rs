//! Configuration types for matching, extraction, consensus, and crawling.
//!
//! Every tunable the spec leaves open (similarity threshold, quality floor,
//! candidate cap) lives here as configuration with the documented default,
//! not as a hard-coded invariant.

use serde::{Deserialize, Serialize};

/// Configuration for similarity matching against the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Minimum cosine similarity to accept a vector match. Default: 0.82.
    pub similarity_threshold: f32,

    /// Maximum unmatched candidates surfaced for manual review. Default: 5.
    pub max_review_terms: usize,

    /// Tokens shorter than this are dropped before matching. Default: 3.
    pub min_term_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.82,
            max_review_terms: 5,
            min_term_len: 3,
        }
    }
}

impl MatchConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// Configuration for the multi-phase extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOptions {
    /// Compute the semantic profile fingerprint (Phase 3). Default: true.
    pub compute_profile: bool,

    /// Maximum page-text characters included in the broad prompt.
    pub max_prompt_text: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            compute_profile: true,
            max_prompt_text: 8000,
        }
    }
}

/// Configuration for the self-consistency engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusOptions {
    /// Ascending temperature schedule; length is the sample count.
    /// Default: [0.0, 0.3].
    pub temperatures: Vec<f32>,

    /// Fields whose disagreement alone forces review.
    pub critical_fields: Vec<String>,

    /// Agreement floor for critical fields. Default: 2/3.
    pub critical_floor: f64,

    /// Overall-score floor below which review is forced. Default: 0.7.
    pub review_floor: f64,
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        Self {
            temperatures: vec![0.0, 0.3],
            critical_fields: vec![
                "name".to_string(),
                "email".to_string(),
                "organization".to_string(),
            ],
            critical_floor: 2.0 / 3.0,
            review_floor: 0.7,
        }
    }
}

impl ConsensusOptions {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a single zero-temperature sample (disables voting).
    pub fn single_sample(mut self) -> Self {
        self.temperatures = vec![0.0];
        self
    }

    /// Set the temperature schedule.
    pub fn with_temperatures(mut self, temperatures: impl IntoIterator<Item = f32>) -> Self {
        self.temperatures = temperatures.into_iter().collect();
        self
    }
}

/// Configuration for validation and the quality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateOptions {
    /// Records scoring below this are rejected. Default: 20.
    pub min_confidence: u8,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self { min_confidence: 20 }
    }
}

/// How the orchestrator treats a seed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// Fetch and extract only the seed URL; no discovery or triage
    Single,

    /// Full pipeline: discover, filter, fetch, triage, extract
    Dynamic,
}

/// Configuration for a crawl run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlOptions {
    /// Hard cap on candidate pages per site. Default: 25.
    pub max_pages: usize,

    /// Bounded fetch concurrency. Default: 5.
    pub concurrency: usize,

    /// Pages with less fetched text than this are dropped. Default: 200.
    pub min_text_len: usize,

    /// Oracle ranking kicks in above this many candidates. Default: 10.
    pub ranking_threshold: usize,

    /// Triage is skipped when at most this many pages fetched. Default: 2.
    pub triage_skip_at: usize,

    /// Sample URLs included in an overflow warning. Default: 10.
    pub overflow_sample_size: usize,

    /// Externally-resolved country, attached to records that lack one.
    pub country_hint: Option<String>,

    /// Matching configuration.
    pub matching: MatchConfig,

    /// Extractor configuration.
    pub extract: ExtractOptions,

    /// Self-consistency configuration.
    pub consensus: ConsensusOptions,

    /// Validation configuration.
    pub validate: ValidateOptions,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: 25,
            concurrency: 5,
            min_text_len: 200,
            ranking_threshold: 10,
            triage_skip_at: 2,
            overflow_sample_size: 10,
            country_hint: None,
            matching: MatchConfig::default(),
            extract: ExtractOptions::default(),
            consensus: ConsensusOptions::default(),
            validate: ValidateOptions::default(),
        }
    }
}

impl CrawlOptions {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page cap.
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = max;
        self
    }

    /// Set the fetch concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the country hint.
    pub fn with_country_hint(mut self, country: impl Into<String>) -> Self {
        self.country_hint = Some(country.into());
        self
    }

    /// Set the consensus configuration.
    pub fn with_consensus(mut self, consensus: ConsensusOptions) -> Self {
        self.consensus = consensus;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let opts = CrawlOptions::default();
        assert_eq!(opts.max_pages, 25);
        assert_eq!(opts.concurrency, 5);
        assert_eq!(opts.min_text_len, 200);
        assert_eq!(opts.matching.similarity_threshold, 0.82);
        assert_eq!(opts.validate.min_confidence, 20);
        assert_eq!(opts.consensus.temperatures, vec![0.0, 0.3]);
    }

    #[test]
    fn test_concurrency_never_zero() {
        let opts = CrawlOptions::new().with_concurrency(0);
        assert_eq!(opts.concurrency, 1);
    }
}
