//! Similarity matching of free-text terms against the registry.
//!
//! Matching runs in three tiers, each strictly more expensive than the
//! last, first hit wins:
//!
//! 1. Exact match against a canonical name or alias (similarity 1.0)
//! 2. Bidirectional substring containment (similarity 0.95), so
//!    "Crime Fiction" matches "Crime"
//! 3. Cosine similarity of embedding fingerprints, accepted only at or
//!    above the configured threshold
//!
//! A below-threshold best candidate is still reported so callers can
//! surface it for manual review without accepting it.

use tracing::{debug, warn};

use crate::traits::oracle::Embedder;
use crate::types::config::MatchConfig;
use crate::types::registry::RegistryEntry;

/// Stop-articles stripped during normalization.
const STOP_ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Generic category words that carry no genre signal on their own.
const GENERIC_TERMS: [&str; 10] = [
    "fiction",
    "nonfiction",
    "non-fiction",
    "books",
    "general",
    "stories",
    "writing",
    "etc",
    "more",
    "other",
];

/// Result of matching one raw term.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Accepted canonical name, when a tier matched
    pub matched: Option<String>,

    /// Similarity of the accepted match, or of the best candidate
    pub similarity: f32,

    /// Closest registry term when nothing was accepted
    pub best_candidate: Option<String>,
}

impl MatchOutcome {
    fn miss() -> Self {
        Self {
            matched: None,
            similarity: 0.0,
            best_candidate: None,
        }
    }
}

/// An unmatched term surfaced for manual review.
#[derive(Debug, Clone)]
pub struct ReviewCandidate {
    /// The raw term as written on the page
    pub raw: String,

    /// Closest registry term, if any fingerprinted entry existed
    pub best_candidate: Option<String>,

    /// Similarity to the best candidate
    pub similarity: f32,
}

/// Result of classifying a raw delimited genre string.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedTerms {
    /// Accepted canonical names, deduplicated
    pub matched: Vec<String>,

    /// Unaccepted terms, most similar first, capped for reviewer sanity
    pub unmatched: Vec<ReviewCandidate>,
}

/// Normalize a term for comparison: lowercase, trim, strip English
/// stop-articles, collapse whitespace.
pub fn normalize_term(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let words: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !STOP_ARTICLES.contains(w))
        .collect();
    words.join(" ")
}

/// Cosine similarity between two vectors.
///
/// Defined as exactly 0 when either vector has zero magnitude, or when
/// dimensions disagree (fingerprints from different models).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a.sqrt() * mag_b.sqrt())
}

/// Match a raw term against registry entries through the tier ladder.
pub async fn find_best_match<E: Embedder>(
    raw: &str,
    entries: &[&RegistryEntry],
    embedder: &E,
    config: &MatchConfig,
) -> MatchOutcome {
    let normalized = normalize_term(raw);
    if normalized.is_empty() {
        return MatchOutcome::miss();
    }

    // Tier 1: exact canonical or alias match
    for entry in entries {
        if normalize_term(&entry.name) == normalized
            || entry.aliases.iter().any(|a| normalize_term(a) == normalized)
        {
            return MatchOutcome {
                matched: Some(entry.name.clone()),
                similarity: 1.0,
                best_candidate: None,
            };
        }
    }

    // Tier 2: bidirectional substring containment
    for entry in entries {
        let entry_norm = normalize_term(&entry.name);
        if entry_norm.is_empty() {
            continue;
        }
        if normalized.contains(&entry_norm) || entry_norm.contains(&normalized) {
            return MatchOutcome {
                matched: Some(entry.name.clone()),
                similarity: 0.95,
                best_candidate: None,
            };
        }
    }

    // Tier 3: vector similarity; an embedding failure for the raw term
    // degrades to "no vector match" rather than failing the caller
    let raw_fingerprint = match embedder.embed(&normalized).await {
        Ok(v) => v,
        Err(e) => {
            warn!(term = %raw, error = %e, "embedding failed during matching");
            return MatchOutcome::miss();
        }
    };

    vector_match(&raw_fingerprint, entries, config)
}

/// The vector tier alone, separated for direct testing.
pub fn vector_match(
    raw_fingerprint: &[f32],
    entries: &[&RegistryEntry],
    config: &MatchConfig,
) -> MatchOutcome {
    let mut best: Option<(&RegistryEntry, f32)> = None;
    for entry in entries {
        let Some(fingerprint) = &entry.fingerprint else {
            continue;
        };
        let similarity = cosine_similarity(raw_fingerprint, fingerprint);
        if best.map(|(_, s)| similarity > s).unwrap_or(true) {
            best = Some((entry, similarity));
        }
    }

    match best {
        Some((entry, similarity)) if similarity >= config.similarity_threshold => MatchOutcome {
            matched: Some(entry.name.clone()),
            similarity,
            best_candidate: None,
        },
        Some((entry, similarity)) => MatchOutcome {
            matched: None,
            similarity,
            best_candidate: Some(entry.name.clone()),
        },
        None => MatchOutcome::miss(),
    }
}

/// Split a raw delimited genre string into candidate terms.
fn split_terms(raw: &str) -> Vec<String> {
    raw.replace(" and ", ",")
        .replace(" & ", ",")
        .split([',', ';', '/', '|', '\n'])
        .map(|t| t.trim().trim_matches('.').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Classify a raw delimited genre string against registry entries.
///
/// Short tokens and generic category words are dropped, accepted matches
/// are deduplicated by canonical name, and the unmatched review list is
/// capped at `max_review_terms` with least-similar entries evicted first.
pub async fn classify_free_text<E: Embedder>(
    raw: &str,
    entries: &[&RegistryEntry],
    embedder: &E,
    config: &MatchConfig,
) -> ClassifiedTerms {
    let mut result = ClassifiedTerms::default();

    for term in split_terms(raw) {
        let normalized = normalize_term(&term);
        if normalized.len() < config.min_term_len {
            continue;
        }
        if GENERIC_TERMS.contains(&normalized.as_str()) {
            continue;
        }

        let outcome = find_best_match(&term, entries, embedder, config).await;
        match outcome.matched {
            Some(name) => {
                if !result
                    .matched
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case(&name))
                {
                    result.matched.push(name);
                }
            }
            None => {
                debug!(term = %term, similarity = outcome.similarity, "unmatched term");
                result.unmatched.push(ReviewCandidate {
                    raw: term,
                    best_candidate: outcome.best_candidate,
                    similarity: outcome.similarity,
                });
            }
        }
    }

    // Keep only the most promising rejects for human review
    result
        .unmatched
        .sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    result.unmatched.truncate(config.max_review_terms);

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockEmbedder;
    use crate::types::registry::{Provenance, TermCategory};
    use proptest::prelude::*;

    fn entry(name: &str) -> RegistryEntry {
        RegistryEntry::new(name, TermCategory::Fiction, Provenance::Seed)
    }

    #[test]
    fn test_normalize_strips_articles() {
        assert_eq!(normalize_term("The  Crime"), "crime");
        assert_eq!(normalize_term("  A Horror Story "), "horror story");
        assert_eq!(normalize_term("an"), "");
    }

    #[test]
    fn test_cosine_zero_magnitude_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_cosine_mismatched_dims_is_zero() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let sim = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_cosine_symmetric_and_bounded(
            a in proptest::collection::vec(-10.0f32..10.0, 8),
            b in proptest::collection::vec(-10.0f32..10.0, 8),
        ) {
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-6);
            prop_assert!((-1.0001..=1.0001).contains(&ab));
        }
    }

    #[tokio::test]
    async fn test_exact_match_through_article() {
        let crime = entry("Crime");
        let entries = vec![&crime];
        let embedder = MockEmbedder::new();
        let config = MatchConfig::default();

        let outcome = find_best_match("the Crime", &entries, &embedder, &config).await;
        assert_eq!(outcome.matched.as_deref(), Some("Crime"));
        assert_eq!(outcome.similarity, 1.0);
    }

    #[tokio::test]
    async fn test_alias_match() {
        let scifi = entry("Science Fiction").with_aliases(["Sci-Fi", "SF"]);
        let entries = vec![&scifi];
        let embedder = MockEmbedder::new();
        let config = MatchConfig::default();

        let outcome = find_best_match("sci-fi", &entries, &embedder, &config).await;
        assert_eq!(outcome.matched.as_deref(), Some("Science Fiction"));
        assert_eq!(outcome.similarity, 1.0);
    }

    #[tokio::test]
    async fn test_substring_containment() {
        let crime = entry("Crime");
        let entries = vec![&crime];
        let embedder = MockEmbedder::new();
        let config = MatchConfig::default();

        let outcome = find_best_match("Crime Thrillers", &entries, &embedder, &config).await;
        assert_eq!(outcome.matched.as_deref(), Some("Crime"));
        assert_eq!(outcome.similarity, 0.95);
    }

    #[tokio::test]
    async fn test_vector_match_threshold() {
        let fantasy = entry("Fantasy").with_fingerprint(vec![1.0, 0.0]);
        let entries = vec![&fantasy];
        let config = MatchConfig::default();

        // Above threshold: accepted
        let hit = vector_match(&[0.95, 0.05], &entries, &config);
        assert_eq!(hit.matched.as_deref(), Some("Fantasy"));

        // Below threshold: reported but not accepted
        let miss = vector_match(&[0.3, 0.9], &entries, &config);
        assert!(miss.matched.is_none());
        assert_eq!(miss.best_candidate.as_deref(), Some("Fantasy"));
        assert!(miss.similarity < config.similarity_threshold);
    }

    #[test]
    fn test_vector_match_skips_unfingerprinted() {
        let bare = entry("Bare");
        let entries = vec![&bare];
        let config = MatchConfig::default();

        let outcome = vector_match(&[1.0, 0.0], &entries, &config);
        assert!(outcome.matched.is_none());
        assert!(outcome.best_candidate.is_none());
    }

    #[tokio::test]
    async fn test_classify_dedupes_and_drops_generic() {
        let crime = entry("Crime");
        let entries = vec![&crime];
        let embedder = MockEmbedder::new();
        let config = MatchConfig::default();

        let result = classify_free_text(
            "Crime, crime fiction, fiction, xy",
            &entries,
            &embedder,
            &config,
        )
        .await;

        // "Crime" and "crime fiction" both resolve to Crime; "fiction" is
        // generic; "xy" is too short
        assert_eq!(result.matched, vec!["Crime".to_string()]);
    }

    #[tokio::test]
    async fn test_classify_caps_unmatched_at_most_similar() {
        let config = MatchConfig::default();
        let embedder = MockEmbedder::new();
        let entries: Vec<&RegistryEntry> = Vec::new();

        let raw = "zebra one, zebra two, zebra three, zebra four, zebra five, zebra six, zebra seven";
        let result = classify_free_text(raw, &entries, &embedder, &config).await;

        assert!(result.matched.is_empty());
        assert!(result.unmatched.len() <= config.max_review_terms);
        // Sorted most-similar first
        for pair in result.unmatched.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }
}
