//! Multi-phase extraction of one page into a structured record.
//!
//! Phase 1 makes one broad oracle call producing the full candidate record,
//! with explicit "Unknown" sentinels for anything the page doesn't state.
//! Phase 2 fans out three independent classification calls concurrently:
//! genre matching (local, via the similarity matcher), exclusion terms
//! (focused oracle call constrained to the registry), and audience brackets
//! (focused oracle call against a closed vocabulary). Phase 3 optionally
//! computes a semantic profile fingerprint; its failure is never fatal.
//!
//! An unrecoverable Phase-1 failure yields a sentinel error record, not an
//! error: callers treat it as zero-information extraction and move on.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::matcher::{classify_free_text, ClassifiedTerms};
use crate::oracle::repair::repair_and_parse;
use crate::pipeline::prompts::{
    format_audience_prompt, format_broad_prompt, format_exclusion_prompt, AUDIENCE_VOCABULARY,
    SCALAR_FIELDS,
};
use crate::traits::oracle::{Embedder, Oracle, OracleRequest};
use crate::types::config::{ExtractOptions, MatchConfig};
use crate::types::page::CandidatePage;
use crate::types::record::{is_unknown, AgencyKnowledge, ExtractionSample, UNKNOWN};
use crate::types::registry::{Registry, TermCategory};

/// Read a string field leniently: strings pass through, numbers and bools
/// are stringified, arrays of strings are comma-joined.
fn take_str(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Array(items)) => {
            let joined = items
                .iter()
                .filter_map(|i| i.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            if joined.is_empty() {
                UNKNOWN.to_string()
            } else {
                joined
            }
        }
        _ => UNKNOWN.to_string(),
    }
}

/// Read a tri-state flag leniently: booleans pass through, "true"/"yes"
/// and "false"/"no" strings are coerced, everything else is unknown.
fn take_flag(value: &Value, key: &str) -> Option<bool> {
    match value.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read a list field leniently: arrays pass through, a delimited string is
/// split. Empty and sentinel items are dropped.
fn take_list(value: &Value, key: &str) -> Vec<String> {
    let items: Vec<String> = match value.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|i| i.as_str())
            .map(|s| s.trim().to_string())
            .collect(),
        Some(Value::String(s)) => s.split(',').map(|i| i.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter(|i| !is_unknown(i)).collect()
}

/// Map a parsed broad response onto a sample.
pub fn parse_broad_response(value: &Value, source_url: &str) -> ExtractionSample {
    let mut sample = ExtractionSample::unknown(source_url);
    sample.name = take_str(value, "name");
    sample.role = take_str(value, "role");
    sample.organization = take_str(value, "organization");
    sample.organization_evidence = take_str(value, "organization_evidence");
    sample.email = take_str(value, "email");
    sample.website = take_str(value, "website");
    sample.country = take_str(value, "country");
    sample.genres_raw = take_str(value, "genres_raw");
    sample.open_to_submissions = take_flag(value, "open_to_submissions");
    sample.wants_query_letter = take_flag(value, "wants_query_letter");
    sample.wants_synopsis = take_flag(value, "wants_synopsis");
    sample.wants_sample_pages = take_flag(value, "wants_sample_pages");
    sample.bio = take_str(value, "bio");
    sample.keywords = take_list(value, "keywords");
    sample
}

/// Filter classifier output to terms that exist in an authoritative
/// vocabulary, recovering canonical casing. Hallucinated names vanish.
fn filter_to_vocabulary(raw_terms: Vec<String>, vocabulary: &[String]) -> Vec<String> {
    let mut accepted = Vec::new();
    for term in raw_terms {
        if let Some(canonical) = vocabulary
            .iter()
            .find(|v| v.eq_ignore_ascii_case(term.trim()))
        {
            if !accepted.contains(canonical) {
                accepted.push(canonical.clone());
            }
        }
    }
    accepted
}

/// Extract one sample from a page at the given temperature.
pub async fn extract_sample<O: Oracle, E: Embedder>(
    oracle: &O,
    embedder: &E,
    registry: &Registry,
    page: &CandidatePage,
    known: Option<&AgencyKnowledge>,
    temperature: f32,
    matching: &MatchConfig,
    options: &ExtractOptions,
) -> ExtractionSample {
    // Phase 1: broad extraction
    let prompt = format_broad_prompt(page, known, options.max_prompt_text);
    let raw = match oracle
        .generate(&OracleRequest::broad(prompt, temperature))
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!(url = %page.url, error = %e, "broad extraction call failed");
            return ExtractionSample::failed(&page.url);
        }
    };

    let parsed = match repair_and_parse(&raw, &SCALAR_FIELDS) {
        Ok(value) => value,
        Err(e) => {
            warn!(url = %page.url, error = %e, "broad extraction output unusable");
            return ExtractionSample::failed(&page.url);
        }
    };

    let mut sample = parse_broad_response(&parsed, &page.url);

    // Prefer a harvested email when the oracle found none; the fetch
    // boundary saw the raw page, the oracle saw stripped text
    if is_unknown(&sample.email) {
        if let Some(first) = page.emails.first() {
            sample.email = first.clone();
        }
    }

    // Phase 2: three independent classifiers, no mutual data dependency
    let classification_text = if is_unknown(&sample.genres_raw) {
        page.text.chars().take(options.max_prompt_text).collect()
    } else {
        format!("{}\n{}", sample.genres_raw, sample.bio)
    };

    let entries: Vec<&crate::types::registry::RegistryEntry> = registry.entries.iter().collect();
    let term_names = registry.term_names();

    let genre_future = async {
        if is_unknown(&sample.genres_raw) {
            ClassifiedTerms::default()
        } else {
            classify_free_text(&sample.genres_raw, &entries, embedder, matching).await
        }
    };

    let exclusion_future = async {
        let prompt = format_exclusion_prompt(&classification_text, &term_names);
        match oracle.generate(&OracleRequest::focused(prompt)).await {
            Ok(raw) => match repair_and_parse(&raw, &[]) {
                Ok(value) => filter_to_vocabulary(take_list(&value, "excluded"), &term_names),
                Err(e) => {
                    debug!(url = %page.url, error = %e, "exclusion output unusable");
                    Vec::new()
                }
            },
            Err(e) => {
                debug!(url = %page.url, error = %e, "exclusion call failed");
                Vec::new()
            }
        }
    };

    let audience_future = async {
        let vocabulary: Vec<String> = AUDIENCE_VOCABULARY.iter().map(|s| s.to_string()).collect();
        let prompt = format_audience_prompt(&classification_text);
        match oracle.generate(&OracleRequest::focused(prompt)).await {
            Ok(raw) => match repair_and_parse(&raw, &[]) {
                Ok(value) => filter_to_vocabulary(take_list(&value, "audiences"), &vocabulary),
                Err(e) => {
                    debug!(url = %page.url, error = %e, "audience output unusable");
                    Vec::new()
                }
            },
            Err(e) => {
                debug!(url = %page.url, error = %e, "audience call failed");
                Vec::new()
            }
        }
    };

    let (genres, excluded, audiences) =
        tokio::join!(genre_future, exclusion_future, audience_future);

    for name in &genres.matched {
        match registry.category_of(name) {
            Some(TermCategory::Nonfiction) => sample.nonfiction_genres.push(name.clone()),
            Some(_) => sample.fiction_genres.push(name.clone()),
            None => {}
        }
    }
    if !genres.unmatched.is_empty() {
        info!(
            url = %page.url,
            terms = ?genres.unmatched.iter().map(|c| c.raw.as_str()).collect::<Vec<_>>(),
            "genre terms left for manual review"
        );
    }
    sample.excluded_genres = excluded;
    sample.audiences = audiences;

    // Phase 3: optional profile fingerprint, enrichment only
    if options.compute_profile {
        let profile_text = format!(
            "{}\n{}\n{}\n{}",
            sample.genres_raw,
            sample.bio,
            sample.keywords.join(", "),
            sample.audiences.join(", ")
        );
        match embedder.embed(&profile_text).await {
            Ok(v) => sample.profile_embedding = Some(v),
            Err(e) => {
                debug!(url = %page.url, error = %e, "profile embedding failed, continuing without");
            }
        }
    }

    // Known fields win over whatever the model produced, guaranteeing
    // agency-wide consistency within one run
    if let Some(known) = known {
        sample.organization = known.organization.clone();
        sample.organization_evidence = known.organization_evidence.clone();
        if !known.country.is_empty() {
            sample.country = known.country.clone();
        }
    }

    sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEmbedder, MockOracle};
    use crate::types::registry::{Provenance, RegistryEntry};

    fn registry_with(names: &[(&str, TermCategory)]) -> Registry {
        let mut registry = Registry::new("mock-embed");
        for (name, category) in names {
            registry
                .entries
                .push(RegistryEntry::new(*name, *category, Provenance::Seed));
        }
        registry
    }

    #[test]
    fn test_take_str_variants() {
        let value: Value =
            serde_json::json!({"a": "x", "b": ["p", "q"], "c": 7, "d": null, "e": "  "});
        assert_eq!(take_str(&value, "a"), "x");
        assert_eq!(take_str(&value, "b"), "p, q");
        assert_eq!(take_str(&value, "c"), "7");
        assert_eq!(take_str(&value, "d"), UNKNOWN);
        assert_eq!(take_str(&value, "e"), UNKNOWN);
        assert_eq!(take_str(&value, "missing"), UNKNOWN);
    }

    #[test]
    fn test_take_flag_variants() {
        let value: Value = serde_json::json!({"a": true, "b": "No", "c": "maybe", "d": null});
        assert_eq!(take_flag(&value, "a"), Some(true));
        assert_eq!(take_flag(&value, "b"), Some(false));
        assert_eq!(take_flag(&value, "c"), None);
        assert_eq!(take_flag(&value, "d"), None);
    }

    #[test]
    fn test_take_list_coerces_string() {
        let value: Value = serde_json::json!({"a": "one, two , Unknown", "b": ["x", ""]});
        assert_eq!(take_list(&value, "a"), vec!["one", "two"]);
        assert_eq!(take_list(&value, "b"), vec!["x"]);
    }

    #[test]
    fn test_filter_to_vocabulary_drops_hallucinations() {
        let vocabulary = vec!["Young Adult".to_string(), "Adult".to_string()];
        let raw = vec![
            "young adult".to_string(),
            "Toddler Epics".to_string(),
            "ADULT".to_string(),
        ];
        assert_eq!(
            filter_to_vocabulary(raw, &vocabulary),
            vec!["Young Adult".to_string(), "Adult".to_string()]
        );
    }

    #[tokio::test]
    async fn test_extract_sample_happy_path() {
        let oracle = MockOracle::new()
            .with_response(
                "extracting literary-agent contact details",
                r#"{"name": "Jane Doe", "organization": "Acme Literary",
                    "email": "jane@acme.com", "genres_raw": "Crime, Fantasy",
                    "open_to_submissions": true, "bio": "Loves crime."}"#,
            )
            .with_response("does NOT want", r#"{"excluded": ["Horror"]}"#)
            .with_response("audience", r#"{"audiences": ["Adult", "Space Operas"]}"#);
        let embedder = MockEmbedder::new();
        let registry = registry_with(&[
            ("Crime", TermCategory::Fiction),
            ("Fantasy", TermCategory::Fiction),
            ("Horror", TermCategory::Fiction),
            ("Memoir", TermCategory::Nonfiction),
        ]);
        let page = CandidatePage::new("https://acme.com/jane", "Jane Doe represents crime.");

        let sample = extract_sample(
            &oracle,
            &embedder,
            &registry,
            &page,
            None,
            0.0,
            &MatchConfig::default(),
            &ExtractOptions::default(),
        )
        .await;

        assert!(!sample.extraction_failed);
        assert_eq!(sample.name, "Jane Doe");
        assert_eq!(sample.email, "jane@acme.com");
        assert_eq!(sample.fiction_genres, vec!["Crime", "Fantasy"]);
        assert_eq!(sample.excluded_genres, vec!["Horror"]);
        // "Space Operas" is not in the closed vocabulary and is dropped
        assert_eq!(sample.audiences, vec!["Adult"]);
        assert_eq!(sample.open_to_submissions, Some(true));
        assert!(sample.profile_embedding.is_some());
    }

    #[tokio::test]
    async fn test_extract_sample_oracle_failure_yields_sentinel() {
        let oracle = MockOracle::new().failing();
        let embedder = MockEmbedder::new();
        let registry = registry_with(&[]);
        let page = CandidatePage::new("https://acme.com/jane", "text");

        let sample = extract_sample(
            &oracle,
            &embedder,
            &registry,
            &page,
            None,
            0.0,
            &MatchConfig::default(),
            &ExtractOptions::default(),
        )
        .await;

        assert!(sample.extraction_failed);
        assert!(is_unknown(&sample.name));
        assert_eq!(sample.source_url, "https://acme.com/jane");
    }

    #[tokio::test]
    async fn test_known_fields_force_overwrite() {
        let oracle = MockOracle::new().with_response(
            "extracting literary-agent contact details",
            r#"{"name": "Jane Doe", "organization": "Wrong Name Ltd", "country": "France"}"#,
        );
        let embedder = MockEmbedder::new();
        let registry = registry_with(&[]);
        let page = CandidatePage::new("https://acme.com/jane", "text");
        let known = AgencyKnowledge {
            organization: "Acme Literary".to_string(),
            organization_evidence: "site footer".to_string(),
            country: "UK".to_string(),
        };

        let sample = extract_sample(
            &oracle,
            &embedder,
            &registry,
            &page,
            Some(&known),
            0.0,
            &MatchConfig::default(),
            &ExtractOptions::default(),
        )
        .await;

        assert_eq!(sample.organization, "Acme Literary");
        assert_eq!(sample.country, "UK");
        assert_eq!(sample.name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_harvested_email_fills_gap() {
        let oracle = MockOracle::new().with_response(
            "extracting literary-agent contact details",
            r#"{"name": "Jane Doe"}"#,
        );
        let embedder = MockEmbedder::new();
        let registry = registry_with(&[]);
        let page = CandidatePage::new("https://acme.com/jane", "text")
            .with_emails(["jane@acme.com"]);

        let sample = extract_sample(
            &oracle,
            &embedder,
            &registry,
            &page,
            None,
            0.0,
            &MatchConfig::default(),
            &ExtractOptions::default(),
        )
        .await;

        assert_eq!(sample.email, "jane@acme.com");
    }
}
