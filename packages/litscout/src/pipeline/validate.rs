//! Record normalization, confidence scoring, and the quality gate.
//!
//! The gate is a pure filter: acceptance and rejection are logged, never
//! raised as errors.

use regex::Regex;
use tracing::{debug, info};

use crate::pipeline::consensus::adjust_confidence;
use crate::types::config::ValidateOptions;
use crate::types::record::{is_unknown, ConsensusRecord, ExtractionSample, ValidatedRecord};

/// Generic, role-based email prefixes that never identify a person.
const GENERIC_EMAIL_PREFIXES: [&str; 12] = [
    "info",
    "admin",
    "support",
    "contact",
    "office",
    "hello",
    "mail",
    "enquiries",
    "inquiries",
    "submissions",
    "noreply",
    "no-reply",
];

/// Normalize a person name: collapse whitespace and flip a single
/// "Last, First" into "First Last".
pub fn normalize_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");

    let parts: Vec<&str> = collapsed.split(',').map(str::trim).collect();
    if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
        return format!("{} {}", parts[1], parts[0]);
    }

    collapsed
}

/// Syntactic email check. Not RFC-complete; it gates obvious garbage.
pub fn is_valid_email(email: &str) -> bool {
    let pattern = Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
    pattern.is_match(email.trim())
}

/// True when the email's local part is a generic role prefix.
pub fn is_generic_email(email: &str) -> bool {
    let local = email.trim().to_lowercase();
    let Some(local) = local.split('@').next() else {
        return false;
    };
    GENERIC_EMAIL_PREFIXES.contains(&local)
}

/// A contact email counts only when syntactically valid and not generic.
pub fn is_usable_email(email: &str) -> bool {
    is_valid_email(email) && !is_generic_email(email)
}

/// Syntactically valid absolute web address with an http/https scheme.
pub fn is_valid_website(website: &str) -> bool {
    match url::Url::parse(website.trim()) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Normalize every field in place: sentinels become empty strings, text
/// is trimmed, names are reordered, list items are cleaned.
pub fn normalize_record(sample: &mut ExtractionSample) {
    let clear = |value: &mut String| {
        let trimmed = value.trim();
        *value = if is_unknown(trimmed) {
            String::new()
        } else {
            trimmed.to_string()
        };
    };

    clear(&mut sample.name);
    sample.name = normalize_name(&sample.name);
    clear(&mut sample.role);
    clear(&mut sample.organization);
    clear(&mut sample.organization_evidence);
    clear(&mut sample.email);
    sample.email = sample.email.to_lowercase();
    clear(&mut sample.website);
    clear(&mut sample.country);
    clear(&mut sample.genres_raw);
    clear(&mut sample.bio);

    let clean_list = |items: &mut Vec<String>| {
        items.retain(|i| !is_unknown(i));
        for item in items.iter_mut() {
            *item = item.trim().to_string();
        }
    };
    clean_list(&mut sample.fiction_genres);
    clean_list(&mut sample.nonfiction_genres);
    clean_list(&mut sample.excluded_genres);
    clean_list(&mut sample.audiences);
    clean_list(&mut sample.keywords);
}

/// Deterministic confidence score in [0, 100], additive.
pub fn score_confidence(sample: &ExtractionSample) -> u8 {
    let mut score: u32 = 0;

    if !sample.name.is_empty() {
        score += 30;
    }
    if is_usable_email(&sample.email) {
        score += 20;
    }
    if !sample.organization.is_empty() {
        score += 20;
    }
    if !sample.fiction_genres.is_empty() || !sample.nonfiction_genres.is_empty() {
        score += 5;
    }
    if sample.open_to_submissions.is_some() {
        score += 10;
    }
    if sample.wants_query_letter == Some(true)
        || sample.wants_synopsis == Some(true)
        || sample.wants_sample_pages == Some(true)
    {
        score += 10;
    }
    if is_valid_website(&sample.website) {
        score += 5;
    }

    score.min(100) as u8
}

/// Quality gate over a normalized record.
pub fn passes_quality_gate(sample: &ExtractionSample, confidence: u8, floor: u8) -> bool {
    if sample.name.is_empty() {
        return false;
    }
    if sample.email.is_empty() && sample.website.is_empty() && sample.organization.is_empty() {
        return false;
    }
    confidence >= floor
}

/// Normalize, score, and gate a consensus record.
///
/// Returns `None` when the record fails the gate; rejection is logged,
/// never raised.
pub fn validate(consensus: ConsensusRecord, options: &ValidateOptions) -> Option<ValidatedRecord> {
    let ConsensusRecord {
        mut record,
        overall_score,
        needs_review,
        ..
    } = consensus;

    normalize_record(&mut record);

    let base_confidence = score_confidence(&record);
    let confidence = adjust_confidence(base_confidence, overall_score);

    if !passes_quality_gate(&record, confidence, options.min_confidence) {
        info!(
            url = %record.source_url,
            name = %record.name,
            confidence,
            "record rejected by quality gate"
        );
        return None;
    }

    debug!(
        url = %record.source_url,
        name = %record.name,
        confidence,
        needs_review,
        "record accepted"
    );

    Some(ValidatedRecord {
        record,
        confidence,
        consensus_score: overall_score,
        needs_review,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn consensus_of(sample: ExtractionSample, overall: f64) -> ConsensusRecord {
        ConsensusRecord {
            record: sample,
            field_agreement: HashMap::new(),
            overall_score: overall,
            needs_review: false,
        }
    }

    #[test]
    fn test_normalize_name_flips_last_first() {
        assert_eq!(normalize_name("Doe, Jane"), "Jane Doe");
        assert_eq!(normalize_name("  Jane   Doe "), "Jane Doe");
        // More than one comma is left alone
        assert_eq!(normalize_name("Doe, Jane, PhD"), "Doe, Jane, PhD");
    }

    #[test]
    fn test_email_checks() {
        assert!(is_valid_email("jane@acme.com"));
        assert!(!is_valid_email("jane@acme"));
        assert!(!is_valid_email("not an email"));

        assert!(is_generic_email("info@acme.com"));
        assert!(is_generic_email("Admin@acme.com"));
        assert!(!is_generic_email("jane@acme.com"));

        assert!(is_usable_email("jane@acme.com"));
        assert!(!is_usable_email("info@acme.com"));
    }

    #[test]
    fn test_website_check() {
        assert!(is_valid_website("https://acme.com/submissions"));
        assert!(is_valid_website("http://acme.com"));
        assert!(!is_valid_website("acme.com"));
        assert!(!is_valid_website("ftp://acme.com"));
        assert!(!is_valid_website(""));
    }

    #[test]
    fn test_normalize_clears_sentinels() {
        let mut sample = ExtractionSample::unknown("https://acme.com");
        sample.name = "Doe, Jane".to_string();
        sample.email = "Jane@Acme.com ".to_string();
        sample.keywords = vec!["Unknown".to_string(), " crime ".to_string()];

        normalize_record(&mut sample);
        assert_eq!(sample.name, "Jane Doe");
        assert_eq!(sample.email, "jane@acme.com");
        assert_eq!(sample.organization, "");
        assert_eq!(sample.bio, "");
        assert_eq!(sample.keywords, vec!["crime"]);
    }

    #[test]
    fn test_score_full_record() {
        let mut sample = ExtractionSample::unknown("https://acme.com");
        sample.name = "Jane Doe".to_string();
        sample.email = "jane@acme.com".to_string();
        sample.organization = "Acme Literary".to_string();
        sample.fiction_genres = vec!["Crime".to_string()];
        sample.open_to_submissions = Some(true);
        sample.wants_query_letter = Some(true);
        sample.website = "https://acme.com/jane".to_string();
        normalize_record(&mut sample);

        assert_eq!(score_confidence(&sample), 100);
    }

    #[test]
    fn test_generic_email_loses_contact_points() {
        let mut sample = ExtractionSample::unknown("https://acme.com");
        sample.name = "Jane Doe".to_string();
        sample.email = "info@acme.com".to_string();
        normalize_record(&mut sample);

        // 30 for the name only; the generic email earns nothing
        assert_eq!(score_confidence(&sample), 30);
    }

    #[test]
    fn test_gate_rejects_empty_name() {
        let mut sample = ExtractionSample::unknown("https://acme.com");
        sample.email = "jane@acme.com".to_string();
        sample.organization = "Acme".to_string();
        normalize_record(&mut sample);

        let confidence = score_confidence(&sample);
        assert!(!passes_quality_gate(&sample, confidence, 20));
    }

    #[test]
    fn test_gate_accepts_name_plus_contact() {
        let mut sample = ExtractionSample::unknown("https://acme.com");
        sample.name = "Jane Doe".to_string();
        sample.email = "jane@acme.com".to_string();
        normalize_record(&mut sample);

        let confidence = score_confidence(&sample);
        assert!(confidence >= 20);
        assert!(passes_quality_gate(&sample, confidence, 20));
    }

    #[test]
    fn test_validate_rejects_contactless_record() {
        let mut sample = ExtractionSample::unknown("https://acme.com");
        sample.name = "Jane Doe".to_string();

        let result = validate(consensus_of(sample, 1.0), &ValidateOptions::default());
        assert!(result.is_none());
    }

    #[test]
    fn test_validate_carries_consensus_metadata() {
        let mut sample = ExtractionSample::unknown("https://acme.com");
        sample.name = "Jane Doe".to_string();
        sample.email = "jane@acme.com".to_string();

        let validated = validate(consensus_of(sample, 0.9), &ValidateOptions::default()).unwrap();
        assert_eq!(validated.consensus_score, 0.9);
        // 30 (name) + 20 (email) + 10 (consensus >= 0.8)
        assert_eq!(validated.confidence, 60);
    }
}
