//! Extraction record types.
//!
//! An [`ExtractionSample`] is one oracle-derived record for a page at one
//! sampling temperature. Every business field defaults to an explicit
//! `"Unknown"` sentinel (never silently absent) so downstream voting and
//! validation can distinguish "not found" from "not asked". The
//! self-consistency engine folds several samples into a
//! [`ConsensusRecord`], and the validator turns that into a
//! [`ValidatedRecord`] ready for the persistence sink.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel for fields the oracle could not find in the page text.
pub const UNKNOWN: &str = "Unknown";

/// True if a string field still carries the unknown sentinel (or nothing).
pub fn is_unknown(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN)
}

/// One structured record extracted from a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSample {
    /// Person's name
    pub name: String,

    /// Person's role or title (e.g. "Senior Literary Agent")
    pub role: String,

    /// Agency or organization name
    pub organization: String,

    /// Text evidence for the organization attribution
    pub organization_evidence: String,

    /// Contact email
    pub email: String,

    /// Personal or submission web address
    pub website: String,

    /// Country the person or agency operates from
    pub country: String,

    /// Raw free-text genre/interest wording, as found on the page
    pub genres_raw: String,

    /// Fiction genres matched against the registry
    pub fiction_genres: Vec<String>,

    /// Nonfiction genres matched against the registry
    pub nonfiction_genres: Vec<String>,

    /// Genres the person explicitly does not want
    pub excluded_genres: Vec<String>,

    /// Audience age brackets, from the closed audience vocabulary
    pub audiences: Vec<String>,

    /// Whether submissions are currently open, when stated
    pub open_to_submissions: Option<bool>,

    /// Submission requirement flags, when stated
    pub wants_query_letter: Option<bool>,
    pub wants_synopsis: Option<bool>,
    pub wants_sample_pages: Option<bool>,

    /// Free-text summary of the person's interests
    pub bio: String,

    /// Salient keywords
    pub keywords: Vec<String>,

    /// Semantic profile fingerprint (enrichment, may be absent)
    #[serde(default)]
    pub profile_embedding: Option<Vec<f32>>,

    // --- metadata, excluded from consensus voting ---
    /// Page the record was extracted from
    pub source_url: String,

    /// When extraction ran
    pub extracted_at: DateTime<Utc>,

    /// Set when the broad extraction phase failed unrecoverably; all
    /// business fields are at safe defaults and carry zero information
    #[serde(default)]
    pub extraction_failed: bool,
}

impl ExtractionSample {
    /// A record with every business field at its unknown default.
    pub fn unknown(source_url: impl Into<String>) -> Self {
        Self {
            name: UNKNOWN.to_string(),
            role: UNKNOWN.to_string(),
            organization: UNKNOWN.to_string(),
            organization_evidence: UNKNOWN.to_string(),
            email: UNKNOWN.to_string(),
            website: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            genres_raw: UNKNOWN.to_string(),
            fiction_genres: Vec::new(),
            nonfiction_genres: Vec::new(),
            excluded_genres: Vec::new(),
            audiences: Vec::new(),
            open_to_submissions: None,
            wants_query_letter: None,
            wants_synopsis: None,
            wants_sample_pages: None,
            bio: UNKNOWN.to_string(),
            keywords: Vec::new(),
            profile_embedding: None,
            source_url: source_url.into(),
            extracted_at: Utc::now(),
            extraction_failed: false,
        }
    }

    /// The sentinel record returned when broad extraction fails.
    pub fn failed(source_url: impl Into<String>) -> Self {
        let mut sample = Self::unknown(source_url);
        sample.extraction_failed = true;
        sample
    }

    /// Field names and values that participate in consensus voting.
    ///
    /// Metadata (source URL, timestamp, failure marker, profile embedding)
    /// is deliberately absent.
    pub fn voting_fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("name", FieldValue::Text(self.name.clone())),
            ("role", FieldValue::Text(self.role.clone())),
            ("organization", FieldValue::Text(self.organization.clone())),
            (
                "organization_evidence",
                FieldValue::Text(self.organization_evidence.clone()),
            ),
            ("email", FieldValue::Text(self.email.clone())),
            ("website", FieldValue::Text(self.website.clone())),
            ("country", FieldValue::Text(self.country.clone())),
            ("genres_raw", FieldValue::Text(self.genres_raw.clone())),
            (
                "fiction_genres",
                FieldValue::List(self.fiction_genres.clone()),
            ),
            (
                "nonfiction_genres",
                FieldValue::List(self.nonfiction_genres.clone()),
            ),
            (
                "excluded_genres",
                FieldValue::List(self.excluded_genres.clone()),
            ),
            ("audiences", FieldValue::List(self.audiences.clone())),
            (
                "open_to_submissions",
                FieldValue::Flag(self.open_to_submissions),
            ),
            (
                "wants_query_letter",
                FieldValue::Flag(self.wants_query_letter),
            ),
            ("wants_synopsis", FieldValue::Flag(self.wants_synopsis)),
            (
                "wants_sample_pages",
                FieldValue::Flag(self.wants_sample_pages),
            ),
            ("bio", FieldValue::Text(self.bio.clone())),
            ("keywords", FieldValue::List(self.keywords.clone())),
        ]
    }

    /// Write a consensus value back into the record.
    ///
    /// Unknown field names are ignored; voting only ever produces names
    /// from [`Self::voting_fields`].
    pub fn set_field(&mut self, field: &str, value: FieldValue) {
        match (field, value) {
            ("name", FieldValue::Text(v)) => self.name = v,
            ("role", FieldValue::Text(v)) => self.role = v,
            ("organization", FieldValue::Text(v)) => self.organization = v,
            ("organization_evidence", FieldValue::Text(v)) => self.organization_evidence = v,
            ("email", FieldValue::Text(v)) => self.email = v,
            ("website", FieldValue::Text(v)) => self.website = v,
            ("country", FieldValue::Text(v)) => self.country = v,
            ("genres_raw", FieldValue::Text(v)) => self.genres_raw = v,
            ("fiction_genres", FieldValue::List(v)) => self.fiction_genres = v,
            ("nonfiction_genres", FieldValue::List(v)) => self.nonfiction_genres = v,
            ("excluded_genres", FieldValue::List(v)) => self.excluded_genres = v,
            ("audiences", FieldValue::List(v)) => self.audiences = v,
            ("open_to_submissions", FieldValue::Flag(v)) => self.open_to_submissions = v,
            ("wants_query_letter", FieldValue::Flag(v)) => self.wants_query_letter = v,
            ("wants_synopsis", FieldValue::Flag(v)) => self.wants_synopsis = v,
            ("wants_sample_pages", FieldValue::Flag(v)) => self.wants_sample_pages = v,
            ("bio", FieldValue::Text(v)) => self.bio = v,
            ("keywords", FieldValue::List(v)) => self.keywords = v,
            _ => {}
        }
    }
}

/// A typed field value used during consensus voting.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(Option<bool>),
    List(Vec<String>),
}

impl FieldValue {
    /// Normalized form used for vote counting only, never for storage.
    ///
    /// Strings are case-folded and trimmed, flags are stringified, lists
    /// are case-folded and sorted so element order does not split votes.
    pub fn normalized(&self) -> String {
        match self {
            FieldValue::Text(s) => s.trim().to_lowercase(),
            FieldValue::Flag(None) => "unknown".to_string(),
            FieldValue::Flag(Some(b)) => b.to_string(),
            FieldValue::List(items) => {
                let mut lowered: Vec<String> =
                    items.iter().map(|i| i.trim().to_lowercase()).collect();
                lowered.sort();
                lowered.join("|")
            }
        }
    }
}

/// Per-field agreement statistics from self-consistency voting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldAgreement {
    /// Winning count / total samples, in [0, 1]
    pub score: f64,

    /// Samples that agreed with the consensus value
    pub agreement_count: usize,

    /// Total samples that voted
    pub sample_count: usize,
}

/// Per-page output of the self-consistency engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusRecord {
    /// Merged record carrying each field's consensus value
    pub record: ExtractionSample,

    /// Agreement statistics per voting field
    pub field_agreement: HashMap<String, FieldAgreement>,

    /// Mean of per-field scores
    pub overall_score: f64,

    /// Set when a critical field disagrees or overall agreement is low
    pub needs_review: bool,
}

impl ConsensusRecord {
    /// Agreement score for a field, defaulting to full agreement when the
    /// field never voted (single-sample runs record every field).
    pub fn agreement(&self, field: &str) -> f64 {
        self.field_agreement
            .get(field)
            .map(|a| a.score)
            .unwrap_or(1.0)
    }
}

/// Facts established once per crawl run and reused on every later page.
///
/// Created from the first page whose organization identity clears the
/// confidence bar; read-only afterward within the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyKnowledge {
    /// Agency or organization name
    pub organization: String,

    /// Text evidence the attribution was based on
    pub organization_evidence: String,

    /// Inferred country, empty when never established
    pub country: String,
}

impl AgencyKnowledge {
    /// Build knowledge from a confident record.
    pub fn from_sample(sample: &ExtractionSample) -> Self {
        Self {
            organization: sample.organization.clone(),
            organization_evidence: sample.organization_evidence.clone(),
            country: if is_unknown(&sample.country) {
                String::new()
            } else {
                sample.country.clone()
            },
        }
    }
}

/// A record that passed normalization, scoring, and the quality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedRecord {
    /// Normalized record (sentinels cleared, name reordered, fields trimmed)
    pub record: ExtractionSample,

    /// Deterministic confidence score in [0, 100]
    pub confidence: u8,

    /// Overall self-consistency agreement for the page
    pub consensus_score: f64,

    /// Carried over from consensus
    pub needs_review: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unknown() {
        assert!(is_unknown("Unknown"));
        assert!(is_unknown("unknown"));
        assert!(is_unknown("  "));
        assert!(is_unknown(""));
        assert!(!is_unknown("Jane Doe"));
    }

    #[test]
    fn test_normalized_list_ignores_order() {
        let a = FieldValue::List(vec!["Fantasy".to_string(), "Horror".to_string()]);
        let b = FieldValue::List(vec!["horror".to_string(), "fantasy".to_string()]);
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn test_normalized_flag() {
        assert_eq!(FieldValue::Flag(Some(true)).normalized(), "true");
        assert_eq!(FieldValue::Flag(None).normalized(), "unknown");
    }

    #[test]
    fn test_set_field_roundtrip() {
        let mut sample = ExtractionSample::unknown("https://example.com");
        for (field, value) in sample.clone().voting_fields() {
            sample.set_field(field, value.clone());
        }
        // Writing each field's own value back must not change the record
        assert_eq!(sample.name, UNKNOWN);
        sample.set_field("name", FieldValue::Text("Jane Doe".to_string()));
        assert_eq!(sample.name, "Jane Doe");
    }

    #[test]
    fn test_failed_sample_is_flagged() {
        let sample = ExtractionSample::failed("https://example.com/x");
        assert!(sample.extraction_failed);
        assert!(is_unknown(&sample.name));
    }
}
