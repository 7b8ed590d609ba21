//! Versioned vocabulary registry types.
//!
//! The registry is the durable, controlled vocabulary that free-text genre
//! terms are reconciled against. Entries carry an optional embedding
//! fingerprint; entries without one still participate in exact and alias
//! matching but are skipped during vector similarity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current registry schema version, bumped on incompatible layout changes.
pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

/// Where a registry entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Shipped with the crate as part of seed initialization
    Seed,

    /// Approved by a human reviewer at runtime
    User,
}

/// Partition a term belongs to.
///
/// Name uniqueness is enforced within a partition, so "History" can exist
/// as both a fiction setting and a nonfiction subject if a deployment wants
/// that split. Flat deployments put everything in `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermCategory {
    Fiction,
    Nonfiction,
    General,
}

impl TermCategory {
    /// Human-readable label, used in prompts and logs.
    pub fn label(&self) -> &'static str {
        match self {
            TermCategory::Fiction => "fiction",
            TermCategory::Nonfiction => "nonfiction",
            TermCategory::General => "general",
        }
    }
}

/// One canonical vocabulary term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Canonical term name, unique within its category
    pub name: String,

    /// Alternate spellings and abbreviations that match exactly
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Embedding fingerprint; absent entries skip vector matching
    #[serde(default)]
    pub fingerprint: Option<Vec<f32>>,

    /// When the entry was added
    pub added_at: DateTime<Utc>,

    /// Seed or user-approved
    pub provenance: Provenance,

    /// Partition the term lives in
    pub category: TermCategory,
}

impl RegistryEntry {
    /// Create a new entry with no aliases or fingerprint.
    pub fn new(name: impl Into<String>, category: TermCategory, provenance: Provenance) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            fingerprint: None,
            added_at: Utc::now(),
            provenance,
            category,
        }
    }

    /// Add aliases.
    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.aliases.extend(aliases.into_iter().map(|a| a.into()));
        self
    }

    /// Set the fingerprint.
    pub fn with_fingerprint(mut self, fingerprint: Vec<f32>) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }
}

/// Versioned container for the whole vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    /// Storage layout version
    pub schema_version: u32,

    /// Embedding model that produced the fingerprints; fingerprints from
    /// different models are not comparable
    pub embedding_model_id: String,

    /// Last persisted write
    pub last_updated: DateTime<Utc>,

    /// Ordered entries, append-only
    pub entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Create an empty registry for the given embedding model.
    pub fn new(embedding_model_id: impl Into<String>) -> Self {
        Self {
            schema_version: REGISTRY_SCHEMA_VERSION,
            embedding_model_id: embedding_model_id.into(),
            last_updated: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// All entries in one category.
    pub fn entries_in(&self, category: TermCategory) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    /// Look up an entry by canonical name within a category
    /// (case-insensitive).
    pub fn find(&self, name: &str, category: TermCategory) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.category == category && e.name.eq_ignore_ascii_case(name))
    }

    /// True if any entry in any category carries this canonical name
    /// (case-insensitive).
    pub fn contains_name(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Category of a canonical name, if present.
    pub fn category_of(&self, name: &str) -> Option<TermCategory> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.category)
    }

    /// All canonical names, across categories.
    pub fn term_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}
