//! Durable registry storage.
//!
//! The registry persists as one JSON document. Writes go through a
//! write-temp-then-rename sequence so concurrent readers never observe a
//! partial file. Reads fail softly: corrupt or unreadable storage degrades
//! to "no registry" and the pipeline starts from seed terms.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Result, ScoutError};
use crate::registry::seed::SeedTerm;
use crate::traits::oracle::Embedder;
use crate::types::registry::{Provenance, Registry, RegistryEntry, TermCategory};

/// Durable registry storage boundary.
///
/// `save` must provide atomic-replace semantics and refreshes
/// `last_updated` before writing.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read the stored registry; `None` if never initialized.
    async fn load(&self) -> Result<Option<Registry>>;

    /// Atomically persist the registry.
    async fn save(&self, registry: &mut Registry) -> Result<()>;
}

/// JSON-file registry store with atomic replace.
pub struct JsonRegistryStore {
    path: PathBuf,
}

impl JsonRegistryStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the registry persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistryStore for JsonRegistryStore {
    async fn load(&self) -> Result<Option<Registry>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "registry unreadable, treating as absent");
                return Ok(None);
            }
        };

        match serde_json::from_str::<Registry>(&raw) {
            Ok(registry) => Ok(Some(registry)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "registry corrupt, treating as absent");
                Ok(None)
            }
        }
    }

    async fn save(&self, registry: &mut Registry) -> Result<()> {
        registry.last_updated = Utc::now();

        let json = serde_json::to_string_pretty(registry)
            .map_err(|e| ScoutError::RegistryStorage(Box::new(e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(|e| ScoutError::RegistryStorage(Box::new(e)))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| ScoutError::RegistryStorage(Box::new(e)))?;

        Ok(())
    }
}

/// Build a fresh registry from seed terms and persist it.
///
/// A per-term embedding failure stores the entry without a fingerprint
/// (it degrades to exact/alias matching) rather than aborting. A save
/// failure is logged and the in-memory registry is still returned, so the
/// run can proceed without durable state.
pub async fn initialize<S: RegistryStore, E: Embedder>(
    store: &S,
    embedder: &E,
    seeds: &[SeedTerm],
) -> Registry {
    let mut registry = Registry::new(embedder.model_id());

    for seed in seeds {
        let fingerprint = match embedder.embed(seed.name).await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(term = seed.name, error = %e, "seed embedding failed, entry stored without fingerprint");
                None
            }
        };

        let mut entry = RegistryEntry::new(seed.name, seed.category, Provenance::Seed)
            .with_aliases(seed.aliases.iter().copied());
        entry.fingerprint = fingerprint;
        registry.entries.push(entry);
    }

    info!(terms = registry.entries.len(), "registry initialized from seed");

    if let Err(e) = store.save(&mut registry).await {
        warn!(error = %e, "failed to persist seed registry, continuing in memory");
    }

    registry
}

/// Load the stored registry or fall back to seed initialization.
pub async fn load_or_init<S: RegistryStore, E: Embedder>(
    store: &S,
    embedder: &E,
    seeds: &[SeedTerm],
) -> Registry {
    match store.load().await {
        Ok(Some(registry)) => registry,
        Ok(None) => initialize(store, embedder, seeds).await,
        Err(e) => {
            warn!(error = %e, "registry load failed, falling back to seed initialization");
            initialize(store, embedder, seeds).await
        }
    }
}

/// Append a user-approved term and persist.
///
/// Callers holding a cached derived view of the registry must invalidate
/// it immediately after this returns.
pub async fn add_approved<S: RegistryStore, E: Embedder>(
    store: &S,
    embedder: &E,
    registry: &mut Registry,
    name: &str,
    category: TermCategory,
) -> Result<()> {
    if registry.find(name, category).is_some() {
        return Err(ScoutError::DuplicateTerm {
            name: name.to_string(),
        });
    }

    let fingerprint = match embedder.embed(name).await {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(term = %name, error = %e, "embedding failed, approved term stored without fingerprint");
            None
        }
    };

    let mut entry = RegistryEntry::new(name, category, Provenance::User);
    entry.fingerprint = fingerprint;
    registry.entries.push(entry);

    store.save(registry).await?;
    info!(term = %name, category = category.label(), "approved term added to registry");

    Ok(())
}
