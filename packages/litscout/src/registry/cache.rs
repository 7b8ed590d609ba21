//! Process-scoped cached view of the registry.
//!
//! Classification runs many times per crawl; the cache avoids re-loading
//! durable storage on every call. It is an explicit object owned by the
//! orchestrating component, never a hidden module-level singleton, and
//! every registry write must call [`RegistryCache::invalidate`]
//! synchronously afterward.

use std::sync::{Arc, RwLock};

use crate::types::registry::Registry;

/// Cached shared view of the current registry.
#[derive(Default)]
pub struct RegistryCache {
    inner: RwLock<Option<Arc<Registry>>>,
}

impl RegistryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cached registry, if populated.
    pub fn get(&self) -> Option<Arc<Registry>> {
        self.inner.read().unwrap().clone()
    }

    /// Populate the cache and return the shared handle.
    pub fn put(&self, registry: Registry) -> Arc<Registry> {
        let shared = Arc::new(registry);
        *self.inner.write().unwrap() = Some(shared.clone());
        shared
    }

    /// Drop the cached view. Must be called after every registry write.
    pub fn invalidate(&self) {
        *self.inner.write().unwrap() = None;
    }
}
