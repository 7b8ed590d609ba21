//! Vocabulary registry: seed terms, durable storage, cached view.

pub mod cache;
pub mod seed;
pub mod store;

pub use cache::RegistryCache;
pub use seed::{seed_terms, SeedTerm};
pub use store::{add_approved, initialize, load_or_init, JsonRegistryStore, RegistryStore};
