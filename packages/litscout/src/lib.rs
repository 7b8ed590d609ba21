//! Literary-Agent Discovery and Extraction Pipeline
//!
//! Crawls agency websites and turns agent profile pages into structured,
//! validated contact records using a local text-generation oracle.
//!
//! # Design Philosophy
//!
//! **"Trust the oracle's reading, never its formatting"**
//!
//! - Oracle output is repaired and voted on, never taken at face value
//! - Free-text genre vocabulary reconciles against a curated registry
//! - Every external boundary is a trait with a mock behind it
//! - Per-unit failures degrade softly; only total failure is an error
//!
//! # Usage
//!
//! ```rust,ignore
//! use litscout::{CrawlMode, HttpFetcher, JsonRegistryStore, Scout};
//! use litscout::oracle::ollama::OllamaOracle;
//! use ollama_client::OllamaClient;
//!
//! let oracle = OllamaOracle::new(OllamaClient::from_env(), "llama3.1", "nomic-embed-text");
//! let scout = Scout::new(
//!     HttpFetcher::new(),
//!     oracle.clone(),
//!     oracle,
//!     JsonRegistryStore::new("registry.json"),
//! );
//!
//! // Extract one known profile page
//! let outcome = scout.extract("https://acme-literary.com/agents/jane").await?;
//!
//! // Or crawl a whole site
//! let outcome = scout
//!     .crawl("https://acme-literary.com", CrawlMode::Dynamic, false)
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Boundary abstractions (Fetcher, Oracle, Embedder, RecordSink)
//! - [`types`] - Records, pages, registry, and configuration
//! - [`pipeline`] - The crawl/extract/consensus/validate pipeline
//! - [`registry`] - Genre vocabulary: seeds, storage, cached view
//! - [`matcher`] - Similarity matching and free-text classification
//! - [`oracle`] - Response repair and provider adapters
//! - [`fetch`] - HTTP fetcher with HTML-to-text conversion
//! - [`testing`] - Mock implementations of every boundary

pub mod error;
pub mod fetch;
pub mod matcher;
pub mod oracle;
pub mod pipeline;
pub mod registry;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{FetchError, FetchResult, Result, ScoutError};
pub use fetch::HttpFetcher;
pub use pipeline::{CrawlOutcome, CrawlReport, Scout};
pub use registry::{JsonRegistryStore, RegistryCache, RegistryStore};
pub use traits::fetcher::Fetcher;
pub use traits::oracle::{Embedder, Oracle, OracleRequest};
pub use traits::sink::RecordSink;
pub use types::config::{
    ConsensusOptions, CrawlMode, CrawlOptions, ExtractOptions, MatchConfig, ValidateOptions,
};
pub use types::page::CandidatePage;
pub use types::record::{
    AgencyKnowledge, ConsensusRecord, ExtractionSample, ValidatedRecord,
};
pub use types::registry::{Provenance, Registry, RegistryEntry, TermCategory};
