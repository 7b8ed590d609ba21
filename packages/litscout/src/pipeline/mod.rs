//! The extraction pipeline, stage by stage.

pub mod consensus;
pub mod crawl;
pub mod discover;
pub mod extract;
pub mod prompts;
pub mod scout;
pub mod validate;

pub use crawl::{dedup_records, run_crawl, CrawlOutcome, CrawlReport, CrawlStage};
pub use scout::Scout;
