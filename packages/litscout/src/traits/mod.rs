//! Trait abstractions for the pipeline's external collaborators.

pub mod fetcher;
pub mod oracle;
pub mod sink;
