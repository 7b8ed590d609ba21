//! Data types for the extraction pipeline.

pub mod config;
pub mod page;
pub mod record;
pub mod registry;
