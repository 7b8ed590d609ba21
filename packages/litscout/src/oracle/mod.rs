//! Oracle-facing helpers: response repair and provider adapters.

pub mod repair;

#[cfg(feature = "ollama")]
pub mod ollama;
