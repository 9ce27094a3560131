//! Error types for tint-engine
//!
//! Defines pipeline error types using thiserror. Most of these never leave
//! the engine: the orchestrator and the state authority resolve them to
//! fallbacks, metrics and log lines.

use std::time::Duration;
use thiserror::Error;

/// Main error type for tint-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Color extraction adapter failed (recovered with the default palette)
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Color extraction adapter did not answer in time
    #[error("Extraction timed out after {0:?}")]
    ExtractionTimeout(Duration),

    /// A strategy could not produce a result for its context
    #[error("Strategy '{strategy}' failed: {reason}")]
    Strategy {
        strategy: &'static str,
        reason: String,
    },

    /// Output sink rejected a batch
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] tint_common::Error),
}

impl Error {
    pub(crate) fn strategy(strategy: &'static str, reason: impl Into<String>) -> Self {
        Error::Strategy {
            strategy,
            reason: reason.into(),
        }
    }
}

/// Convenience Result type using tint-engine Error
pub type Result<T> = std::result::Result<T, Error>;
