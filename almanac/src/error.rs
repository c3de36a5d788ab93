//! Error types for Almanac operations

use std::path::PathBuf;
use thiserror::Error;

/// Almanac error types
#[derive(Debug, Error)]
pub enum AlmanacError {
    /// A single individual could not be read; the pass skips it
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Cache file unreadable or unparsable
    #[error("Cache load failed ({path}): {reason}")]
    CacheLoad { path: PathBuf, reason: String },

    /// Reconciled cache could not be written
    #[error("Cache persist failed ({path}): {source}")]
    CachePersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The aggregator went away before reaching quiescence
    #[error("Aggregator unavailable: {0}")]
    AggregatorUnavailable(String),

    /// Operation not allowed in the current engine state
    #[error("Invalid state: expected {expected}, engine is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Marshaling bridge error
    #[error("Bridge error: {0}")]
    Bridge(#[from] gtype_bridge::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Almanac operations
pub type Result<T> = std::result::Result<T, AlmanacError>;

impl AlmanacError {
    /// Whether the error ends a reconciliation pass
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CachePersist { .. } | Self::AggregatorUnavailable(_) | Self::InvalidState { .. }
        )
    }

    /// Whether the error only affects one individual
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Extraction(_) | Self::Bridge(_))
    }
}
