//! Error types for state persistence

use crate::record::ScoreDimension;

/// Errors raised by the state store and its backends
///
/// On the pipeline path these are logged and swallowed; a failed checkpoint
/// never fails an analysis.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Backend read or write failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// User score outside the rubric range
    #[error("score {score} for {dimension} is outside 1..=9")]
    InvalidScore {
        /// Rubric dimension
        dimension: ScoreDimension,
        /// Rejected score
        score: u8,
    },

    /// Archive key did not parse
    #[error("invalid archive key: {0}")]
    InvalidKey(String),

    /// Blocking storage task did not finish
    #[error("storage task failed: {0}")]
    Task(String),
}

impl PersistenceError {
    /// Stored bytes exist but cannot be read back
    #[inline]
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }
}
