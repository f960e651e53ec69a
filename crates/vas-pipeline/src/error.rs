//! Error types for the pipeline
//!
//! - Input validation failures (rejected before any network call)
//! - Collaborator failures (one phase's analysis call)
//! - Illegal state requests (start while running, retry of a healthy phase)
//! - Run-level failures surfaced by [`crate::Pipeline`]

use crate::phase::{PhaseKey, PhaseStatus};

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input rejected before the run started
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Request not allowed in the current pipeline state
    #[error("invalid pipeline state: {0}")]
    InvalidState(#[from] InvalidStateError),

    /// Company analysis failed; every other phase depends on it
    #[error("company analysis failed: {0}")]
    CompanyFailed(#[source] CollaboratorError),

    /// A phase was attempted before its prerequisite completed
    #[error("{phase} requires {requires} to be completed first")]
    DependencyUnmet {
        /// Phase that was attempted
        phase: PhaseKey,
        /// Prerequisite phase
        requires: PhaseKey,
    },

    /// A single non-fatal phase failed
    #[error("{phase} analysis failed: {source}")]
    Phase {
        /// Failed phase
        phase: PhaseKey,
        /// Underlying collaborator failure
        #[source]
        source: CollaboratorError,
    },

    /// The run was cancelled or reset before it finished
    #[error("pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Check if the failed work can be attempted again without a new run
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Phase { phase, source } => phase.can_retry() && source.is_retryable(),
            _ => false,
        }
    }

    /// Check if the error ends the run with no usable results
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::CompanyFailed(_))
    }

    /// The phase this error is attributed to, if any
    #[must_use]
    pub fn phase(&self) -> Option<PhaseKey> {
        match self {
            Self::CompanyFailed(_) => Some(PhaseKey::Company),
            Self::DependencyUnmet { phase, .. } | Self::Phase { phase, .. } => Some(*phase),
            Self::InvalidState(state) => state.phase(),
            _ => None,
        }
    }
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Neither a URL nor a document was supplied
    #[error("a company url or document is required")]
    MissingInput,

    /// URL could not be parsed or is not http(s)
    #[error("malformed url {input:?}: {reason}")]
    MalformedUrl {
        /// Raw input as given
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Document reference without a file name
    #[error("document name is empty")]
    EmptyDocumentName,

    /// Unrecognized phase key
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    /// Checkpoint cannot seed a resumed run
    #[error("nothing to resume: {0}")]
    NothingToResume(String),
}

/// Failure of a single collaborator call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// Network or service failure
    #[error("analysis request failed: {0}")]
    Failed(String),

    /// No response within the phase timeout
    #[error("analysis timed out after {secs}s")]
    Timeout {
        /// Configured timeout
        secs: u64,
    },

    /// The call observed the cancellation token
    #[error("analysis cancelled")]
    Cancelled,

    /// Response could not be turned into a phase result
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl CollaboratorError {
    /// Create a generic request failure
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Create a malformed-response failure
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Check if another attempt could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// Requests that conflict with the current pipeline state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidStateError {
    /// A run is already in flight
    #[error("a pipeline run is already in progress")]
    AlreadyRunning,

    /// The instance was cancelled and must be reset first
    #[error("pipeline was cancelled; reset it before starting again")]
    CancelledRun,

    /// Retry requested for a phase that has not failed
    #[error("{phase} cannot be retried while {status}")]
    NotRetryable {
        /// Requested phase
        phase: PhaseKey,
        /// Its current status
        status: PhaseStatus,
    },

    /// Status change outside the phase state machine
    #[error("illegal phase transition {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: PhaseStatus,
        /// Requested status
        to: PhaseStatus,
    },

    /// The phase already has an operation in flight
    #[error("{phase} already has an operation in flight")]
    OperationInFlight {
        /// Busy phase
        phase: PhaseKey,
    },

    /// Result arrived for an operation that is no longer current
    #[error("stale result for {phase} discarded")]
    StaleOperation {
        /// Phase the result belonged to
        phase: PhaseKey,
    },
}

impl InvalidStateError {
    /// The phase this error is attributed to, if any
    #[must_use]
    pub fn phase(&self) -> Option<PhaseKey> {
        match self {
            Self::NotRetryable { phase, .. }
            | Self::OperationInFlight { phase }
            | Self::StaleOperation { phase } => Some(*phase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::CompanyFailed(CollaboratorError::failed("502"));
        assert!(err.to_string().contains("company analysis failed"));
    }

    #[test]
    fn company_failure_is_fatal_and_not_retryable() {
        let err = PipelineError::CompanyFailed(CollaboratorError::failed("boom"));
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
        assert_eq!(err.phase(), Some(PhaseKey::Company));
    }

    #[test]
    fn phase_failures_are_retryable_unless_cancelled() {
        let failed = PipelineError::Phase {
            phase: PhaseKey::Team,
            source: CollaboratorError::Timeout { secs: 600 },
        };
        assert!(failed.is_retryable());
        assert!(!failed.is_fatal());

        let cancelled = PipelineError::Phase {
            phase: PhaseKey::Team,
            source: CollaboratorError::Cancelled,
        };
        assert!(!cancelled.is_retryable());
    }

    #[test]
    fn invalid_state_reports_phase() {
        let err = InvalidStateError::NotRetryable {
            phase: PhaseKey::Market,
            status: PhaseStatus::Completed,
        };
        assert_eq!(err.phase(), Some(PhaseKey::Market));
        assert!(err.to_string().contains("market"));
        assert_eq!(InvalidStateError::AlreadyRunning.phase(), None);
    }
}
