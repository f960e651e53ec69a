//! Phases of an assessment
//!
//! The descriptor set is static and only feeds progress display. Phase
//! records follow a small state machine:
//!
//! ```text
//! Pending -> Active -> Completed
//!                   -> Error -> Pending (retry)
//! ```

use crate::error::{CollaboratorError, InvalidStateError, ValidationError};
use crate::types::{OperationId, PhaseOutput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::Instant;

/// Identifier of one analysis phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKey {
    /// Company profile; source of the derived description
    Company,
    /// Founding team
    Team,
    /// Funding history
    Funding,
    /// Competitive landscape
    Competitive,
    /// Market opportunity; needs the competitive result
    Market,
    /// IP and risk
    IpRisk,
}

impl PhaseKey {
    /// All phases in canonical order
    pub const ALL: [PhaseKey; 6] = [
        PhaseKey::Company,
        PhaseKey::Team,
        PhaseKey::Funding,
        PhaseKey::Competitive,
        PhaseKey::Market,
        PhaseKey::IpRisk,
    ];

    /// Phases launched together once company completes
    pub const CONCURRENT: [PhaseKey; 4] = [
        PhaseKey::Team,
        PhaseKey::Funding,
        PhaseKey::Competitive,
        PhaseKey::IpRisk,
    ];

    /// Stable string key
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKey::Company => "company",
            PhaseKey::Team => "team",
            PhaseKey::Funding => "funding",
            PhaseKey::Competitive => "competitive",
            PhaseKey::Market => "market",
            PhaseKey::IpRisk => "iprisk",
        }
    }

    /// Position in [`PhaseKey::ALL`]
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            PhaseKey::Company => 0,
            PhaseKey::Team => 1,
            PhaseKey::Funding => 2,
            PhaseKey::Competitive => 3,
            PhaseKey::Market => 4,
            PhaseKey::IpRisk => 5,
        }
    }

    /// Static descriptor for this phase
    #[inline]
    #[must_use]
    pub fn descriptor(self) -> &'static PhaseDescriptor {
        &DESCRIPTORS[self.index()]
    }

    /// Phase whose result this phase consumes
    #[must_use]
    pub fn prerequisite(self) -> Option<PhaseKey> {
        match self {
            PhaseKey::Company => None,
            PhaseKey::Market => Some(PhaseKey::Competitive),
            _ => Some(PhaseKey::Company),
        }
    }

    /// Whether a failed phase may be retried in place
    ///
    /// Company failure ends the run, so it never is.
    #[inline]
    #[must_use]
    pub fn can_retry(self) -> bool {
        self != PhaseKey::Company
    }
}

impl fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        PhaseKey::ALL
            .into_iter()
            .find(|key| key.as_str() == normalized || (normalized == "ip_risk" && *key == PhaseKey::IpRisk))
            .ok_or_else(|| ValidationError::UnknownPhase(s.to_string()))
    }
}

/// Static phase declaration used for progress display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDescriptor {
    /// Phase key
    pub key: PhaseKey,
    /// Human-readable name
    pub display_name: &'static str,
    /// Typical wall-clock cost
    pub estimated_duration: Duration,
}

const DESCRIPTORS: [PhaseDescriptor; 6] = [
    PhaseDescriptor {
        key: PhaseKey::Company,
        display_name: "Company Overview",
        estimated_duration: Duration::from_secs(60),
    },
    PhaseDescriptor {
        key: PhaseKey::Team,
        display_name: "Team Analysis",
        estimated_duration: Duration::from_secs(90),
    },
    PhaseDescriptor {
        key: PhaseKey::Funding,
        display_name: "Funding Analysis",
        estimated_duration: Duration::from_secs(90),
    },
    PhaseDescriptor {
        key: PhaseKey::Competitive,
        display_name: "Competitive Landscape",
        estimated_duration: Duration::from_secs(120),
    },
    PhaseDescriptor {
        key: PhaseKey::Market,
        display_name: "Market Opportunity",
        estimated_duration: Duration::from_secs(90),
    },
    PhaseDescriptor {
        key: PhaseKey::IpRisk,
        display_name: "IP & Risk Assessment",
        estimated_duration: Duration::from_secs(90),
    },
];

/// Lifecycle status of a phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    /// Not started
    Pending,
    /// Operation in flight
    Active,
    /// Finished with a result
    Completed,
    /// Failed, skipped or cancelled
    Error,
}

impl PhaseStatus {
    /// Completed or failed
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseStatus::Completed | PhaseStatus::Error)
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Active => "active",
            PhaseStatus::Completed => "completed",
            PhaseStatus::Error => "error",
        })
    }
}

/// Statuses reachable from `from`
#[must_use]
pub fn allowed_transitions(from: PhaseStatus) -> &'static [PhaseStatus] {
    use PhaseStatus::*;
    match from {
        Pending => &[Active],
        Active => &[Completed, Error],
        Completed => &[],
        Error => &[Pending],
    }
}

/// Validates a status transition
pub fn validate_transition(from: PhaseStatus, to: PhaseStatus) -> Result<(), InvalidStateError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(InvalidStateError::IllegalTransition { from, to })
    }
}

/// Why a phase ended in [`PhaseStatus::Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PhaseFailure {
    /// Collaborator call failed
    #[error("{0}")]
    Failed(String),
    /// Collaborator call timed out
    #[error("timed out after {0}s")]
    TimedOut(u64),
    /// Run was cancelled while the phase was active
    #[error("analysis cancelled")]
    Cancelled,
    /// Response was unusable
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Never invoked because a prerequisite failed
    #[error("skipped, prerequisite {0} failed")]
    Skipped(PhaseKey),
}

impl From<&CollaboratorError> for PhaseFailure {
    fn from(error: &CollaboratorError) -> Self {
        match error {
            CollaboratorError::Failed(message) => PhaseFailure::Failed(message.clone()),
            CollaboratorError::Timeout { secs } => PhaseFailure::TimedOut(*secs),
            CollaboratorError::Cancelled => PhaseFailure::Cancelled,
            CollaboratorError::MalformedResponse(message) => {
                PhaseFailure::MalformedResponse(message.clone())
            }
        }
    }
}

/// One unit of orchestrated work
#[derive(Debug, Clone)]
pub struct Phase {
    /// Phase key
    pub key: PhaseKey,
    /// Human-readable name
    pub display_name: &'static str,
    /// Estimate used for progress
    pub estimated_duration: Duration,
    /// Current status
    pub status: PhaseStatus,
    /// Wall-clock start
    pub started_at: Option<DateTime<Utc>>,
    /// Wall-clock end
    pub ended_at: Option<DateTime<Utc>>,
    /// Set iff status is completed
    pub result: Option<PhaseOutput>,
    /// Set iff status is error
    pub error: Option<PhaseFailure>,
    /// Operation currently in flight
    pub pending_operation: Option<OperationId>,
    pub(crate) started: Option<Instant>,
    pub(crate) ended: Option<Instant>,
}

impl Phase {
    /// Fresh pending phase
    #[must_use]
    pub fn new(key: PhaseKey, estimated_duration: Duration) -> Self {
        Self {
            key,
            display_name: key.descriptor().display_name,
            estimated_duration,
            status: PhaseStatus::Pending,
            started_at: None,
            ended_at: None,
            result: None,
            error: None,
            pending_operation: None,
            started: None,
            ended: None,
        }
    }

    /// Time between start and end, once terminal
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        match (self.started, self.ended) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }

    /// Pending -> Active under a new operation
    pub(crate) fn begin(&mut self, operation: OperationId) -> Result<(), InvalidStateError> {
        if self.pending_operation.is_some() {
            return Err(InvalidStateError::OperationInFlight { phase: self.key });
        }
        validate_transition(self.status, PhaseStatus::Active)?;
        self.status = PhaseStatus::Active;
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
        self.ended_at = None;
        self.ended = None;
        self.pending_operation = Some(operation);
        Ok(())
    }

    /// Active -> Completed; returns the phase duration
    pub(crate) fn complete(
        &mut self,
        operation: OperationId,
        output: PhaseOutput,
    ) -> Result<Duration, InvalidStateError> {
        self.check_operation(operation)?;
        validate_transition(self.status, PhaseStatus::Completed)?;
        self.status = PhaseStatus::Completed;
        self.result = Some(output);
        self.error = None;
        Ok(self.end())
    }

    /// Active -> Error
    pub(crate) fn fail(
        &mut self,
        operation: OperationId,
        failure: PhaseFailure,
    ) -> Result<Duration, InvalidStateError> {
        self.check_operation(operation)?;
        validate_transition(self.status, PhaseStatus::Error)?;
        self.status = PhaseStatus::Error;
        self.result = None;
        self.error = Some(failure);
        Ok(self.end())
    }

    /// Pending -> Error without invoking the collaborator
    pub(crate) fn skip(&mut self, failure: PhaseFailure) -> Result<(), InvalidStateError> {
        let operation = OperationId::new();
        self.begin(operation)?;
        self.fail(operation, failure)?;
        Ok(())
    }

    /// Pending -> Completed from a stored checkpoint
    pub(crate) fn restore(&mut self, output: PhaseOutput) -> Result<(), InvalidStateError> {
        let operation = OperationId::new();
        self.begin(operation)?;
        self.complete(operation, output)?;
        Ok(())
    }

    /// Error -> Pending ahead of a retry
    pub(crate) fn reset_for_retry(&mut self) -> Result<(), InvalidStateError> {
        validate_transition(self.status, PhaseStatus::Pending)?;
        *self = Phase::new(self.key, self.estimated_duration);
        Ok(())
    }

    fn check_operation(&self, operation: OperationId) -> Result<(), InvalidStateError> {
        if self.pending_operation == Some(operation) {
            Ok(())
        } else {
            Err(InvalidStateError::StaleOperation { phase: self.key })
        }
    }

    fn end(&mut self) -> Duration {
        let now = Instant::now();
        self.ended_at = Some(Utc::now());
        self.ended = Some(now);
        self.pending_operation = None;
        self.started
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn output() -> PhaseOutput {
        PhaseOutput::new(json!({"score": 7}))
    }

    #[test]
    fn phase_key_round_trips_through_str() {
        for key in PhaseKey::ALL {
            assert_eq!(key.as_str().parse::<PhaseKey>().unwrap(), key);
            assert_eq!(PhaseKey::ALL[key.index()], key);
        }
        assert_eq!("IP_RISK".parse::<PhaseKey>().unwrap(), PhaseKey::IpRisk);
        assert!("pricing".parse::<PhaseKey>().is_err());
    }

    #[test]
    fn phase_key_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PhaseKey::IpRisk).unwrap(), "\"iprisk\"");
    }

    #[test]
    fn market_depends_on_competitive() {
        assert_eq!(PhaseKey::Market.prerequisite(), Some(PhaseKey::Competitive));
        assert_eq!(PhaseKey::Company.prerequisite(), None);
        assert_eq!(PhaseKey::Team.prerequisite(), Some(PhaseKey::Company));
    }

    #[test]
    fn descriptors_match_keys() {
        for key in PhaseKey::ALL {
            assert_eq!(key.descriptor().key, key);
            assert!(key.descriptor().estimated_duration > Duration::ZERO);
        }
    }

    #[tokio::test]
    async fn phase_lifecycle_success() {
        let mut phase = Phase::new(PhaseKey::Team, Duration::from_secs(90));
        let op = OperationId::new();

        phase.begin(op).unwrap();
        assert_eq!(phase.status, PhaseStatus::Active);
        assert_eq!(phase.pending_operation, Some(op));

        phase.complete(op, output()).unwrap();
        assert_eq!(phase.status, PhaseStatus::Completed);
        assert!(phase.result.is_some());
        assert!(phase.pending_operation.is_none());
        assert!(phase.duration().is_some());
    }

    #[tokio::test]
    async fn second_begin_is_refused_while_in_flight() {
        let mut phase = Phase::new(PhaseKey::Team, Duration::from_secs(90));
        phase.begin(OperationId::new()).unwrap();

        let err = phase.begin(OperationId::new()).unwrap_err();
        assert_eq!(err, InvalidStateError::OperationInFlight { phase: PhaseKey::Team });
    }

    #[tokio::test]
    async fn stale_operation_is_rejected() {
        let mut phase = Phase::new(PhaseKey::Funding, Duration::from_secs(90));
        phase.begin(OperationId::new()).unwrap();

        let err = phase.complete(OperationId::new(), output()).unwrap_err();
        assert!(matches!(err, InvalidStateError::StaleOperation { .. }));
        assert_eq!(phase.status, PhaseStatus::Active);
    }

    #[tokio::test]
    async fn retry_requires_error_status() {
        let mut phase = Phase::new(PhaseKey::Market, Duration::from_secs(90));
        assert!(phase.reset_for_retry().is_err());

        phase.skip(PhaseFailure::Skipped(PhaseKey::Competitive)).unwrap();
        assert_eq!(phase.status, PhaseStatus::Error);
        assert!(phase.result.is_none());

        phase.reset_for_retry().unwrap();
        assert_eq!(phase.status, PhaseStatus::Pending);
        assert!(phase.error.is_none());
    }

    #[test]
    fn failure_from_collaborator_error() {
        assert_eq!(
            PhaseFailure::from(&CollaboratorError::Timeout { secs: 600 }),
            PhaseFailure::TimedOut(600)
        );
        assert_eq!(
            PhaseFailure::Skipped(PhaseKey::Competitive).to_string(),
            "skipped, prerequisite competitive failed"
        );
    }

    fn any_status() -> impl Strategy<Value = PhaseStatus> {
        prop_oneof![
            Just(PhaseStatus::Pending),
            Just(PhaseStatus::Active),
            Just(PhaseStatus::Completed),
            Just(PhaseStatus::Error),
        ]
    }

    proptest! {
        #[test]
        fn prop_transitions_match_table(from in any_status(), to in any_status()) {
            let allowed = allowed_transitions(from).contains(&to);
            prop_assert_eq!(validate_transition(from, to).is_ok(), allowed);
        }

        #[test]
        fn prop_completed_is_final(to in any_status()) {
            prop_assert!(validate_transition(PhaseStatus::Completed, to).is_err());
        }
    }
}
