//! Archive of finished assessments
//!
//! Independent of the current-session record: entries are only added or
//! removed, never rewritten, and one unreadable entry never hides the rest.

use crate::error::PersistenceError;
use crate::record::{ScoreDimension, UserScore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;
use vas_pipeline::{PhaseKey, PhaseOutput, PipelineResults, PrimaryInput};

/// Archive entry key (ULID, so keys sort by creation time)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArchiveKey(pub Ulid);

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArchiveKey {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim())
            .map(Self)
            .map_err(|_| PersistenceError::InvalidKey(s.to_string()))
    }
}

/// A finished assessment kept for later browsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedAssessment {
    /// Input the run started from
    pub input: PrimaryInput,
    /// Description derived from the company profile
    pub description: String,
    /// Result of every phase
    pub phases: BTreeMap<PhaseKey, PhaseOutput>,
    /// Reviewer scores at archive time
    #[serde(default)]
    pub user_scores: BTreeMap<ScoreDimension, UserScore>,
    /// When the assessment was archived
    pub completed_at: DateTime<Utc>,
}

impl ArchivedAssessment {
    /// Snapshot of a completed run plus the scores entered so far
    #[must_use]
    pub fn from_results(
        results: &PipelineResults,
        user_scores: BTreeMap<ScoreDimension, UserScore>,
    ) -> Self {
        Self {
            input: results.input.clone(),
            description: results.description.clone(),
            phases: results.phases.clone(),
            user_scores,
            completed_at: Utc::now(),
        }
    }

    /// Mean of the entered scores
    #[must_use]
    pub fn average_score(&self) -> Option<f64> {
        if self.user_scores.is_empty() {
            return None;
        }
        let total: u32 = self.user_scores.values().map(|s| u32::from(s.score)).sum();
        Some(f64::from(total) / self.user_scores.len() as f64)
    }

    /// Listing row for this entry stored under `key`
    #[must_use]
    pub fn summary(&self, key: ArchiveKey) -> AssessmentSummary {
        AssessmentSummary {
            key,
            identifier: self.input.identifier(),
            advisor_name: self.input.advisor_name.clone(),
            completed_at: self.completed_at,
            phase_count: self.phases.len(),
            average_score: self.average_score(),
        }
    }
}

/// Listing row for an archived assessment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentSummary {
    /// Archive key, for `load_assessment`
    pub key: ArchiveKey,
    /// Company host or document name
    pub identifier: String,
    /// Reviewer, when one was named
    pub advisor_name: Option<String>,
    /// When the assessment was archived
    pub completed_at: DateTime<Utc>,
    /// Phases with a stored result
    pub phase_count: usize,
    /// Mean reviewer score, if any were entered
    pub average_score: Option<f64>,
}
