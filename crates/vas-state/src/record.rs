//! Persisted checkpoint record
//!
//! One record describes the current session: the submitted input, every
//! phase result received so far, and the reviewer's rubric scores. Writers
//! always replace the whole record.

use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use vas_pipeline::{PhaseKey, PhaseOutput, PrimaryInput, ResumePoint};

/// Record layout version understood by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Valid rubric scores
pub const SCORE_RANGE: RangeInclusive<u8> = 1..=9;

/// Session status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Nothing started
    #[default]
    Idle,
    /// Run started, not all phases recorded
    InProgress,
    /// Every phase completed
    Complete,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordStatus::Idle => "idle",
            RecordStatus::InProgress => "in_progress",
            RecordStatus::Complete => "complete",
        })
    }
}

/// Rubric dimension the reviewer scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreDimension {
    /// Founding and leadership team
    Team,
    /// Funding history and runway
    Funding,
    /// Competitive position
    Competitive,
    /// Market opportunity
    Market,
    /// Intellectual property and risk
    IpRisk,
}

impl ScoreDimension {
    /// Every dimension in rubric order
    pub const ALL: [ScoreDimension; 5] = [
        ScoreDimension::Team,
        ScoreDimension::Funding,
        ScoreDimension::Competitive,
        ScoreDimension::Market,
        ScoreDimension::IpRisk,
    ];

    /// Phase whose analysis this dimension scores
    #[must_use]
    pub fn phase(self) -> PhaseKey {
        match self {
            ScoreDimension::Team => PhaseKey::Team,
            ScoreDimension::Funding => PhaseKey::Funding,
            ScoreDimension::Competitive => PhaseKey::Competitive,
            ScoreDimension::Market => PhaseKey::Market,
            ScoreDimension::IpRisk => PhaseKey::IpRisk,
        }
    }
}

impl fmt::Display for ScoreDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.phase().fmt(f)
    }
}

impl FromStr for ScoreDimension {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let phase: PhaseKey = s
            .parse()
            .map_err(|_| PersistenceError::InvalidKey(s.to_string()))?;
        ScoreDimension::ALL
            .into_iter()
            .find(|dimension| dimension.phase() == phase)
            .ok_or_else(|| PersistenceError::InvalidKey(s.to_string()))
    }
}

/// Reviewer's score for one dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScore {
    /// 1 (weak) to 9 (strong)
    pub score: u8,
    /// Free-text rationale
    #[serde(default)]
    pub justification: String,
    /// Whether the reviewer submitted (rather than drafted) it
    #[serde(default)]
    pub submitted: bool,
}

impl UserScore {
    /// Draft score
    pub fn new(score: u8, justification: impl Into<String>) -> Self {
        Self {
            score,
            justification: justification.into(),
            submitted: false,
        }
    }

    /// Mark submitted
    #[inline]
    #[must_use]
    pub fn submitted(mut self) -> Self {
        self.submitted = true;
        self
    }

    /// Check the score is within [`SCORE_RANGE`]
    pub fn validate(&self, dimension: ScoreDimension) -> Result<(), PersistenceError> {
        if SCORE_RANGE.contains(&self.score) {
            Ok(())
        } else {
            Err(PersistenceError::InvalidScore {
                dimension,
                score: self.score,
            })
        }
    }
}

/// The current-session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Format version; records from another version are discarded
    pub schema_version: u32,
    /// Lifecycle of the stored run
    pub status: RecordStatus,
    /// Input the run started from, advisor name included
    #[serde(default)]
    pub primary_input: Option<PrimaryInput>,
    /// Results of the phases that completed, keyed by phase
    #[serde(default)]
    pub completed_phase_results: BTreeMap<PhaseKey, PhaseOutput>,
    /// Reviewer scores entered so far
    #[serde(default)]
    pub user_scores: BTreeMap<ScoreDimension, UserScore>,
    /// Time of the last write
    pub last_updated_at: DateTime<Utc>,
}

impl CheckpointRecord {
    /// Empty idle record
    #[must_use]
    pub fn new(schema_version: u32) -> Self {
        Self {
            schema_version,
            status: RecordStatus::Idle,
            primary_input: None,
            completed_phase_results: BTreeMap::new(),
            user_scores: BTreeMap::new(),
            last_updated_at: Utc::now(),
        }
    }

    /// Fresh in-progress record for a new run
    #[must_use]
    pub fn started(schema_version: u32, input: PrimaryInput) -> Self {
        Self {
            status: RecordStatus::InProgress,
            primary_input: Some(input),
            ..Self::new(schema_version)
        }
    }

    /// Number of phases with a stored result
    #[inline]
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_phase_results.len()
    }

    /// In progress with at least one and fewer than all phases recorded
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.status == RecordStatus::InProgress
            && (1..PhaseKey::ALL.len()).contains(&self.completed_count())
    }

    /// What a pipeline needs to pick this run up again
    ///
    /// `None` unless the record is resumable and carries its input.
    #[must_use]
    pub fn resume_point(&self) -> Option<ResumePoint> {
        if !self.is_resumable() {
            return None;
        }
        let input = self.primary_input.clone()?;
        Some(ResumePoint::new(input, self.completed_phase_results.clone()))
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }
}
