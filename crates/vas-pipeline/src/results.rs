//! Aggregated results of a pipeline run

use crate::phase::{PhaseFailure, PhaseKey};
use crate::types::{PhaseOutput, PrimaryInput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// All six phases completed
    Complete,
    /// Company completed, at least one other phase failed
    Partial,
}

/// Results of a terminal run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResults {
    /// Complete or partial
    pub outcome: RunOutcome,
    /// Input the run was started with
    pub input: PrimaryInput,
    /// Description derived from the company profile
    pub description: String,
    /// Completed phases
    pub phases: BTreeMap<PhaseKey, PhaseOutput>,
    /// Failed phases
    pub failures: BTreeMap<PhaseKey, PhaseFailure>,
    /// Wall-clock run time
    pub elapsed: Duration,
}

impl PipelineResults {
    /// Build from per-phase outcomes; the outcome follows from `failures`
    #[must_use]
    pub fn new(
        input: PrimaryInput,
        description: String,
        phases: BTreeMap<PhaseKey, PhaseOutput>,
        failures: BTreeMap<PhaseKey, PhaseFailure>,
        elapsed: Duration,
    ) -> Self {
        let outcome = if failures.is_empty() && phases.len() == PhaseKey::ALL.len() {
            RunOutcome::Complete
        } else {
            RunOutcome::Partial
        };
        Self {
            outcome,
            input,
            description,
            phases,
            failures,
            elapsed,
        }
    }

    /// All six phases completed
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Complete
    }

    /// Number of completed phases
    #[inline]
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.phases.len()
    }

    /// Failed phases in canonical order
    #[must_use]
    pub fn failed_phases(&self) -> Vec<PhaseKey> {
        self.failures.keys().copied().collect()
    }

    /// Result of one phase
    #[inline]
    #[must_use]
    pub fn get(&self, key: PhaseKey) -> Option<&PhaseOutput> {
        self.phases.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_follows_failures() {
        let phases: BTreeMap<_, _> = PhaseKey::ALL
            .into_iter()
            .map(|key| (key, PhaseOutput::new(json!({"phase": key.as_str()}))))
            .collect();
        let complete = PipelineResults::new(
            PrimaryInput::new(),
            "Acme".into(),
            phases.clone(),
            BTreeMap::new(),
            Duration::ZERO,
        );
        assert!(complete.is_complete());
        assert_eq!(complete.completed_count(), 6);

        let mut partial_phases = phases;
        partial_phases.remove(&PhaseKey::Market);
        partial_phases.remove(&PhaseKey::Competitive);
        let failures = BTreeMap::from([
            (PhaseKey::Market, PhaseFailure::Skipped(PhaseKey::Competitive)),
            (PhaseKey::Competitive, PhaseFailure::Failed("boom".into())),
        ]);
        let partial = PipelineResults::new(
            PrimaryInput::new(),
            "Acme".into(),
            partial_phases,
            failures,
            Duration::ZERO,
        );
        assert_eq!(partial.outcome, RunOutcome::Partial);
        assert_eq!(
            partial.failed_phases(),
            vec![PhaseKey::Competitive, PhaseKey::Market]
        );
    }
}
