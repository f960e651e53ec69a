//! Checkpoint hook
//!
//! The pipeline reports progress to a [`CheckpointSink`] after every phase so
//! an interrupted run can be resumed later. Sinks own their failure handling:
//! a checkpoint that cannot be written must never fail the analysis.

use crate::phase::PhaseKey;
use crate::results::PipelineResults;
use crate::types::{PhaseOutput, PrimaryInput};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Receiver of run progress for persistence
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    /// A new run started with `input`
    async fn begin_run(&self, input: &PrimaryInput);

    /// `key` completed with `output`
    async fn phase_completed(&self, key: PhaseKey, output: &PhaseOutput);

    /// Every phase completed
    async fn run_completed(&self, results: &PipelineResults);

    /// The pipeline was reset; stored progress is obsolete
    async fn run_reset(&self);
}

/// Stored progress that a new pipeline instance can pick up
#[derive(Debug, Clone, PartialEq)]
pub struct ResumePoint {
    /// Input of the interrupted run
    pub input: PrimaryInput,
    /// Phases that had completed
    pub completed: BTreeMap<PhaseKey, PhaseOutput>,
}

impl ResumePoint {
    /// Create a resume point
    #[inline]
    #[must_use]
    pub fn new(input: PrimaryInput, completed: BTreeMap<PhaseKey, PhaseOutput>) -> Self {
        Self { input, completed }
    }

    /// Phases still to run, in canonical order
    #[must_use]
    pub fn remaining(&self) -> Vec<PhaseKey> {
        PhaseKey::ALL
            .into_iter()
            .filter(|key| !self.completed.contains_key(key))
            .collect()
    }
}
