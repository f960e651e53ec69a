//! Analysis collaborators
//!
//! Each phase is backed by an external analysis service behind one uniform
//! async contract. The pipeline receives the six implementations up front
//! through [`CollaboratorSet`]; nothing is looked up globally.

use crate::error::CollaboratorError;
use crate::phase::PhaseKey;
use crate::types::{PhaseOutput, PrimaryInput};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Input handed to a collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseInput {
    /// URL and/or document (company, team)
    Primary(PrimaryInput),
    /// Derived description (funding, competitive, iprisk)
    Description(String),
    /// Derived description plus the competitive result (market)
    DescriptionWithCompetitive {
        /// Derived description
        description: String,
        /// Completed competitive result
        competitive: PhaseOutput,
    },
}

impl PhaseInput {
    /// Derived description, if this input carries one
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            PhaseInput::Primary(_) => None,
            PhaseInput::Description(description)
            | PhaseInput::DescriptionWithCompetitive { description, .. } => Some(description),
        }
    }
}

/// One external analysis operation
///
/// Implementations should watch `cancel` and return
/// [`CollaboratorError::Cancelled`] promptly once it fires. The pipeline does
/// not abort calls that ignore it; it only bounds them with the phase timeout.
#[async_trait]
pub trait AnalysisCollaborator: Send + Sync {
    /// Run the analysis and return its raw response
    async fn analyze(
        &self,
        input: PhaseInput,
        cancel: CancellationToken,
    ) -> Result<Value, CollaboratorError>;
}

/// The six collaborators, one per phase
#[derive(Clone)]
pub struct CollaboratorSet {
    entries: [Arc<dyn AnalysisCollaborator>; 6],
}

impl CollaboratorSet {
    /// Create from one collaborator per phase
    #[must_use]
    pub fn new(
        company: Arc<dyn AnalysisCollaborator>,
        team: Arc<dyn AnalysisCollaborator>,
        funding: Arc<dyn AnalysisCollaborator>,
        competitive: Arc<dyn AnalysisCollaborator>,
        market: Arc<dyn AnalysisCollaborator>,
        iprisk: Arc<dyn AnalysisCollaborator>,
    ) -> Self {
        Self {
            entries: [company, team, funding, competitive, market, iprisk],
        }
    }

    /// Create by asking `f` for each phase in canonical order
    pub fn from_fn(mut f: impl FnMut(PhaseKey) -> Arc<dyn AnalysisCollaborator>) -> Self {
        Self {
            entries: PhaseKey::ALL.map(&mut f),
        }
    }

    /// Collaborator for a phase
    #[inline]
    #[must_use]
    pub fn get(&self, key: PhaseKey) -> &Arc<dyn AnalysisCollaborator> {
        &self.entries[key.index()]
    }
}

impl fmt::Debug for CollaboratorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollaboratorSet")
            .field("phases", &PhaseKey::ALL)
            .finish_non_exhaustive()
    }
}
