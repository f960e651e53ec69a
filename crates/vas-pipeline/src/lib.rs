//! VAS Pipeline - Venture Assessment orchestration
//!
//! Runs the six analysis phases of an assessment:
//! - `company` first; its failure is fatal to the run
//! - `team`, `funding`, `competitive` and `iprisk` concurrently once the
//!   company profile is known
//! - `market` after `competitive` settles
//!
//! Individual failures after `company` are isolated and aggregated into a
//! partial result that can be completed later with [`Pipeline::retry_phase`].
//!
//! # Example
//!
//! ```rust,ignore
//! use vas_pipeline::{CollaboratorSet, Pipeline, PipelineConfig, PrimaryInput};
//!
//! # async fn example(collaborators: CollaboratorSet) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::builder(collaborators)
//!     .config(PipelineConfig::new())
//!     .build();
//!
//! let input = PrimaryInput::from_url("https://example.com")?;
//! let results = pipeline.start(input).await?;
//!
//! println!("{} of 6 phases completed", results.completed_count());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod checkpoint;
pub mod collaborator;
pub mod describe;
pub mod error;
pub mod events;
pub mod phase;
pub mod pipeline;
pub mod progress;
pub mod results;
pub mod types;

// Re-exports for convenience
pub use checkpoint::{CheckpointSink, ResumePoint};
pub use collaborator::{AnalysisCollaborator, CollaboratorSet, PhaseInput};
pub use describe::derive_description;
pub use error::{CollaboratorError, InvalidStateError, PipelineError, ValidationError};
pub use events::{EventBus, PipelineEvent};
pub use phase::{Phase, PhaseDescriptor, PhaseFailure, PhaseKey, PhaseStatus};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use progress::ProgressSnapshot;
pub use results::{PipelineResults, RunOutcome};
pub use types::{DocumentRef, OperationId, PhaseOutput, PipelineConfig, PrimaryInput};

pub use tokio_util::sync::CancellationToken;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the pipeline
    pub use crate::{
        AnalysisCollaborator, CancellationToken, CollaboratorError, CollaboratorSet, PhaseInput,
        PhaseKey, PhaseOutput, Pipeline, PipelineConfig, PipelineEvent, PipelineResults,
        PrimaryInput, RunOutcome,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
