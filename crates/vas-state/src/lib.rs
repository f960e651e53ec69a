//! VAS State - checkpoint and recovery persistence
//!
//! Keeps two independent stores:
//! - the current-session record, rewritten whole after every phase so an
//!   interrupted run can be resumed or discarded on next start
//! - an archive of finished assessments for later browsing
//!
//! [`StateStore`] implements [`vas_pipeline::CheckpointSink`], so it plugs
//! straight into a pipeline:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vas_pipeline::Pipeline;
//! use vas_state::{StateStore, StateStoreConfig};
//!
//! let store = Arc::new(StateStore::open("./state", StateStoreConfig::default()).await?);
//! let pipeline = Pipeline::builder(collaborators).checkpoints(store.clone()).build();
//!
//! if let Some(point) = store.resume_point().await {
//!     pipeline.resume(point).await?;
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod archive;
pub mod backend;
pub mod error;
pub mod record;
pub mod store;

pub use archive::{ArchiveKey, ArchivedAssessment, AssessmentSummary};
pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use error::PersistenceError;
pub use record::{
    CheckpointRecord, RecordStatus, ScoreDimension, UserScore, SCHEMA_VERSION, SCORE_RANGE,
};
pub use store::{StateStore, StateStoreConfig};
