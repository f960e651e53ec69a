//! Pipeline lifecycle events
//!
//! One typed event stream; every subscriber gets its own unbounded channel.
//! Events are emitted while the pipeline holds its state lock, so all
//! subscribers observe the same total order.

use crate::phase::{PhaseFailure, PhaseKey};
use crate::results::PipelineResults;
use crate::types::{PhaseOutput, PrimaryInput};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Events emitted by [`crate::Pipeline`]
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Run begins
    Start {
        /// Validated input
        input: PrimaryInput,
    },
    /// Phase invoked
    PhaseStart {
        /// Phase key
        phase: PhaseKey,
        /// Display name
        name: &'static str,
        /// Static estimate
        estimated_duration: Duration,
    },
    /// Phase succeeded (or was restored from a checkpoint)
    PhaseComplete {
        /// Phase key
        phase: PhaseKey,
        /// Display name
        name: &'static str,
        /// Measured duration
        duration: Duration,
        /// Phase result
        data: PhaseOutput,
        /// Restored from a checkpoint rather than executed
        restored: bool,
    },
    /// Phase failed or was skipped
    PhaseError {
        /// Phase key
        phase: PhaseKey,
        /// Display name
        name: &'static str,
        /// Failure detail
        error: PhaseFailure,
        /// Whether `retry_phase` accepts this phase
        can_retry: bool,
    },
    /// Company profile available
    OverviewReady {
        /// Always `company`
        phase: PhaseKey,
        /// Company result
        data: PhaseOutput,
    },
    /// All six phases completed
    Complete(PipelineResults),
    /// Run ended with at least one failed phase
    PartialComplete {
        /// Aggregated results
        results: PipelineResults,
        /// Failed phases in canonical order
        failed_phases: Vec<PhaseKey>,
    },
    /// `cancel()` was invoked
    Cancelled {
        /// One phase that was active at the time
        phase: Option<PhaseKey>,
    },
    /// Run failed fatally (company phase)
    Failed {
        /// Error message
        error: String,
    },
}

impl PipelineEvent {
    /// Event name as used by subscribers
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Start { .. } => "start",
            PipelineEvent::PhaseStart { .. } => "phaseStart",
            PipelineEvent::PhaseComplete { .. } => "phaseComplete",
            PipelineEvent::PhaseError { .. } => "phaseError",
            PipelineEvent::OverviewReady { .. } => "overviewReady",
            PipelineEvent::Complete(_) => "complete",
            PipelineEvent::PartialComplete { .. } => "partialComplete",
            PipelineEvent::Cancelled { .. } => "cancelled",
            PipelineEvent::Failed { .. } => "error",
        }
    }

    /// Phase the event concerns, if any
    #[must_use]
    pub fn phase(&self) -> Option<PhaseKey> {
        match self {
            PipelineEvent::PhaseStart { phase, .. }
            | PipelineEvent::PhaseComplete { phase, .. }
            | PipelineEvent::PhaseError { phase, .. }
            | PipelineEvent::OverviewReady { phase, .. } => Some(*phase),
            PipelineEvent::Cancelled { phase } => *phase,
            _ => None,
        }
    }

    /// Ends the run (complete, partial, fatal error)
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Complete(_)
                | PipelineEvent::PartialComplete { .. }
                | PipelineEvent::Failed { .. }
        )
    }
}

/// Fan-out of pipeline events to subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PipelineEvent>>>,
}

impl EventBus {
    /// Create an empty bus
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver to every live subscriber, dropping closed ones
    pub fn emit(&self, event: PipelineEvent) {
        tracing::trace!(event = event.name(), phase = ?event.phase(), "pipeline event");
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}
