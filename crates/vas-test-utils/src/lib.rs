//! Testing utilities for VAS workspace
//!
//! Scripted collaborators, fixtures, and event helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use vas_pipeline::{
    AnalysisCollaborator, CancellationToken, CheckpointSink, CollaboratorError, CollaboratorSet,
    DocumentRef, PhaseInput, PhaseKey, PhaseOutput, PipelineEvent, PipelineResults, PrimaryInput,
};

/// Collaborator that replays a script of outcomes
///
/// Each call takes the next scripted outcome; the last one repeats forever.
/// Calls sleep for `delay` first and return `Cancelled` if the token fires
/// during that sleep.
#[derive(Debug)]
pub struct ScriptedCollaborator {
    script: Mutex<VecDeque<Result<Value, CollaboratorError>>>,
    delay: Duration,
    observe_cancel: bool,
    calls: AtomicUsize,
    inputs: Mutex<Vec<PhaseInput>>,
}

impl ScriptedCollaborator {
    fn scripted(outcome: Result<Value, CollaboratorError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::from([outcome])),
            delay: Duration::ZERO,
            observe_cancel: true,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn succeed(value: Value) -> Self {
        Self::scripted(Ok(value))
    }

    pub fn fail(message: &str) -> Self {
        Self::scripted(Err(CollaboratorError::failed(message)))
    }

    pub fn error(error: CollaboratorError) -> Self {
        Self::scripted(Err(error))
    }

    /// Queue a later outcome
    #[must_use]
    pub fn then(self, outcome: Result<Value, CollaboratorError>) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Keep sleeping through cancellation
    #[must_use]
    pub fn ignoring_cancel(mut self) -> Self {
        self.observe_cancel = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<PhaseInput> {
        self.inputs.lock().clone()
    }

    fn next_outcome(&self) -> Result<Value, CollaboratorError> {
        let mut script = self.script.lock();
        if script.len() > 1 {
            script.pop_front().unwrap_or_else(|| Ok(Value::Null))
        } else {
            script.front().cloned().unwrap_or_else(|| Ok(Value::Null))
        }
    }
}

#[async_trait]
impl AnalysisCollaborator for ScriptedCollaborator {
    async fn analyze(
        &self,
        input: PhaseInput,
        cancel: CancellationToken,
    ) -> Result<Value, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().push(input);
        let outcome = self.next_outcome();

        if self.observe_cancel {
            tokio::select! {
                () = cancel.cancelled() => return Err(CollaboratorError::Cancelled),
                () = tokio::time::sleep(self.delay) => {}
            }
        } else {
            tokio::time::sleep(self.delay).await;
        }
        outcome
    }
}

/// One scripted collaborator per phase
#[derive(Debug, Clone)]
pub struct ScriptedSuite {
    entries: [Arc<ScriptedCollaborator>; 6],
}

impl ScriptedSuite {
    /// Every phase succeeds immediately
    pub fn healthy() -> Self {
        Self {
            entries: PhaseKey::ALL.map(|key| Arc::new(ScriptedCollaborator::succeed(phase_result(key)))),
        }
    }

    /// Every phase succeeds after its own delay
    pub fn with_delays(delays: [(PhaseKey, Duration); 6]) -> Self {
        let mut suite = Self::healthy();
        for (key, delay) in delays {
            suite.entries[key.index()] =
                Arc::new(ScriptedCollaborator::succeed(phase_result(key)).with_delay(delay));
        }
        suite
    }

    /// Replace the collaborator for one phase
    #[must_use]
    pub fn with(mut self, key: PhaseKey, collaborator: ScriptedCollaborator) -> Self {
        self.entries[key.index()] = Arc::new(collaborator);
        self
    }

    pub fn get(&self, key: PhaseKey) -> &Arc<ScriptedCollaborator> {
        &self.entries[key.index()]
    }

    pub fn calls(&self, key: PhaseKey) -> usize {
        self.get(key).calls()
    }

    pub fn collaborators(&self) -> CollaboratorSet {
        CollaboratorSet::from_fn(|key| {
            let collaborator: Arc<dyn AnalysisCollaborator> = self.entries[key.index()].clone();
            collaborator
        })
    }
}

/// Records every checkpoint hook call
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CheckpointSink for RecordingSink {
    async fn begin_run(&self, input: &PrimaryInput) {
        self.calls.lock().push(format!("begin:{}", input.identifier()));
    }

    async fn phase_completed(&self, key: PhaseKey, _output: &PhaseOutput) {
        self.calls.lock().push(format!("phase:{key}"));
    }

    async fn run_completed(&self, results: &PipelineResults) {
        self.calls.lock().push(format!("complete:{}", results.completed_count()));
    }

    async fn run_reset(&self) {
        self.calls.lock().push("reset".to_string());
    }
}

/// Company profile that yields a usable description
pub fn company_profile() -> Value {
    json!({
        "company_name": "Acme Robotics",
        "description": "Warehouse picking robots",
        "industry": "Logistics",
        "stage": "Series A"
    })
}

/// Description derived from [`company_profile`]
pub const COMPANY_DESCRIPTION: &str =
    "Acme Robotics: Warehouse picking robots\nIndustry: Logistics\nStage: Series A";

/// Plausible result for any phase
pub fn phase_result(key: PhaseKey) -> Value {
    match key {
        PhaseKey::Company => company_profile(),
        other => json!({ "phase": other.as_str(), "score": 6, "summary": format!("{other} looks sound") }),
    }
}

pub fn example_input() -> PrimaryInput {
    PrimaryInput::from_url("https://acme-robotics.example.com")
        .unwrap()
        .with_advisor("Dana")
}

pub fn document_input() -> PrimaryInput {
    PrimaryInput::new().with_document(DocumentRef::new("acme-deck.pdf").with_media_type("application/pdf"))
}

/// Everything currently buffered on a subscription
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn event_names(events: &[PipelineEvent]) -> Vec<&'static str> {
    events.iter().map(PipelineEvent::name).collect()
}
