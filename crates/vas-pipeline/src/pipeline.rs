//! Pipeline orchestrator
//!
//! Runs the six phases of an assessment:
//! - `company` runs alone; failure ends the run
//! - `team`, `funding`, `competitive`, `iprisk` run concurrently
//! - `market` waits for `competitive` to settle and is skipped if it failed
//!
//! The phase table is the only shared mutable state. It sits behind one
//! mutex, and every mutation emits its event under that lock, so subscribers
//! see a single total order even when phases finish at the same instant.

use crate::checkpoint::{CheckpointSink, ResumePoint};
use crate::collaborator::{CollaboratorSet, PhaseInput};
use crate::describe::derive_description;
use crate::error::{CollaboratorError, InvalidStateError, PipelineError, ValidationError};
use crate::events::{EventBus, PipelineEvent};
use crate::phase::{Phase, PhaseFailure, PhaseKey, PhaseStatus};
use crate::progress::{self, ProgressSnapshot};
use crate::results::PipelineResults;
use crate::types::{OperationId, PhaseOutput, PipelineConfig, PrimaryInput};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Builder for [`Pipeline`]
pub struct PipelineBuilder {
    collaborators: CollaboratorSet,
    config: PipelineConfig,
    checkpoints: Option<Arc<dyn CheckpointSink>>,
}

impl PipelineBuilder {
    /// With configuration
    #[inline]
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// With checkpoint sink
    #[inline]
    #[must_use]
    pub fn checkpoints(mut self, sink: Arc<dyn CheckpointSink>) -> Self {
        self.checkpoints = Some(sink);
        self
    }

    /// Build the pipeline
    #[must_use]
    pub fn build(self) -> Pipeline {
        let run = PipelineRun::new(&self.config, 0);
        Pipeline {
            inner: Arc::new(Inner {
                config: self.config,
                collaborators: self.collaborators,
                checkpoints: self.checkpoints,
                events: EventBus::new(),
                run: Mutex::new(run),
            }),
        }
    }
}

/// The assessment orchestrator
///
/// Cheap to clone; clones share the same run, so one task can `cancel()`
/// while another awaits `start()`.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

struct Inner {
    config: PipelineConfig,
    collaborators: CollaboratorSet,
    checkpoints: Option<Arc<dyn CheckpointSink>>,
    events: EventBus,
    run: Mutex<PipelineRun>,
}

/// Identifies the run a piece of work belongs to
#[derive(Debug, Clone)]
struct RunScope {
    generation: u64,
    cancel: CancellationToken,
}

#[derive(Debug)]
struct PipelineRun {
    phases: Vec<Phase>,
    generation: u64,
    started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
    cancel: CancellationToken,
    primary_input: Option<PrimaryInput>,
    derived_description: Option<String>,
    is_running: bool,
    cancelled: bool,
    active: BTreeSet<PhaseKey>,
}

impl PipelineRun {
    fn new(config: &PipelineConfig, generation: u64) -> Self {
        Self {
            phases: PhaseKey::ALL
                .into_iter()
                .map(|key| Phase::new(key, config.estimate(key)))
                .collect(),
            generation,
            started_at: None,
            started: None,
            cancel: CancellationToken::new(),
            primary_input: None,
            derived_description: None,
            is_running: false,
            cancelled: false,
            active: BTreeSet::new(),
        }
    }

    fn ensure_startable(&self) -> Result<(), InvalidStateError> {
        if self.is_running {
            return Err(InvalidStateError::AlreadyRunning);
        }
        if self.cancelled {
            return Err(InvalidStateError::CancelledRun);
        }
        Ok(())
    }

    /// Replace the table with a fresh one for a new run
    fn begin(&mut self, config: &PipelineConfig, input: PrimaryInput) -> RunScope {
        *self = PipelineRun::new(config, self.generation + 1);
        self.started_at = Some(Utc::now());
        self.started = Some(Instant::now());
        self.primary_input = Some(input);
        self.is_running = true;
        self.scope()
    }

    fn scope(&self) -> RunScope {
        RunScope {
            generation: self.generation,
            cancel: self.cancel.clone(),
        }
    }

    fn phase(&self, key: PhaseKey) -> &Phase {
        &self.phases[key.index()]
    }

    fn completed_output(&self, key: PhaseKey) -> Option<PhaseOutput> {
        let phase = self.phase(key);
        if phase.status == PhaseStatus::Completed {
            phase.result.clone()
        } else {
            None
        }
    }

    fn all_completed(&self) -> bool {
        self.phases
            .iter()
            .all(|phase| phase.status == PhaseStatus::Completed)
    }

    /// Input for `key`, built from what earlier phases produced
    fn input_for(&self, key: PhaseKey) -> Result<PhaseInput, PipelineError> {
        let unmet = |requires| PipelineError::DependencyUnmet {
            phase: key,
            requires,
        };
        let description = || {
            self.derived_description
                .clone()
                .ok_or_else(|| unmet(PhaseKey::Company))
        };
        match key {
            PhaseKey::Company | PhaseKey::Team => self
                .primary_input
                .clone()
                .map(PhaseInput::Primary)
                .ok_or_else(|| unmet(PhaseKey::Company)),
            PhaseKey::Funding | PhaseKey::Competitive | PhaseKey::IpRisk => {
                description().map(PhaseInput::Description)
            }
            PhaseKey::Market => {
                let description = description()?;
                let competitive = self
                    .completed_output(PhaseKey::Competitive)
                    .ok_or_else(|| unmet(PhaseKey::Competitive))?;
                Ok(PhaseInput::DescriptionWithCompetitive {
                    description,
                    competitive,
                })
            }
        }
    }

    fn results(&self) -> PipelineResults {
        let mut completed = BTreeMap::new();
        let mut failures = BTreeMap::new();
        for phase in &self.phases {
            if let Some(output) = &phase.result {
                completed.insert(phase.key, output.clone());
            } else if let Some(failure) = &phase.error {
                failures.insert(phase.key, failure.clone());
            }
        }
        PipelineResults::new(
            self.primary_input.clone().unwrap_or_default(),
            self.derived_description.clone().unwrap_or_default(),
            completed,
            failures,
            self.started.map_or(Duration::ZERO, |start| start.elapsed()),
        )
    }
}

impl Pipeline {
    /// Start building a pipeline around its collaborators
    #[inline]
    #[must_use]
    pub fn builder(collaborators: CollaboratorSet) -> PipelineBuilder {
        PipelineBuilder {
            collaborators,
            config: PipelineConfig::default(),
            checkpoints: None,
        }
    }

    /// Create with default configuration and no checkpoint sink
    #[inline]
    #[must_use]
    pub fn new(collaborators: CollaboratorSet) -> Self {
        Self::builder(collaborators).build()
    }

    /// Run a full assessment
    ///
    /// # Workflow
    /// 1. Validate input, emit `start`
    /// 2. Run company; failure is fatal
    /// 3. Run team, funding, competitive, iprisk concurrently
    /// 4. Run market once competitive has settled
    /// 5. Emit `complete` or `partialComplete`
    ///
    /// # Errors
    /// - `PipelineError::Validation` for unusable input
    /// - `PipelineError::InvalidState` if a run is in flight or the
    ///   instance was cancelled without a reset
    /// - `PipelineError::CompanyFailed` if the company phase fails
    /// - `PipelineError::Cancelled` if `cancel()` or `reset()` interrupted it
    pub async fn start(&self, input: PrimaryInput) -> Result<PipelineResults, PipelineError> {
        input.validate()?;
        let scope = {
            let mut run = self.inner.run.lock();
            run.ensure_startable()?;
            let scope = run.begin(&self.inner.config, input.clone());
            self.inner.events.emit(PipelineEvent::Start {
                input: input.clone(),
            });
            scope
        };
        info!(input = %input.identifier(), "assessment started");

        if let Some(sink) = &self.inner.checkpoints {
            sink.begin_run(&input).await;
        }

        if let Err(error) = self
            .execute_phase(PhaseKey::Company, PhaseInput::Primary(input), &scope)
            .await
        {
            return Err(self.fail_run(&scope, error));
        }

        self.run_downstream(&scope).await;
        self.finish_run(&scope).await
    }

    /// Continue an interrupted assessment from a checkpoint
    ///
    /// Completed phases are restored (their `phaseComplete` events carry
    /// `restored: true`) and only the missing phases run.
    ///
    /// # Errors
    /// As [`Pipeline::start`], plus `ValidationError::NothingToResume` when
    /// the checkpoint has no usable company profile.
    pub async fn resume(&self, point: ResumePoint) -> Result<PipelineResults, PipelineError> {
        point.input.validate()?;
        let company = point.completed.get(&PhaseKey::Company).ok_or_else(|| {
            ValidationError::NothingToResume("company profile was not checkpointed".into())
        })?;
        let description = derive_description(company).ok_or_else(|| {
            ValidationError::NothingToResume("company profile has no description".into())
        })?;

        let scope = {
            let mut guard = self.inner.run.lock();
            guard.ensure_startable()?;
            let scope = guard.begin(&self.inner.config, point.input.clone());
            let run = &mut *guard;
            run.derived_description = Some(description);
            self.inner.events.emit(PipelineEvent::Start {
                input: point.input.clone(),
            });

            for (key, output) in &point.completed {
                let phase = &mut run.phases[key.index()];
                if let Err(error) = phase.restore(output.clone()) {
                    run.is_running = false;
                    return Err(error.into());
                }
                self.inner.events.emit(PipelineEvent::PhaseComplete {
                    phase: *key,
                    name: phase.display_name,
                    duration: Duration::ZERO,
                    data: output.clone(),
                    restored: true,
                });
            }
            self.inner.events.emit(PipelineEvent::OverviewReady {
                phase: PhaseKey::Company,
                data: company.clone(),
            });
            scope
        };
        info!(
            input = %point.input.identifier(),
            remaining = ?point.remaining(),
            "assessment resumed"
        );

        self.run_downstream(&scope).await;
        self.finish_run(&scope).await
    }

    /// Re-run one failed phase
    ///
    /// Uses the description derived by the original run; company is never
    /// re-run.
    ///
    /// # Errors
    /// - `InvalidStateError::NotRetryable` unless the phase is in `error`
    ///   (company never is retryable); state is left untouched
    /// - `PipelineError::DependencyUnmet` for market while competitive has
    ///   not completed
    /// - `PipelineError::Phase` if the retry itself fails
    pub async fn retry_phase(&self, key: PhaseKey) -> Result<PhaseOutput, PipelineError> {
        let (input, scope) = {
            let mut guard = self.inner.run.lock();
            let run = &mut *guard;
            if run.cancelled {
                return Err(InvalidStateError::CancelledRun.into());
            }
            let status = run.phase(key).status;
            if status != PhaseStatus::Error || !key.can_retry() {
                return Err(InvalidStateError::NotRetryable { phase: key, status }.into());
            }
            let input = run.input_for(key)?;
            run.phases[key.index()].reset_for_retry()?;
            (input, run.scope())
        };
        info!(phase = %key, "retrying phase");

        let output = self.execute_phase(key, input, &scope).await?;
        self.complete_after_retry(&scope).await;
        Ok(output)
    }

    /// Request cancellation of the current run
    ///
    /// Cooperative: in-flight collaborators see the token and are expected to
    /// stop. Returns the active phase named in the `cancelled` event.
    pub fn cancel(&self) -> Option<PhaseKey> {
        let mut run = self.inner.run.lock();
        if run.cancelled || (!run.is_running && run.active.is_empty()) {
            debug!("cancel ignored: nothing in flight");
            return None;
        }
        run.cancelled = true;
        run.cancel.cancel();
        let phase = run.active.iter().next().copied();
        self.inner.events.emit(PipelineEvent::Cancelled { phase });
        info!(phase = ?phase, "assessment cancellation requested");
        phase
    }

    /// Discard the current run and any stored checkpoint
    ///
    /// Results still arriving from the discarded run are ignored.
    pub async fn reset(&self) {
        {
            let mut run = self.inner.run.lock();
            run.cancel.cancel();
            let generation = run.generation + 1;
            *run = PipelineRun::new(&self.inner.config, generation);
        }
        info!("pipeline reset");
        if let Some(sink) = &self.inner.checkpoints {
            sink.run_reset().await;
        }
    }

    /// Current progress estimate
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        let run = self.inner.run.lock();
        let finished = run.started.is_some() && !run.is_running && run.active.is_empty();
        progress::estimate(&run.phases, run.started, finished, Instant::now())
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PipelineEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of all phases in canonical order
    #[must_use]
    pub fn phases(&self) -> Vec<Phase> {
        self.inner.run.lock().phases.clone()
    }

    /// Snapshot of one phase
    #[must_use]
    pub fn phase(&self, key: PhaseKey) -> Phase {
        self.inner.run.lock().phase(key).clone()
    }

    /// Phases with an operation in flight
    #[must_use]
    pub fn active_phases(&self) -> Vec<PhaseKey> {
        self.inner.run.lock().active.iter().copied().collect()
    }

    /// Whether a run is in flight
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.run.lock().is_running
    }

    /// Whether the current run was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.run.lock().cancelled
    }

    /// When the current run started
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.run.lock().started_at
    }

    /// Description derived from the company profile
    #[must_use]
    pub fn derived_description(&self) -> Option<String> {
        self.inner.run.lock().derived_description.clone()
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Launch the concurrent batch and the competitive -> market chain
    async fn run_downstream(&self, scope: &RunScope) {
        let (team, funding, market, iprisk) = tokio::join!(
            self.run_if_pending(PhaseKey::Team, scope),
            self.run_if_pending(PhaseKey::Funding, scope),
            self.competitive_then_market(scope),
            self.run_if_pending(PhaseKey::IpRisk, scope),
        );
        debug!(
            team = team.is_ok(),
            funding = funding.is_ok(),
            market = market.is_ok(),
            iprisk = iprisk.is_ok(),
            "downstream phases settled"
        );
    }

    async fn competitive_then_market(&self, scope: &RunScope) -> Result<PhaseOutput, PipelineError> {
        let competitive = self.run_if_pending(PhaseKey::Competitive, scope).await;
        if scope.cancel.is_cancelled() {
            // market is closed out only when competitive was under way
            if self.inner.run.lock().phase(PhaseKey::Competitive).status == PhaseStatus::Pending {
                return Err(PipelineError::Cancelled);
            }
            return self.skip_phase(PhaseKey::Market, PhaseFailure::Cancelled, scope);
        }
        match competitive {
            Ok(_) => self.run_if_pending(PhaseKey::Market, scope).await,
            Err(_) => self.skip_phase(
                PhaseKey::Market,
                PhaseFailure::Skipped(PhaseKey::Competitive),
                scope,
            ),
        }
    }

    /// Execute `key` unless it already completed (restored runs)
    async fn run_if_pending(&self, key: PhaseKey, scope: &RunScope) -> Result<PhaseOutput, PipelineError> {
        let input = {
            let run = self.inner.run.lock();
            if let Some(output) = run.completed_output(key) {
                return Ok(output);
            }
            run.input_for(key)?
        };
        self.execute_phase(key, input, scope).await
    }

    async fn execute_phase(
        &self,
        key: PhaseKey,
        input: PhaseInput,
        scope: &RunScope,
    ) -> Result<PhaseOutput, PipelineError> {
        let operation = self.begin_phase(key, scope)?;

        let outcome = match self.invoke(key, input, &scope.cancel).await {
            Ok(_) if scope.cancel.is_cancelled() => Err(CollaboratorError::Cancelled),
            other => other,
        };
        let output = self.settle(key, operation, outcome)?;

        if let Some(sink) = &self.inner.checkpoints {
            sink.phase_completed(key, &output).await;
        }
        Ok(output)
    }

    fn begin_phase(&self, key: PhaseKey, scope: &RunScope) -> Result<OperationId, PipelineError> {
        let mut guard = self.inner.run.lock();
        let run = &mut *guard;
        // cancel() may land while a sink write is awaited
        if run.generation != scope.generation || run.cancelled || scope.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let operation = OperationId::new();
        let phase = &mut run.phases[key.index()];
        phase.begin(operation)?;
        run.active.insert(key);
        self.inner.events.emit(PipelineEvent::PhaseStart {
            phase: key,
            name: phase.display_name,
            estimated_duration: phase.estimated_duration,
        });
        debug!(phase = %key, %operation, "phase started");
        Ok(operation)
    }

    /// Call the collaborator and normalize its response
    async fn invoke(
        &self,
        key: PhaseKey,
        input: PhaseInput,
        cancel: &CancellationToken,
    ) -> Result<PhaseOutput, CollaboratorError> {
        let collaborator = Arc::clone(self.inner.collaborators.get(key));
        let timeout = self.inner.config.phase_timeout();
        let raw = tokio::time::timeout(timeout, collaborator.analyze(input, cancel.child_token()))
            .await
            .map_err(|_| CollaboratorError::Timeout {
                secs: timeout.as_secs(),
            })??;
        let output = PhaseOutput::from_raw(raw)?;
        if key == PhaseKey::Company && derive_description(&output).is_none() {
            return Err(CollaboratorError::malformed(
                "company profile names neither the company nor its business",
            ));
        }
        Ok(output)
    }

    /// Record the outcome of an operation and emit its event
    fn settle(
        &self,
        key: PhaseKey,
        operation: OperationId,
        outcome: Result<PhaseOutput, CollaboratorError>,
    ) -> Result<PhaseOutput, PipelineError> {
        let mut guard = self.inner.run.lock();
        let run = &mut *guard;
        let phase = &mut run.phases[key.index()];
        let name = phase.display_name;

        match outcome {
            Ok(output) => {
                let duration = phase.complete(operation, output.clone())?;
                run.active.remove(&key);
                self.inner.events.emit(PipelineEvent::PhaseComplete {
                    phase: key,
                    name,
                    duration,
                    data: output.clone(),
                    restored: false,
                });
                if key == PhaseKey::Company {
                    run.derived_description = derive_description(&output);
                    self.inner.events.emit(PipelineEvent::OverviewReady {
                        phase: key,
                        data: output.clone(),
                    });
                }
                info!(phase = %key, ?duration, "phase completed");
                Ok(output)
            }
            Err(error) => {
                let failure = PhaseFailure::from(&error);
                phase.fail(operation, failure.clone())?;
                run.active.remove(&key);
                self.inner.events.emit(PipelineEvent::PhaseError {
                    phase: key,
                    name,
                    error: failure,
                    can_retry: key.can_retry(),
                });
                warn!(phase = %key, %error, "phase failed");
                Err(PipelineError::Phase {
                    phase: key,
                    source: error,
                })
            }
        }
    }

    /// Mark `key` failed without invoking it
    fn skip_phase(
        &self,
        key: PhaseKey,
        failure: PhaseFailure,
        scope: &RunScope,
    ) -> Result<PhaseOutput, PipelineError> {
        let mut guard = self.inner.run.lock();
        let run = &mut *guard;
        if run.generation != scope.generation {
            return Err(PipelineError::Cancelled);
        }
        if let Some(output) = run.completed_output(key) {
            return Ok(output);
        }
        let phase = &mut run.phases[key.index()];
        phase.skip(failure.clone())?;
        self.inner.events.emit(PipelineEvent::PhaseError {
            phase: key,
            name: phase.display_name,
            error: failure.clone(),
            can_retry: key.can_retry(),
        });
        info!(phase = %key, reason = %failure, "phase skipped");

        Err(match failure {
            PhaseFailure::Cancelled => PipelineError::Cancelled,
            _ => PipelineError::DependencyUnmet {
                phase: key,
                requires: key.prerequisite().unwrap_or(PhaseKey::Company),
            },
        })
    }

    /// Close a run whose company phase failed
    fn fail_run(&self, scope: &RunScope, error: PipelineError) -> PipelineError {
        let mut run = self.inner.run.lock();
        if run.generation != scope.generation {
            return PipelineError::Cancelled;
        }
        run.is_running = false;
        run.active.clear();
        if run.cancelled {
            info!("assessment cancelled during company analysis");
            return PipelineError::Cancelled;
        }

        let error = match error {
            PipelineError::Phase { source, .. } => PipelineError::CompanyFailed(source),
            other => other,
        };
        self.inner.events.emit(PipelineEvent::Failed {
            error: error.to_string(),
        });
        tracing::error!(%error, "assessment failed");
        error
    }

    async fn finish_run(&self, scope: &RunScope) -> Result<PipelineResults, PipelineError> {
        let results = {
            let mut run = self.inner.run.lock();
            if run.generation != scope.generation {
                return Err(PipelineError::Cancelled);
            }
            run.is_running = false;
            run.active.clear();
            if run.cancelled {
                info!("assessment cancelled");
                return Err(PipelineError::Cancelled);
            }

            let results = run.results();
            if results.is_complete() {
                self.inner.events.emit(PipelineEvent::Complete(results.clone()));
            } else {
                self.inner.events.emit(PipelineEvent::PartialComplete {
                    failed_phases: results.failed_phases(),
                    results: results.clone(),
                });
            }
            results
        };
        info!(
            completed = results.completed_count(),
            failed = ?results.failed_phases(),
            elapsed = ?results.elapsed,
            "assessment finished"
        );

        if results.is_complete() {
            if let Some(sink) = &self.inner.checkpoints {
                sink.run_completed(&results).await;
            }
        }
        Ok(results)
    }

    /// Emit `complete` when a retry filled the last gap of a finished run
    async fn complete_after_retry(&self, scope: &RunScope) {
        let results = {
            let run = self.inner.run.lock();
            if run.generation != scope.generation || run.is_running || !run.all_completed() {
                return;
            }
            let results = run.results();
            self.inner.events.emit(PipelineEvent::Complete(results.clone()));
            results
        };
        info!("assessment completed after retry");
        if let Some(sink) = &self.inner.checkpoints {
            sink.run_completed(&results).await;
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = self.inner.run.lock();
        f.debug_struct("Pipeline")
            .field("config", &self.inner.config)
            .field("is_running", &run.is_running)
            .field("active", &run.active)
            .field("checkpoints", &self.inner.checkpoints.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::AnalysisCollaborator;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct Fixed(Value);

    #[async_trait]
    impl AnalysisCollaborator for Fixed {
        async fn analyze(
            &self,
            _input: PhaseInput,
            _cancel: CancellationToken,
        ) -> Result<Value, CollaboratorError> {
            Ok(self.0.clone())
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(CollaboratorSet::from_fn(|key| {
            let value = if key == PhaseKey::Company {
                json!({"company_name": "Acme", "description": "Robots"})
            } else {
                json!({"score": 6})
            };
            Arc::new(Fixed(value))
        }))
    }

    #[test]
    fn fresh_pipeline_is_idle() {
        let pipeline = pipeline();
        assert!(!pipeline.is_running());
        assert!(pipeline
            .phases()
            .iter()
            .all(|phase| phase.status == PhaseStatus::Pending));
        assert_eq!(pipeline.progress().percent, 0);
    }

    #[test]
    fn market_input_requires_competitive_result() {
        let mut run = PipelineRun::new(&PipelineConfig::default(), 0);
        run.derived_description = Some("Acme: Robots".into());
        assert!(matches!(
            run.input_for(PhaseKey::Market),
            Err(PipelineError::DependencyUnmet {
                requires: PhaseKey::Competitive,
                ..
            })
        ));
        assert_eq!(
            run.input_for(PhaseKey::Funding).unwrap(),
            PhaseInput::Description("Acme: Robots".into())
        );
    }

    #[tokio::test]
    async fn start_rejects_missing_input_before_any_event() {
        let pipeline = pipeline();
        let mut events = pipeline.subscribe();
        let err = pipeline.start(PrimaryInput::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(ValidationError::MissingInput)));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn cancel_without_run_is_ignored() {
        let pipeline = pipeline();
        assert_eq!(pipeline.cancel(), None);
        assert!(!pipeline.is_cancelled());
    }

    #[tokio::test]
    async fn reset_restores_pending_table() {
        let pipeline = pipeline();
        let input = PrimaryInput::from_url("https://example.com").unwrap();
        let results = pipeline.start(input).await.unwrap();
        assert!(results.is_complete());
        assert_eq!(pipeline.progress().percent, 100);

        pipeline.reset().await;
        assert!(pipeline.derived_description().is_none());
        assert!(pipeline
            .phases()
            .iter()
            .all(|phase| phase.status == PhaseStatus::Pending && phase.result.is_none()));
    }
}
