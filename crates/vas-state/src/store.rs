//! Checkpoint and archive store
//!
//! # Key layout
//! - `{namespace}:current` holds the single current-session record
//! - `{namespace}:archive:{ulid}` holds one finished assessment each
//!
//! Every current-session write is read-modify-write of the whole record under
//! one async lock, so concurrent phase checkpoints never lose each other.
//! Write-path methods log and swallow [`PersistenceError`]; the `try_*`
//! variants return it.

use crate::archive::{ArchiveKey, ArchivedAssessment, AssessmentSummary};
use crate::backend::{FileBackend, MemoryBackend, StorageBackend};
use crate::error::PersistenceError;
use crate::record::{CheckpointRecord, RecordStatus, ScoreDimension, UserScore, SCHEMA_VERSION};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::{Generator, Ulid};
use vas_pipeline::{
    CheckpointSink, PhaseKey, PhaseOutput, PipelineResults, PrimaryInput, ResumePoint,
};

/// State store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateStoreConfig {
    /// Key prefix
    pub namespace: String,
    /// Record layout version; stored records with another version are discarded
    pub schema_version: u32,
    /// Archive entries kept; the oldest are evicted beyond this
    pub max_archived: usize,
    /// Archive runs that complete all six phases
    pub archive_on_complete: bool,
}

impl StateStoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With key namespace
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// With schema version
    #[inline]
    #[must_use]
    pub fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    /// With archive capacity
    #[inline]
    #[must_use]
    pub fn with_max_archived(mut self, max: usize) -> Self {
        self.max_archived = max.max(1);
        self
    }

    /// With archive-on-complete
    #[inline]
    #[must_use]
    pub fn with_archive_on_complete(mut self, enabled: bool) -> Self {
        self.archive_on_complete = enabled;
        self
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            namespace: "vas".to_string(),
            schema_version: SCHEMA_VERSION,
            max_archived: 20,
            archive_on_complete: true,
        }
    }
}

/// Only the version, so a record from another layout is recognized as stale
/// rather than corrupt
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    schema_version: Option<u32>,
}

/// Persists the current session and the archive
pub struct StateStore {
    backend: Arc<dyn StorageBackend>,
    config: StateStoreConfig,
    write_lock: tokio::sync::Mutex<()>,
    ids: parking_lot::Mutex<Generator>,
}

impl StateStore {
    /// Create over any backend
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>, config: StateStoreConfig) -> Self {
        Self {
            backend,
            config,
            write_lock: tokio::sync::Mutex::new(()),
            ids: parking_lot::Mutex::new(Generator::new()),
        }
    }

    /// Create over a fresh [`MemoryBackend`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), StateStoreConfig::default())
    }

    /// Create over a [`FileBackend`] rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>, config: StateStoreConfig) -> Result<Self, PersistenceError> {
        let backend = FileBackend::open(dir).await?;
        Ok(Self::new(Arc::new(backend), config))
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StateStoreConfig {
        &self.config
    }

    fn current_key(&self) -> String {
        format!("{}:current", self.config.namespace)
    }

    fn archive_prefix(&self) -> String {
        format!("{}:archive:", self.config.namespace)
    }

    fn archive_key(&self, key: ArchiveKey) -> String {
        format!("{}{key}", self.archive_prefix())
    }

    fn next_archive_key(&self) -> ArchiveKey {
        // monotonic within a millisecond so eviction order is creation order
        let ulid = self.ids.lock().generate().unwrap_or_else(|_| Ulid::new());
        ArchiveKey(ulid)
    }

    // ---- current session: reads ----

    /// Current record, discarding it if stale or unreadable
    pub async fn try_load(&self) -> Result<Option<CheckpointRecord>, PersistenceError> {
        let key = self.current_key();
        let Some(bytes) = self.backend.get(&key).await? else {
            return Ok(None);
        };

        let stored_version = serde_json::from_slice::<VersionProbe>(&bytes)
            .ok()
            .and_then(|probe| probe.schema_version);
        if let Some(version) = stored_version {
            if version != self.config.schema_version {
                info!(
                    stored = version,
                    current = self.config.schema_version,
                    "discarding checkpoint with another schema version"
                );
                self.backend.delete(&key).await?;
                return Ok(None);
            }
        }

        match serde_json::from_slice::<CheckpointRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                warn!(%error, "discarding unreadable checkpoint");
                self.backend.delete(&key).await?;
                Ok(None)
            }
        }
    }

    /// Current record, if any
    pub async fn load(&self) -> Option<CheckpointRecord> {
        swallow("load", self.try_load().await).flatten()
    }

    /// Whether a stored run can be resumed
    pub async fn has_incomplete_analysis(&self) -> bool {
        self.load()
            .await
            .is_some_and(|record| record.is_resumable())
    }

    /// Resume point for the stored run, if resumable
    pub async fn resume_point(&self) -> Option<ResumePoint> {
        self.load().await.and_then(|record| record.resume_point())
    }

    // ---- current session: writes ----

    async fn write(&self, record: &CheckpointRecord) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(record)?;
        self.backend.put(&self.current_key(), bytes).await
    }

    /// Read-modify-write the current record, creating it when absent
    async fn update<F>(&self, apply: F) -> Result<CheckpointRecord, PersistenceError>
    where
        F: FnOnce(&mut CheckpointRecord) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .try_load()
            .await?
            .unwrap_or_else(|| CheckpointRecord::new(self.config.schema_version));
        apply(&mut record);
        record.touch();
        self.write(&record).await?;
        Ok(record)
    }

    /// Start a fresh record for a new run
    pub async fn try_set_primary_input(&self, input: &PrimaryInput) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        let record = CheckpointRecord::started(self.config.schema_version, input.clone());
        self.write(&record).await?;
        debug!(input = %input.identifier(), "checkpoint started");
        Ok(())
    }

    /// Record one phase result; repeated calls for a key overwrite it
    pub async fn try_checkpoint(&self, key: PhaseKey, output: &PhaseOutput) -> Result<(), PersistenceError> {
        let record = self
            .update(|record| {
                record.completed_phase_results.insert(key, output.clone());
                record.status = RecordStatus::InProgress;
            })
            .await?;
        debug!(phase = %key, completed = record.completed_count(), "phase checkpointed");
        Ok(())
    }

    /// Store a rubric score; the record status is left alone
    pub async fn try_save_user_score(
        &self,
        dimension: ScoreDimension,
        score: UserScore,
    ) -> Result<(), PersistenceError> {
        score.validate(dimension)?;
        self.update(|record| {
            record.user_scores.insert(dimension, score);
        })
        .await?;
        debug!(%dimension, "user score saved");
        Ok(())
    }

    /// Mark the run complete; the record stays readable
    pub async fn try_mark_complete(&self) -> Result<(), PersistenceError> {
        self.update(|record| record.status = RecordStatus::Complete)
            .await?;
        info!("checkpoint marked complete");
        Ok(())
    }

    /// Delete the current record
    pub async fn try_clear_state(&self) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.backend.delete(&self.current_key()).await?;
        info!("checkpoint cleared");
        Ok(())
    }

    // Logging wrappers: each runs its `try_*` counterpart, logs a
    // `PersistenceError` at warn level and swallows it, so a failed write
    // never interrupts an assessment.

    /// [`StateStore::try_set_primary_input`], logging and swallowing errors
    pub async fn set_primary_input(&self, input: &PrimaryInput) {
        swallow("set_primary_input", self.try_set_primary_input(input).await);
    }

    /// [`StateStore::try_checkpoint`], logging and swallowing errors
    pub async fn checkpoint(&self, key: PhaseKey, output: &PhaseOutput) {
        swallow("checkpoint", self.try_checkpoint(key, output).await);
    }

    /// [`StateStore::try_save_user_score`], logging and swallowing errors
    ///
    /// An out-of-range score is dropped with a warning.
    pub async fn save_user_score(&self, dimension: ScoreDimension, score: UserScore) {
        swallow("save_user_score", self.try_save_user_score(dimension, score).await);
    }

    /// [`StateStore::try_mark_complete`], logging and swallowing errors
    pub async fn mark_complete(&self) {
        swallow("mark_complete", self.try_mark_complete().await);
    }

    /// [`StateStore::try_clear_state`], logging and swallowing errors
    pub async fn clear_state(&self) {
        swallow("clear_state", self.try_clear_state().await);
    }

    // ---- archive ----

    /// Add a finished assessment, evicting the oldest beyond `max_archived`
    pub async fn try_cache_full_assessment(
        &self,
        assessment: &ArchivedAssessment,
    ) -> Result<ArchiveKey, PersistenceError> {
        let key = self.next_archive_key();
        let bytes = serde_json::to_vec(assessment)?;

        let _guard = self.write_lock.lock().await;
        self.backend.put(&self.archive_key(key), bytes).await?;

        let keys = self.backend.keys(&self.archive_prefix()).await?;
        let excess = keys.len().saturating_sub(self.config.max_archived);
        for stale in keys.iter().take(excess) {
            self.backend.delete(stale).await?;
            debug!(key = %stale, "archive entry evicted");
        }
        info!(%key, input = %assessment.input.identifier(), "assessment archived");
        Ok(key)
    }

    /// Archive `assessment`; `None` if the write failed (logged)
    pub async fn cache_full_assessment(&self, assessment: &ArchivedAssessment) -> Option<ArchiveKey> {
        swallow("cache_full_assessment", self.try_cache_full_assessment(assessment).await)
    }

    /// Archived assessments, newest first; unreadable entries are skipped
    pub async fn try_list_past_assessments(&self) -> Result<Vec<AssessmentSummary>, PersistenceError> {
        let prefix = self.archive_prefix();
        let mut summaries = Vec::new();
        for stored in self.backend.keys(&prefix).await?.iter().rev() {
            let Some(key) = stored
                .strip_prefix(&prefix)
                .and_then(|suffix| suffix.parse::<ArchiveKey>().ok())
            else {
                warn!(key = %stored, "skipping archive entry with foreign key");
                continue;
            };
            if let Some(assessment) = self.read_archived(stored).await? {
                summaries.push(assessment.summary(key));
            }
        }
        Ok(summaries)
    }

    /// Archived assessments, newest first; empty if the backend failed (logged)
    pub async fn list_past_assessments(&self) -> Vec<AssessmentSummary> {
        swallow("list_past_assessments", self.try_list_past_assessments().await).unwrap_or_default()
    }

    /// One archived assessment; `None` when absent or unreadable
    pub async fn load_assessment(&self, key: ArchiveKey) -> Option<ArchivedAssessment> {
        swallow("load_assessment", self.read_archived(&self.archive_key(key)).await).flatten()
    }

    /// Remove one archived assessment
    pub async fn try_delete_assessment(&self, key: ArchiveKey) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.backend.delete(&self.archive_key(key)).await?;
        info!(%key, "archive entry deleted");
        Ok(())
    }

    /// Remove one archived assessment; `false` if the delete failed (logged)
    pub async fn delete_assessment(&self, key: ArchiveKey) -> bool {
        swallow("delete_assessment", self.try_delete_assessment(key).await).is_some()
    }

    async fn read_archived(&self, stored: &str) -> Result<Option<ArchivedAssessment>, PersistenceError> {
        let Some(bytes) = self.backend.get(stored).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(assessment) => Ok(Some(assessment)),
            Err(error) => {
                warn!(key = %stored, %error, "skipping unreadable archive entry");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn swallow<T>(operation: &'static str, result: Result<T, PersistenceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(operation, %error, corrupt = error.is_corrupt(), "state store operation failed");
            None
        }
    }
}

#[async_trait]
impl CheckpointSink for StateStore {
    async fn begin_run(&self, input: &PrimaryInput) {
        self.set_primary_input(input).await;
    }

    async fn phase_completed(&self, key: PhaseKey, output: &PhaseOutput) {
        self.checkpoint(key, output).await;
    }

    async fn run_completed(&self, results: &PipelineResults) {
        self.mark_complete().await;
        if self.config.archive_on_complete {
            let scores = self
                .load()
                .await
                .map(|record| record.user_scores)
                .unwrap_or_default();
            self.cache_full_assessment(&ArchivedAssessment::from_results(results, scores))
                .await;
        }
    }

    async fn run_reset(&self) {
        self.clear_state().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::io;
    use std::time::Duration;

    fn input() -> PrimaryInput {
        PrimaryInput::from_url("https://acme.example.com")
            .unwrap()
            .with_advisor("Dana")
    }

    fn output(tag: &str) -> PhaseOutput {
        PhaseOutput::new(json!({ "tag": tag }))
    }

    fn store_with(backend: Arc<MemoryBackend>, config: StateStoreConfig) -> StateStore {
        StateStore::new(backend, config)
    }

    fn assessment(name: &str) -> ArchivedAssessment {
        ArchivedAssessment {
            input: PrimaryInput::from_url(&format!("https://{name}.example.com")).unwrap(),
            description: format!("{name}: robots"),
            phases: BTreeMap::from([(PhaseKey::Company, output(name))]),
            user_scores: BTreeMap::new(),
            completed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn checkpoint_is_idempotent_per_key() {
        let store = StateStore::in_memory();
        store.try_set_primary_input(&input()).await.unwrap();
        store.try_checkpoint(PhaseKey::Team, &output("x")).await.unwrap();
        store.try_checkpoint(PhaseKey::Team, &output("x")).await.unwrap();

        let record = store.load().await.unwrap();
        assert_eq!(record.completed_count(), 1);
        assert_eq!(record.completed_phase_results[&PhaseKey::Team], output("x"));
        assert_eq!(record.status, RecordStatus::InProgress);
        assert_eq!(record.primary_input.unwrap().advisor_name.as_deref(), Some("Dana"));
    }

    #[tokio::test]
    async fn checkpoint_creates_missing_record() {
        let store = StateStore::in_memory();
        store.checkpoint(PhaseKey::Funding, &output("f")).await;
        assert!(store.has_incomplete_analysis().await);
        // no input recorded, so nothing to hand a pipeline
        assert!(store.resume_point().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_checkpoints_are_all_kept() {
        let store = Arc::new(StateStore::in_memory());
        store.set_primary_input(&input()).await;
        let writes = [PhaseKey::Team, PhaseKey::Funding, PhaseKey::Competitive, PhaseKey::IpRisk]
            .map(|key| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.checkpoint(key, &output(key.as_str())).await })
            });
        for write in writes {
            write.await.unwrap();
        }
        assert_eq!(store.load().await.unwrap().completed_count(), 4);
    }

    #[tokio::test]
    async fn resumable_only_between_one_and_five() {
        let store = StateStore::in_memory();
        store.set_primary_input(&input()).await;
        assert!(!store.has_incomplete_analysis().await);

        for (done, key) in PhaseKey::ALL.into_iter().enumerate() {
            store.checkpoint(key, &output(key.as_str())).await;
            assert_eq!(store.has_incomplete_analysis().await, done + 1 < 6, "{} phases", done + 1);
        }
    }

    #[tokio::test]
    async fn user_scores_leave_status_alone() {
        let store = StateStore::in_memory();
        store.set_primary_input(&input()).await;
        store.checkpoint(PhaseKey::Company, &output("c")).await;
        store
            .try_save_user_score(ScoreDimension::Team, UserScore::new(8, "repeat founders").submitted())
            .await
            .unwrap();

        let record = store.load().await.unwrap();
        assert_eq!(record.status, RecordStatus::InProgress);
        assert_eq!(record.user_scores[&ScoreDimension::Team].score, 8);
    }

    #[tokio::test]
    async fn out_of_range_score_is_rejected() {
        let store = StateStore::in_memory();
        store.set_primary_input(&input()).await;

        let err = store
            .try_save_user_score(ScoreDimension::Market, UserScore::new(10, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidScore { score: 10, .. }));

        // the swallowing variant logs and leaves the record untouched
        store.save_user_score(ScoreDimension::Market, UserScore::new(0, "")).await;
        assert!(store.load().await.unwrap().user_scores.is_empty());
    }

    /// Backend whose every call fails
    struct BrokenBackend;

    #[async_trait]
    impl StorageBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
            Err(io::Error::other("disk gone").into())
        }

        async fn put(&self, _key: &str, _value: Vec<u8>) -> Result<(), PersistenceError> {
            Err(io::Error::other("disk gone").into())
        }

        async fn delete(&self, _key: &str) -> Result<(), PersistenceError> {
            Err(io::Error::other("disk gone").into())
        }

        async fn keys(&self, _prefix: &str) -> Result<Vec<String>, PersistenceError> {
            Err(io::Error::other("disk gone").into())
        }
    }

    #[tokio::test]
    async fn wrappers_swallow_backend_failures() {
        let store = StateStore::new(Arc::new(BrokenBackend), StateStoreConfig::default());
        assert!(store.try_set_primary_input(&input()).await.is_err());

        store.set_primary_input(&input()).await;
        store.checkpoint(PhaseKey::Team, &output("team")).await;
        store.save_user_score(ScoreDimension::Team, UserScore::new(5, "")).await;
        store.mark_complete().await;
        store.clear_state().await;
        assert_eq!(store.cache_full_assessment(&assessment("acme")).await, None);
        assert!(store.list_past_assessments().await.is_empty());
        assert!(!store.delete_assessment(ArchiveKey(Ulid::new())).await);
        assert!(!store.has_incomplete_analysis().await);
    }

    #[tokio::test]
    async fn other_schema_version_is_discarded() {
        let backend = Arc::new(MemoryBackend::new());
        let old = store_with(backend.clone(), StateStoreConfig::new().with_schema_version(1));
        old.set_primary_input(&input()).await;
        old.checkpoint(PhaseKey::Company, &output("c")).await;

        let new = store_with(backend.clone(), StateStoreConfig::new().with_schema_version(2));
        assert!(!new.has_incomplete_analysis().await);
        assert!(new.load().await.is_none());
        assert!(backend.is_empty(), "stale record should be deleted");
    }

    #[tokio::test]
    async fn corrupt_record_is_discarded() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("vas:current", b"{ not json".to_vec()).await.unwrap();
        let store = store_with(backend.clone(), StateStoreConfig::default());

        assert!(store.load().await.is_none());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn mark_complete_keeps_record_and_clear_removes_it() {
        let store = StateStore::in_memory();
        store.set_primary_input(&input()).await;
        store.checkpoint(PhaseKey::Company, &output("c")).await;
        store.mark_complete().await;

        let record = store.load().await.unwrap();
        assert_eq!(record.status, RecordStatus::Complete);
        assert!(!store.has_incomplete_analysis().await);

        store.clear_state().await;
        assert!(store.load().await.is_none());
    }

    #[tokio::test]
    async fn new_run_replaces_previous_record() {
        let store = StateStore::in_memory();
        store.set_primary_input(&input()).await;
        store.checkpoint(PhaseKey::Company, &output("c")).await;
        store.save_user_score(ScoreDimension::Team, UserScore::new(5, "")).await;

        store.set_primary_input(&PrimaryInput::from_url("other.example.com").unwrap()).await;
        let record = store.load().await.unwrap();
        assert_eq!(record.completed_count(), 0);
        assert!(record.user_scores.is_empty());
    }

    #[tokio::test]
    async fn archive_lists_newest_first_and_evicts_oldest() {
        let store = store_with(
            Arc::new(MemoryBackend::new()),
            StateStoreConfig::new().with_max_archived(2),
        );
        let first = store.cache_full_assessment(&assessment("first")).await.unwrap();
        let second = store.cache_full_assessment(&assessment("second")).await.unwrap();
        let third = store.cache_full_assessment(&assessment("third")).await.unwrap();

        let listed: Vec<ArchiveKey> = store
            .list_past_assessments()
            .await
            .iter()
            .map(|summary| summary.key)
            .collect();
        assert_eq!(listed, vec![third, second]);
        assert!(store.load_assessment(first).await.is_none());
        assert_eq!(
            store.load_assessment(second).await.unwrap().description,
            "second: robots"
        );
    }

    #[tokio::test]
    async fn corrupt_archive_entry_is_skipped() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store_with(backend.clone(), StateStoreConfig::default());
        let good = store.cache_full_assessment(&assessment("good")).await.unwrap();
        let bad = ArchiveKey(Ulid::new());
        backend
            .put(&format!("vas:archive:{bad}"), b"garbage".to_vec())
            .await
            .unwrap();

        let listed = store.list_past_assessments().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, good);
        assert_eq!(listed[0].identifier, "good.example.com");
        assert!(store.load_assessment(bad).await.is_none());
    }

    #[tokio::test]
    async fn delete_assessment_removes_entry() {
        let store = StateStore::in_memory();
        let key = store.cache_full_assessment(&assessment("gone")).await.unwrap();
        assert!(store.delete_assessment(key).await);
        assert!(store.list_past_assessments().await.is_empty());
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let backend = Arc::new(MemoryBackend::new());
        let a = store_with(backend.clone(), StateStoreConfig::new().with_namespace("a"));
        let b = store_with(backend.clone(), StateStoreConfig::new().with_namespace("b"));
        a.set_primary_input(&input()).await;
        a.cache_full_assessment(&assessment("a")).await;

        assert!(b.load().await.is_none());
        assert!(b.list_past_assessments().await.is_empty());
    }

    #[tokio::test]
    async fn sink_archives_complete_runs_with_scores() {
        let store = StateStore::in_memory();
        store.begin_run(&input()).await;
        let phases: BTreeMap<_, _> = PhaseKey::ALL
            .into_iter()
            .map(|key| (key, output(key.as_str())))
            .collect();
        for (key, result) in &phases {
            store.phase_completed(*key, result).await;
        }
        store.save_user_score(ScoreDimension::Funding, UserScore::new(6, "")).await;

        let results = PipelineResults::new(
            input(),
            "Acme: robots".into(),
            phases,
            BTreeMap::new(),
            Duration::from_secs(300),
        );
        store.run_completed(&results).await;

        assert_eq!(store.load().await.unwrap().status, RecordStatus::Complete);
        let listed = store.list_past_assessments().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].phase_count, 6);
        assert_eq!(listed[0].average_score, Some(6.0));

        store.run_reset().await;
        assert!(store.load().await.is_none());
        assert_eq!(store.list_past_assessments().await.len(), 1);
    }

    #[tokio::test]
    async fn sink_skips_archive_when_disabled() {
        let store = store_with(
            Arc::new(MemoryBackend::new()),
            StateStoreConfig::new().with_archive_on_complete(false),
        );
        let results = PipelineResults::new(
            input(),
            String::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            Duration::ZERO,
        );
        store.run_completed(&results).await;
        assert!(store.list_past_assessments().await.is_empty());
    }
}
