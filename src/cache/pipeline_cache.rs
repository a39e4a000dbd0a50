//! # Pipeline Cache
//!
//! ## Overview
//!
//! The primary entry point consumed by an editing host. Keyed by project,
//! the cache holds the last committed [`CacheEntry`] per session and drives
//! the staleness state machine:
//!
//! - Ready × ordinary-only change → Ready, recomputing only changed units
//!   and their dependents
//! - Ready × aspect-logic change → NeedsExternalRebuild, serving the stale
//!   configuration tagged as such
//! - NeedsExternalRebuild × rebuild-completion signal → Ready, rebuilding
//!   the configuration exactly once
//! - NeedsExternalRebuild × ordinary-only change → stays
//!   NeedsExternalRebuild, incremental recomputation continues
//!
//! ## Concurrency
//!
//! Host calls arrive on arbitrary threads. Each project session serializes
//! "observe snapshot → decide → commit" behind an async mutex (request
//! coalescing: concurrent callers for the same snapshot observe at most one
//! in-flight computation), while reads of the last committed entry are
//! lock-free snapshots behind a `parking_lot` read lock held only to clone
//! an `Arc`. Different projects execute fully concurrently. The rebuild
//! coordinator mutates status through the same per-project gate, so
//! Ready/NeedsExternalRebuild transitions are never torn.

use crate::cache::entry::CacheEntry;
use crate::cache::fingerprint::FingerprintSet;
use crate::cache::staleness::{StalenessDecision, StalenessTracker};
use crate::cache::status::PipelineStatus;
use crate::config::WeaverConfig;
use crate::constants::events;
use crate::error::{Result, WeaverError};
use crate::events::EventPublisher;
use crate::model::snapshot::{ProjectId, SourceSnapshot, SourceUnitId};
use crate::pipeline::compiler::{AspectCompiler, LogicRegistry};
use crate::pipeline::configuration::{ConfigurationError, PipelineConfiguration};
use crate::pipeline::executor::{ExecutionDriver, ExecutionError, PipelineExecutor};
use crate::pipeline::types::{IneligibilityNotice, TransformedSnapshot, UnitTransformResult};
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Verification counters and status for one project session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Full pipeline-configuration constructions
    pub configuration_builds: u64,
    /// Committed pipeline executions
    pub executions: u64,
    pub status: Option<PipelineStatus>,
}

/// Result of one `execute` call
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub transformed: TransformedSnapshot,
    pub notices: Vec<IneligibilityNotice>,
    pub status: PipelineStatus,
    /// True when results were produced by a configuration that lags the
    /// latest aspect-logic source
    pub configuration_stale: bool,
    pub execution_id: Uuid,
}

struct ProjectSession {
    /// Single-writer gate around observe → decide → commit
    write_gate: Mutex<()>,
    /// Last committed entry; readers clone the Arc and never block writers
    committed: RwLock<Option<Arc<CacheEntry>>>,
    /// Latest observed snapshot, used to resynchronize after an external
    /// rebuild
    last_snapshot: RwLock<Option<Arc<SourceSnapshot>>>,
    configuration_builds: AtomicU64,
    executions: AtomicU64,
}

impl ProjectSession {
    fn new() -> Self {
        Self {
            write_gate: Mutex::new(()),
            committed: RwLock::new(None),
            last_snapshot: RwLock::new(None),
            configuration_builds: AtomicU64::new(0),
            executions: AtomicU64::new(0),
        }
    }

    fn committed_entry(&self) -> Option<Arc<CacheEntry>> {
        self.committed.read().clone()
    }
}

/// Staleness-aware cache over pipeline configurations and per-unit results
pub struct PipelineCache {
    config: WeaverConfig,
    compiler: Arc<dyn AspectCompiler>,
    driver: ExecutionDriver,
    publisher: EventPublisher,
    /// Compiled aspect logic shared across project sessions by fingerprint
    registry: Arc<LogicRegistry>,
    sessions: DashMap<ProjectId, Arc<ProjectSession>>,
}

impl PipelineCache {
    pub fn new(
        config: WeaverConfig,
        compiler: Arc<dyn AspectCompiler>,
        executor: Arc<dyn PipelineExecutor>,
    ) -> Self {
        let publisher = EventPublisher::new(config.event_channel_capacity);
        let driver = ExecutionDriver::new(
            executor,
            config.max_concurrent_units,
            config.memoize_eligibility,
        );
        info!(
            max_concurrent_units = config.max_concurrent_units,
            memoize_eligibility = config.memoize_eligibility,
            "🗂️ Pipeline cache initialized"
        );
        Self {
            config,
            compiler,
            driver,
            publisher,
            registry: Arc::new(LogicRegistry::new()),
            sessions: DashMap::new(),
        }
    }

    /// Session-scoped registry of compiled aspect logic
    pub fn registry(&self) -> &LogicRegistry {
        &self.registry
    }

    /// Subscribe to lifecycle events (configuration rebuilds, status
    /// transitions, committed executions)
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Runtime configuration this cache was created with
    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    fn session(&self, project: &ProjectId) -> Arc<ProjectSession> {
        self.sessions
            .entry(project.clone())
            .or_insert_with(|| Arc::new(ProjectSession::new()))
            .clone()
    }

    /// Execute the pipeline for `snapshot`. Idempotent and cheap for
    /// unchanged snapshots; incremental otherwise.
    pub async fn execute(
        &self,
        snapshot: &SourceSnapshot,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let session = self.session(&snapshot.project);
        let incoming = FingerprintSet::of_snapshot(snapshot);

        // Lock-free fast path for unchanged snapshots.
        if let Some(entry) = session.committed_entry() {
            if entry.is_current_for(&incoming) {
                return Ok(Self::outcome_from(&entry));
            }
        }

        let _guard = session.write_gate.lock().await;

        // Re-check under the gate: a concurrent caller may have computed
        // this exact snapshot while we waited.
        if let Some(entry) = session.committed_entry() {
            if entry.is_current_for(&incoming) {
                return Ok(Self::outcome_from(&entry));
            }
        }

        if cancel.is_cancelled() {
            return Err(WeaverError::Cancelled);
        }

        *session.last_snapshot.write() = Some(Arc::new(snapshot.clone()));

        let committed = session.committed_entry();
        let decision = StalenessTracker::assess(committed.as_deref(), snapshot, &incoming);

        match decision {
            StalenessDecision::ReuseAll => {
                // Assess only returns this when a committed entry exists.
                let entry = committed.expect("ReuseAll requires a committed entry");
                Ok(Self::outcome_from(&entry))
            }

            StalenessDecision::BuildInitial => {
                let configuration = Arc::new(
                    PipelineConfiguration::build(self.compiler.as_ref(), &self.registry, snapshot)
                        .await
                        .map_err(|e| match e {
                            ConfigurationError::Ordering(conflict) => {
                                WeaverError::OrderingConflict(conflict.to_string())
                            }
                            ConfigurationError::Compile(failure) => {
                                WeaverError::CompilationError(failure.to_string())
                            }
                        })?,
                );
                session.configuration_builds.fetch_add(1, Ordering::SeqCst);
                self.publisher.publish(
                    events::CONFIGURATION_REBUILT,
                    serde_json::json!({
                        "project": snapshot.project.to_string(),
                        "configuration_id": configuration.id,
                    }),
                );

                let all_units: BTreeSet<SourceUnitId> =
                    snapshot.units().map(|u| u.id.clone()).collect();
                let (transformed, notices) = self
                    .run_units(&configuration, snapshot, &all_units, cancel)
                    .await?;

                let entry = self.commit(
                    &session,
                    &snapshot.project,
                    CacheEntry {
                        configuration,
                        fingerprints: incoming,
                        unit_results: Self::freeze(transformed),
                        notices,
                        status: PipelineStatus::Ready,
                        execution_id: Uuid::new_v4(),
                        committed_at: Utc::now(),
                    },
                );
                Ok(Self::outcome_from(&entry))
            }

            StalenessDecision::RecomputeUnits(recompute) => {
                let previous = committed.expect("RecomputeUnits requires a committed entry");
                let entry = self
                    .recompute_and_commit(&session, snapshot, &previous, incoming, recompute, previous.status, cancel)
                    .await?;
                Ok(Self::outcome_from(&entry))
            }

            StalenessDecision::RequireExternalRebuild { recompute } => {
                let previous = committed
                    .expect("RequireExternalRebuild requires a committed entry");
                // An edit that puts the logic source back on the served
                // configuration's exact basis needs no rebuild at all.
                let status = if previous.configuration.matches_logic(&incoming.logic) {
                    PipelineStatus::Ready
                } else {
                    PipelineStatus::NeedsExternalRebuild
                };
                if previous.status != status {
                    if status.is_stale() {
                        warn!(
                            project = %snapshot.project,
                            "Aspect-logic source changed; serving stale configuration until external rebuild"
                        );
                    }
                    self.publisher.publish(
                        events::STATUS_CHANGED,
                        serde_json::json!({
                            "project": snapshot.project.to_string(),
                            "status": status,
                        }),
                    );
                }
                let entry = self
                    .recompute_and_commit(
                        &session,
                        snapshot,
                        &previous,
                        incoming,
                        recompute,
                        status,
                        cancel,
                    )
                    .await?;
                Ok(Self::outcome_from(&entry))
            }
        }
    }

    /// External rebuild completed: discard the stale configuration and
    /// resynchronize against the rebuilt aspect logic. Returns whether a
    /// transition actually fired.
    pub async fn on_rebuild_completed(&self, project: &ProjectId) -> Result<bool> {
        let session = self.session(project);
        let _guard = session.write_gate.lock().await;

        let Some(entry) = session.committed_entry() else {
            debug!(%project, "Rebuild signal ignored: no committed entry");
            return Ok(false);
        };
        if entry.status.is_ready() {
            debug!(%project, "Rebuild signal ignored: configuration already up to date");
            return Ok(false);
        }
        let snapshot = session
            .last_snapshot
            .read()
            .clone()
            .ok_or_else(|| WeaverError::CacheError("no snapshot recorded for project".into()))?;

        let configuration =
            match PipelineConfiguration::build(self.compiler.as_ref(), &self.registry, &snapshot)
                .await
            {
                Ok(configuration) => Arc::new(configuration),
                Err(error) => {
                    warn!(%project, %error, "Rebuilt aspect logic still fails to compile; staying stale");
                    return Ok(false);
                }
            };
        session.configuration_builds.fetch_add(1, Ordering::SeqCst);

        // Every per-unit result depended on the stale configuration, so all
        // of them are recomputed against the rebuilt one. Ordinary
        // fingerprints are kept as-is so unrelated source is not
        // re-timestamped.
        let all_units: BTreeSet<SourceUnitId> = snapshot.units().map(|u| u.id.clone()).collect();
        let (transformed, notices) = self
            .run_units(&configuration, &snapshot, &all_units, &CancellationToken::new())
            .await?;

        let recovered = CacheEntry {
            configuration,
            fingerprints: entry.fingerprints.clone(),
            unit_results: Self::freeze(transformed),
            notices,
            status: PipelineStatus::Ready,
            execution_id: Uuid::new_v4(),
            committed_at: Utc::now(),
        };
        let committed = self.commit(&session, project, recovered);

        info!(
            %project,
            configuration_id = %committed.configuration.id,
            "🔄 External rebuild absorbed; pipeline ready"
        );
        self.publisher.publish(
            events::STATUS_CHANGED,
            serde_json::json!({
                "project": project.to_string(),
                "status": PipelineStatus::Ready,
            }),
        );
        self.publisher.publish(
            events::CONFIGURATION_REBUILT,
            serde_json::json!({
                "project": project.to_string(),
                "configuration_id": committed.configuration.id,
            }),
        );
        Ok(true)
    }

    /// Whether a specific aspect-logic unit's cached effect is stale
    /// relative to the last successful rebuild
    pub fn is_unit_outdated(&self, project: &ProjectId, unit: &SourceUnitId) -> bool {
        self.sessions
            .get(project)
            .and_then(|session| session.committed_entry())
            .map(|entry| entry.is_unit_outdated(unit))
            .unwrap_or(false)
    }

    /// Verification counters and current status for a project
    pub fn stats(&self, project: &ProjectId) -> CacheStats {
        match self.sessions.get(project) {
            Some(session) => CacheStats {
                configuration_builds: session.configuration_builds.load(Ordering::SeqCst),
                executions: session.executions.load(Ordering::SeqCst),
                status: session.committed_entry().map(|entry| entry.status),
            },
            None => CacheStats {
                configuration_builds: 0,
                executions: 0,
                status: None,
            },
        }
    }

    /// Tear down a project session
    pub fn end_session(&self, project: &ProjectId) {
        if self.sessions.remove(project).is_some() {
            info!(%project, "Project session ended");
            self.publisher.publish(
                events::SESSION_ENDED,
                serde_json::json!({ "project": project.to_string() }),
            );
        }
    }

    async fn run_units(
        &self,
        configuration: &PipelineConfiguration,
        snapshot: &SourceSnapshot,
        units: &BTreeSet<SourceUnitId>,
        cancel: &CancellationToken,
    ) -> Result<(TransformedSnapshot, Vec<IneligibilityNotice>)> {
        self.driver
            .run(configuration, snapshot, units, cancel)
            .await
            .map_err(|error| match error {
                ExecutionError::Cancelled => WeaverError::Cancelled,
                other => WeaverError::ExecutionError(other.to_string()),
            })
    }

    /// Recompute `recompute` units against `previous`'s configuration and
    /// commit a merged entry with the given status
    #[allow(clippy::too_many_arguments)]
    async fn recompute_and_commit(
        &self,
        session: &Arc<ProjectSession>,
        snapshot: &SourceSnapshot,
        previous: &Arc<CacheEntry>,
        incoming: FingerprintSet,
        recompute: BTreeSet<SourceUnitId>,
        status: PipelineStatus,
        cancel: &CancellationToken,
    ) -> Result<Arc<CacheEntry>> {
        let (transformed, new_notices) = self
            .run_units(&previous.configuration, snapshot, &recompute, cancel)
            .await?;

        // Merge: keep previous results for untouched units that still
        // exist, replace the recomputed ones.
        let mut unit_results: BTreeMap<SourceUnitId, Arc<UnitTransformResult>> = previous
            .unit_results
            .iter()
            .filter(|(id, _)| snapshot.unit(id).is_some() && !recompute.contains(*id))
            .map(|(id, result)| (id.clone(), Arc::clone(result)))
            .collect();
        for (id, result) in transformed.results {
            unit_results.insert(id, Arc::new(result));
        }

        let mut notices: Vec<IneligibilityNotice> = previous
            .notices
            .iter()
            .filter(|notice| {
                snapshot.unit(&notice.unit).is_some() && !recompute.contains(&notice.unit)
            })
            .cloned()
            .collect();
        notices.extend(new_notices);

        Ok(self.commit(
            session,
            &snapshot.project,
            CacheEntry {
                configuration: Arc::clone(&previous.configuration),
                fingerprints: incoming,
                unit_results,
                notices,
                status,
                execution_id: Uuid::new_v4(),
                committed_at: Utc::now(),
            },
        ))
    }

    /// Commit an entry produced by a pipeline execution
    fn commit(
        &self,
        session: &Arc<ProjectSession>,
        project: &ProjectId,
        entry: CacheEntry,
    ) -> Arc<CacheEntry> {
        session.executions.fetch_add(1, Ordering::SeqCst);
        let entry = self.commit_without_execution(session, project, entry);
        self.publisher.publish(
            events::EXECUTION_COMPLETED,
            serde_json::json!({
                "project": project.to_string(),
                "execution_id": entry.execution_id,
                "status": entry.status,
                "units": entry.unit_results.len(),
            }),
        );
        entry
    }

    fn commit_without_execution(
        &self,
        session: &Arc<ProjectSession>,
        project: &ProjectId,
        entry: CacheEntry,
    ) -> Arc<CacheEntry> {
        let shared = Arc::new(entry);
        *session.committed.write() = Some(Arc::clone(&shared));
        debug!(
            %project,
            execution_id = %shared.execution_id,
            status = %shared.status,
            "Committed cache entry"
        );
        shared
    }

    fn freeze(
        transformed: TransformedSnapshot,
    ) -> BTreeMap<SourceUnitId, Arc<UnitTransformResult>> {
        transformed
            .results
            .into_iter()
            .map(|(id, result)| (id, Arc::new(result)))
            .collect()
    }

    fn outcome_from(entry: &Arc<CacheEntry>) -> ExecutionOutcome {
        ExecutionOutcome {
            transformed: TransformedSnapshot {
                results: entry
                    .unit_results
                    .iter()
                    .map(|(id, result)| (id.clone(), result.as_ref().clone()))
                    .collect(),
            },
            notices: entry.notices.clone(),
            status: entry.status,
            configuration_stale: entry.status.is_stale(),
            execution_id: entry.execution_id,
        }
    }
}
