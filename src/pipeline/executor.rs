//! # Pipeline Execution
//!
//! ## Overview
//!
//! The transformation mechanics live behind the [`PipelineExecutor`]
//! collaborator trait; the core owns the invocation contract. The
//! [`ExecutionDriver`] filters targets through the eligibility evaluator,
//! then walks ranks in order: execution *within* a rank runs concurrently
//! (bounded by configuration), execution *across* ranks respects rank order
//! as a barrier, since a later rank's input is the former rank's output.
//!
//! ## Failure isolation
//!
//! A collaborator failure (error or panic) for one unit is converted into an
//! error diagnostic on that unit's result; other units' results stay valid.
//! A panicking eligibility predicate is a programming-contract violation and
//! is converted into a reported failure for the whole request rather than
//! crashing the host.

use crate::eligibility::evaluator::EligibilityEvaluator;
use crate::model::snapshot::{SourceSnapshot, SourceUnit, SourceUnitId};
use crate::ordering::types::RankedLayers;
use crate::pipeline::configuration::PipelineConfiguration;
use crate::pipeline::types::{
    EligibleTarget, IneligibilityNotice, TransformedSnapshot, UnitTransformResult,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One transformation request handed to the collaborator
pub struct UnitTransformRequest<'a> {
    pub unit: &'a SourceUnit,
    pub snapshot: &'a SourceSnapshot,
    pub ranked_layers: &'a RankedLayers,
    /// The rank being executed; the collaborator must only apply layers of
    /// this rank
    pub rank: u32,
    /// Eligibility-filtered targets within this unit
    pub targets: &'a [EligibleTarget],
}

/// Collaborator that applies ranked layers to one source unit
#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Transform one unit for one rank. Diagnostics, suppressions and
    /// introduced declarations in the result are opaque to the core.
    async fn transform_unit(
        &self,
        request: UnitTransformRequest<'_>,
    ) -> Result<UnitTransformResult, anyhow::Error>;

    /// Executor name for logging and diagnostics
    fn executor_name(&self) -> &'static str;
}

/// Errors that abort a whole execution request
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The caller cancelled; no partial state may be committed
    #[error("execution cancelled")]
    Cancelled,

    /// An eligibility predicate panicked (programming-contract violation),
    /// converted into a reported failure for this request
    #[error("eligibility evaluation panicked for aspect {aspect}")]
    EvaluatorPanicked { aspect: String },
}

/// Drives eligibility filtering and rank-ordered execution
pub struct ExecutionDriver {
    executor: Arc<dyn PipelineExecutor>,
    max_concurrent_units: usize,
    memoize_eligibility: bool,
}

impl ExecutionDriver {
    pub fn new(
        executor: Arc<dyn PipelineExecutor>,
        max_concurrent_units: usize,
        memoize_eligibility: bool,
    ) -> Self {
        Self {
            executor,
            max_concurrent_units: max_concurrent_units.max(1),
            memoize_eligibility,
        }
    }

    /// Run the pipeline for `units` of `snapshot` under `configuration`.
    ///
    /// Returns per-unit results plus the ineligibility notices produced by
    /// target filtering. Cancellation unwinds without producing any result.
    pub async fn run(
        &self,
        configuration: &PipelineConfiguration,
        snapshot: &SourceSnapshot,
        units: &BTreeSet<SourceUnitId>,
        cancel: &CancellationToken,
    ) -> Result<(TransformedSnapshot, Vec<IneligibilityNotice>), ExecutionError> {
        let (unit_targets, notices) = self.collect_targets(configuration, snapshot, units)?;

        let mut results: BTreeMap<SourceUnitId, UnitTransformResult> = units
            .iter()
            .filter(|id| snapshot.unit(id).is_some())
            .map(|id| (id.clone(), UnitTransformResult::empty(id.clone())))
            .collect();

        let max_rank = configuration.ranked_layers.max_rank();
        if let Some(max_rank) = max_rank {
            for rank in 0..=max_rank {
                if cancel.is_cancelled() {
                    debug!(rank, "Execution cancelled between ranks");
                    return Err(ExecutionError::Cancelled);
                }
                self.run_rank(
                    configuration,
                    snapshot,
                    &unit_targets,
                    &mut results,
                    rank,
                )
                .await;
            }
        }

        if cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        Ok((TransformedSnapshot { results }, notices))
    }

    /// Eligibility-filter every (aspect, declaration) pair of the requested
    /// units. Panicking predicates abort the request.
    #[allow(clippy::type_complexity)]
    fn collect_targets(
        &self,
        configuration: &PipelineConfiguration,
        snapshot: &SourceSnapshot,
        units: &BTreeSet<SourceUnitId>,
    ) -> Result<
        (
            BTreeMap<SourceUnitId, Vec<EligibleTarget>>,
            Vec<IneligibilityNotice>,
        ),
        ExecutionError,
    > {
        let evaluator = EligibilityEvaluator::new(self.memoize_eligibility);
        let mut unit_targets: BTreeMap<SourceUnitId, Vec<EligibleTarget>> = BTreeMap::new();
        let mut notices = Vec::new();

        for unit_id in units {
            let Some(unit) = snapshot.unit(unit_id) else {
                continue;
            };
            let targets = unit_targets.entry(unit_id.clone()).or_default();
            for &declaration in &unit.declarations {
                for aspect in &configuration.aspects {
                    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                        evaluator.evaluate_for_aspect(
                            &aspect.name,
                            &aspect.eligibility,
                            &snapshot.declarations,
                            declaration,
                        )
                    }))
                    .map_err(|_| {
                        warn!(aspect = %aspect.name, %declaration, "Eligibility predicate panicked");
                        ExecutionError::EvaluatorPanicked {
                            aspect: aspect.name.clone(),
                        }
                    })?;

                    if !outcome.eligible.is_empty() {
                        targets.push(EligibleTarget {
                            aspect: aspect.name.clone(),
                            declaration,
                            scenarios: outcome.eligible,
                        });
                    }
                    if let Some(justification) = outcome.justification {
                        notices.push(IneligibilityNotice {
                            aspect: aspect.name.clone(),
                            unit: unit_id.clone(),
                            declaration,
                            justification,
                        });
                    }
                }
            }
        }
        Ok((unit_targets, notices))
    }

    /// Execute one rank over every unit concurrently, merging results.
    /// Collaborator failures are isolated per unit.
    async fn run_rank(
        &self,
        configuration: &PipelineConfiguration,
        snapshot: &SourceSnapshot,
        unit_targets: &BTreeMap<SourceUnitId, Vec<EligibleTarget>>,
        results: &mut BTreeMap<SourceUnitId, UnitTransformResult>,
        rank: u32,
    ) {
        // Build the per-unit transform futures eagerly in a plain iterator
        // context, then stream over the futures themselves. Keeping the
        // lifetime-tying `map` closure out of the stream lets the stream's
        // future stay `Send` for any lifetime (as `tokio::spawn` requires);
        // an inline `map` closure over the borrowed tuple is only `FnOnce`
        // for a single lifetime, which is not general enough.
        let pending: Vec<_> = unit_targets
            .iter()
            .filter_map(|(unit_id, targets)| {
                if targets.is_empty() {
                    return None;
                }
                let unit = snapshot.unit(unit_id)?;
                Some(transform_one_unit(
                    Arc::clone(&self.executor),
                    unit_id.clone(),
                    unit,
                    snapshot,
                    &configuration.ranked_layers,
                    rank,
                    targets,
                ))
            })
            .collect();
        let rank_outputs: Vec<(SourceUnitId, UnitTransformResult)> =
            stream::iter(pending)
            .buffer_unordered(self.max_concurrent_units)
            .collect()
            .await;

        for (unit_id, rank_result) in rank_outputs {
            let merged = results
                .entry(unit_id.clone())
                .or_insert_with(|| UnitTransformResult::empty(unit_id));
            if rank_result.transformed_source.is_some() {
                merged.transformed_source = rank_result.transformed_source;
            }
            merged.diagnostics.extend(rank_result.diagnostics);
            merged.suppressions.extend(rank_result.suppressions);
            merged.introductions.extend(rank_result.introductions);
        }
    }
}

/// Transform one unit for one rank via the collaborator, isolating errors and
/// panics into a reported failure result.
///
/// Written as a free `async fn` rather than an inline `async move` block so it
/// is generic over its borrowed arguments' lifetimes; the inline block is only
/// `FnOnce` for a single lifetime, which is not general enough when the
/// enclosing task is spawned and must be `Send` for any lifetime.
async fn transform_one_unit(
    executor: Arc<dyn PipelineExecutor>,
    unit_id: SourceUnitId,
    unit: &SourceUnit,
    snapshot: &SourceSnapshot,
    ranked_layers: &RankedLayers,
    rank: u32,
    targets: &[EligibleTarget],
) -> (SourceUnitId, UnitTransformResult) {
    let request = UnitTransformRequest {
        unit,
        snapshot,
        ranked_layers,
        rank,
        targets,
    };
    let outcome = AssertUnwindSafe(executor.transform_unit(request)).catch_unwind().await;
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(error)) => {
            warn!(unit = %unit_id, %error, "Unit transformation failed");
            UnitTransformResult::failed(
                unit_id.clone(),
                format!("transformation failed: {error}"),
            )
        }
        Err(_) => {
            warn!(unit = %unit_id, "Unit transformation panicked");
            UnitTransformResult::failed(
                unit_id.clone(),
                "transformation panicked".to_string(),
            )
        }
    };
    (unit_id, result)
}
