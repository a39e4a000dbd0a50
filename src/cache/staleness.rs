//! # Staleness Tracker
//!
//! Compares an incoming snapshot against the committed cache entry at two
//! granularities: ordinary source units are cheap and always revalidated;
//! aspect-logic units invalidate the pipeline configuration itself and
//! cannot be rebuilt in-process.
//!
//! Dependent invalidation is conservative and file-level: a changed unit
//! invalidates itself plus the transitive closure of units that depend on
//! it in the snapshot's dependency graph. Over-invalidation is acceptable;
//! under-invalidation is not.

use crate::cache::entry::CacheEntry;
use crate::cache::fingerprint::FingerprintSet;
use crate::model::snapshot::{SourceSnapshot, SourceUnitId};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// What the cache must do with an incoming snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StalenessDecision {
    /// No committed entry exists yet; build the configuration and run the
    /// full pipeline
    BuildInitial,
    /// Nothing changed; serve the committed entry as-is
    ReuseAll,
    /// Only ordinary source changed; recompute exactly these units with the
    /// current configuration
    RecomputeUnits(BTreeSet<SourceUnitId>),
    /// Aspect-logic source changed; serve the stale configuration, flag the
    /// entry NeedsExternalRebuild, and still recompute the listed
    /// ordinary units so partial usefulness is preserved
    RequireExternalRebuild { recompute: BTreeSet<SourceUnitId> },
}

pub struct StalenessTracker;

impl StalenessTracker {
    /// Decide how to serve `snapshot` given the committed `entry`
    pub fn assess(
        entry: Option<&CacheEntry>,
        snapshot: &SourceSnapshot,
        incoming: &FingerprintSet,
    ) -> StalenessDecision {
        let Some(entry) = entry else {
            return StalenessDecision::BuildInitial;
        };

        if entry.is_current_for(incoming) {
            return StalenessDecision::ReuseAll;
        }

        let delta = entry.fingerprints.diff(incoming);
        let recompute = Self::invalidation_closure(snapshot, &delta.changed_ordinary);

        if delta.has_logic_changes() {
            debug!(
                project = %snapshot.project,
                changed_logic = delta.changed_logic.len(),
                recompute = recompute.len(),
                "Aspect-logic source changed; external rebuild required"
            );
            return StalenessDecision::RequireExternalRebuild { recompute };
        }

        debug!(
            project = %snapshot.project,
            changed = delta.changed_ordinary.len(),
            recompute = recompute.len(),
            "Ordinary source changed; incremental recomputation"
        );
        StalenessDecision::RecomputeUnits(recompute)
    }

    /// Changed units plus every unit reachable from them through reverse
    /// dependency edges, restricted to units present in the snapshot
    pub fn invalidation_closure(
        snapshot: &SourceSnapshot,
        changed: &BTreeSet<SourceUnitId>,
    ) -> BTreeSet<SourceUnitId> {
        let mut closure: BTreeSet<SourceUnitId> = changed
            .iter()
            .filter(|id| snapshot.unit(id).is_some())
            .cloned()
            .collect();
        let mut queue: VecDeque<SourceUnitId> = closure.iter().cloned().collect();

        while let Some(unit) = queue.pop_front() {
            for dependent in snapshot.dependents_of(&unit) {
                if closure.insert(dependent.clone()) {
                    queue.push_back(dependent.clone());
                }
            }
        }
        closure
    }
}
