//! # Cache Entry
//!
//! The immutable committed state of one project session: the configuration
//! in effect, the fingerprints it was validated against, the per-unit
//! transformation results, and the pipeline status. Entries are replaced
//! wholesale on commit; readers hold an `Arc` to a consistent entry and are
//! never exposed to a half-updated one.

use crate::cache::fingerprint::FingerprintSet;
use crate::cache::status::PipelineStatus;
use crate::model::snapshot::SourceUnitId;
use crate::pipeline::configuration::PipelineConfiguration;
use crate::pipeline::types::{IneligibilityNotice, UnitTransformResult};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Configuration the cached results were computed with. In the
    /// NeedsExternalRebuild state this is the stale, last known-good one.
    pub configuration: Arc<PipelineConfiguration>,
    /// Fingerprints of the snapshot these results were validated against
    pub fingerprints: FingerprintSet,
    pub unit_results: BTreeMap<SourceUnitId, Arc<UnitTransformResult>>,
    pub notices: Vec<IneligibilityNotice>,
    pub status: PipelineStatus,
    pub execution_id: Uuid,
    pub committed_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether this entry already answers the given snapshot fingerprints
    pub fn is_current_for(&self, incoming: &FingerprintSet) -> bool {
        &self.fingerprints == incoming
    }

    /// Logic units whose observed fingerprint differs from the basis the
    /// configuration was built from
    pub fn outdated_logic_units(&self) -> BTreeSet<SourceUnitId> {
        let mut outdated = BTreeSet::new();
        for (unit, fingerprint) in &self.fingerprints.logic {
            if self.configuration.logic_basis.get(unit) != Some(fingerprint) {
                outdated.insert(unit.clone());
            }
        }
        for unit in self.configuration.logic_basis.keys() {
            if !self.fingerprints.logic.contains_key(unit) {
                outdated.insert(unit.clone());
            }
        }
        outdated
    }

    /// Whether one logic unit's cached effect is stale relative to the last
    /// successful rebuild
    pub fn is_unit_outdated(&self, unit: &SourceUnitId) -> bool {
        self.fingerprints.logic.get(unit) != self.configuration.logic_basis.get(unit)
    }
}
