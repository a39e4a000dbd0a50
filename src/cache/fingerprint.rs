//! # Source Fingerprints
//!
//! Content hashes per source unit, partitioned into ordinary and
//! aspect-logic subsets. The partition is what gives the staleness tracker
//! its two granularities: ordinary changes are cheap to revalidate,
//! aspect-logic changes invalidate the pipeline configuration itself.

use crate::model::snapshot::{SourceSnapshot, SourceUnitId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// SHA-256 content hash, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        let mut hex = String::with_capacity(64);
        for byte in digest {
            use std::fmt::Write;
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Combine multiple fingerprints into one identity hash. Order matters;
    /// callers feed parts in deterministic (BTreeMap) order.
    pub fn combine<'a>(parts: impl Iterator<Item = &'a Fingerprint>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.0.as_bytes());
        }
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for byte in digest {
            use std::fmt::Write;
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short prefix is enough for log correlation
        write!(f, "{}", &self.0[..12.min(self.0.len())])
    }
}

/// Per-unit fingerprints of one snapshot, partitioned by unit kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintSet {
    pub ordinary: BTreeMap<SourceUnitId, Fingerprint>,
    pub logic: BTreeMap<SourceUnitId, Fingerprint>,
}

impl FingerprintSet {
    pub fn of_snapshot(snapshot: &SourceSnapshot) -> Self {
        let mut set = Self::default();
        for unit in snapshot.units() {
            let fingerprint = Fingerprint::of(&unit.content);
            if unit.kind.is_aspect_logic() {
                set.logic.insert(unit.id.clone(), fingerprint);
            } else {
                set.ordinary.insert(unit.id.clone(), fingerprint);
            }
        }
        set
    }

    /// Identity of the whole snapshot
    pub fn combined(&self) -> Fingerprint {
        Fingerprint::combine(self.ordinary.values().chain(self.logic.values()))
    }

    /// Identity of the aspect-logic subset only
    pub fn logic_combined(&self) -> Fingerprint {
        Fingerprint::combine(self.logic.values())
    }

    /// Units whose fingerprint differs between `self` (older) and `newer`,
    /// including units only present on one side
    pub fn diff(&self, newer: &FingerprintSet) -> SnapshotDelta {
        SnapshotDelta {
            changed_ordinary: Self::diff_maps(&self.ordinary, &newer.ordinary),
            changed_logic: Self::diff_maps(&self.logic, &newer.logic),
        }
    }

    fn diff_maps(
        older: &BTreeMap<SourceUnitId, Fingerprint>,
        newer: &BTreeMap<SourceUnitId, Fingerprint>,
    ) -> BTreeSet<SourceUnitId> {
        let mut changed = BTreeSet::new();
        for (id, fingerprint) in newer {
            if older.get(id) != Some(fingerprint) {
                changed.insert(id.clone());
            }
        }
        for id in older.keys() {
            if !newer.contains_key(id) {
                changed.insert(id.clone());
            }
        }
        changed
    }
}

/// Units that changed between two snapshots, per granularity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    pub changed_ordinary: BTreeSet<SourceUnitId>,
    pub changed_logic: BTreeSet<SourceUnitId>,
}

impl SnapshotDelta {
    pub fn is_empty(&self) -> bool {
        self.changed_ordinary.is_empty() && self.changed_logic.is_empty()
    }

    pub fn has_logic_changes(&self) -> bool {
        !self.changed_logic.is_empty()
    }
}
