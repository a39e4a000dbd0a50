//! # Source Snapshot Model
//!
//! A snapshot is the pipeline's immutable view of a project at one edit
//! instant: its source units (partitioned into ordinary source and
//! aspect-logic source), the declaration arena they contribute, and the
//! file-level dependency edges between units used for conservative
//! invalidation.

use crate::model::declaration::{DeclarationArena, DeclarationId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identity of a project session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one source unit (a file-granularity compilation input)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceUnitId(pub String);

impl SourceUnitId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for SourceUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partition of source units: ordinary code being transformed versus the
/// aspect-logic source that defines the transformations themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceUnitKind {
    Ordinary,
    AspectLogic,
}

impl SourceUnitKind {
    pub fn is_aspect_logic(&self) -> bool {
        matches!(self, Self::AspectLogic)
    }
}

/// One source unit within a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub id: SourceUnitId,
    pub kind: SourceUnitKind,
    pub content: String,
    /// Declarations this unit contributes to the arena
    pub declarations: Vec<DeclarationId>,
}

/// Immutable view of a project's source at one edit instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub project: ProjectId,
    units: BTreeMap<SourceUnitId, SourceUnit>,
    pub declarations: DeclarationArena,
    /// unit -> units it depends on (file-level edges in the project's type graph)
    dependencies: BTreeMap<SourceUnitId, BTreeSet<SourceUnitId>>,
}

impl SourceSnapshot {
    pub fn new(project: ProjectId) -> Self {
        Self {
            project,
            units: BTreeMap::new(),
            declarations: DeclarationArena::new(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Add or replace a unit
    pub fn add_unit(
        &mut self,
        id: SourceUnitId,
        kind: SourceUnitKind,
        content: impl Into<String>,
    ) -> &mut Self {
        self.units.insert(
            id.clone(),
            SourceUnit {
                id,
                kind,
                content: content.into(),
                declarations: Vec::new(),
            },
        );
        self
    }

    /// Attach a declaration to a unit
    pub fn attach_declaration(&mut self, unit: &SourceUnitId, declaration: DeclarationId) {
        if let Some(u) = self.units.get_mut(unit) {
            u.declarations.push(declaration);
        }
    }

    /// Record that `unit` depends on `dependency` (file-level)
    pub fn add_dependency(&mut self, unit: SourceUnitId, dependency: SourceUnitId) {
        self.dependencies.entry(unit).or_default().insert(dependency);
    }

    pub fn unit(&self, id: &SourceUnitId) -> Option<&SourceUnit> {
        self.units.get(id)
    }

    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.values()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn ordinary_units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units
            .values()
            .filter(|u| !u.kind.is_aspect_logic())
    }

    pub fn logic_units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.values().filter(|u| u.kind.is_aspect_logic())
    }

    /// Units that directly depend on `id`
    pub fn dependents_of<'a>(
        &'a self,
        id: &'a SourceUnitId,
    ) -> impl Iterator<Item = &'a SourceUnitId> + 'a {
        self.dependencies
            .iter()
            .filter(move |(_, deps)| deps.contains(id))
            .map(|(unit, _)| unit)
    }
}
