//! # Pipeline Result Types
//!
//! Per-unit transformation results and the payloads the core caches and
//! diffs without interpreting: diagnostics, suppressions and introduced
//! declarations are opaque to the pipeline itself.

use crate::eligibility::scenario::UsageScenarios;
use crate::model::declaration::DeclarationId;
use crate::model::snapshot::SourceUnitId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a reported diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One diagnostic reported for a unit or declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub unit: Option<SourceUnitId>,
    pub declaration: Option<DeclarationId>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            unit: None,
            declaration: None,
        }
    }

    pub fn for_unit(mut self, unit: SourceUnitId) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn for_declaration(mut self, declaration: DeclarationId) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// A suppression emitted by a transformation; opaque to the core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    pub suppressed_id: String,
    pub declaration: DeclarationId,
}

/// A declaration introduced by a transformation; opaque payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntroducedDeclaration {
    pub payload: Value,
}

/// An (aspect, declaration) pair that passed eligibility filtering,
/// annotated with the scenarios it may run under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibleTarget {
    pub aspect: String,
    pub declaration: DeclarationId,
    pub scenarios: UsageScenarios,
}

/// An (aspect, declaration) pair excluded by eligibility filtering.
/// Ineligibility is a normal outcome, not an error, and is always surfaced
/// to the caller rather than silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IneligibilityNotice {
    pub aspect: String,
    pub unit: SourceUnitId,
    pub declaration: DeclarationId,
    pub justification: String,
}

/// Transformation result for one source unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTransformResult {
    pub unit: SourceUnitId,
    pub transformed_source: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub suppressions: Vec<Suppression>,
    pub introductions: Vec<IntroducedDeclaration>,
}

impl UnitTransformResult {
    pub fn empty(unit: SourceUnitId) -> Self {
        Self {
            unit,
            transformed_source: None,
            diagnostics: Vec::new(),
            suppressions: Vec::new(),
            introductions: Vec::new(),
        }
    }

    /// Result representing an isolated collaborator failure for this unit
    pub fn failed(unit: SourceUnitId, message: impl Into<String>) -> Self {
        let diagnostic = Diagnostic::new(message, Severity::Error).for_unit(unit.clone());
        Self {
            unit,
            transformed_source: None,
            diagnostics: vec![diagnostic],
            suppressions: Vec::new(),
            introductions: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// The transformed view of a snapshot: one result per executed unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedSnapshot {
    pub results: BTreeMap<SourceUnitId, UnitTransformResult>,
}

impl TransformedSnapshot {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.results.values().flat_map(|r| r.diagnostics.iter())
    }
}
