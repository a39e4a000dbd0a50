//! # Declaration Model
//!
//! Closed tagged-variant representation of source declarations with
//! capability-checked projections.
//!
//! ## Overview
//!
//! Eligibility rules treat methods, fields, properties and parameters
//! polymorphically. Rather than open-ended runtime type tests, every
//! declaration kind is one variant of [`DeclarationKind`], and projections
//! like "declaring type" or "is writable" return `Option` so that asking a
//! question a declaration kind cannot answer is a total, checked case.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable arena index of a declaration within one snapshot
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DeclarationId(pub u32);

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.0)
    }
}

/// Declared accessibility of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    Public,
    Internal,
    Protected,
    Private,
}

/// The closed set of declaration kinds the pipeline operates on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DeclarationKind {
    Namespace,
    Type {
        base: Option<DeclarationId>,
        is_sealed: bool,
    },
    Method {
        declaring_type: DeclarationId,
        return_type: Option<DeclarationId>,
        parameters: Vec<DeclarationId>,
        is_static: bool,
        is_virtual: bool,
    },
    Property {
        declaring_type: DeclarationId,
        property_type: DeclarationId,
        is_writable: bool,
        is_static: bool,
    },
    Field {
        declaring_type: DeclarationId,
        field_type: DeclarationId,
        is_writable: bool,
        is_static: bool,
    },
    Parameter {
        owner: DeclarationId,
        index: usize,
        parameter_type: DeclarationId,
    },
}

/// A single declaration stored in a [`DeclarationArena`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclarationId,
    pub name: String,
    pub accessibility: Accessibility,
    pub kind: DeclarationKind,
}

impl Declaration {
    /// Human-readable kind name for justifications and diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            DeclarationKind::Namespace => "namespace",
            DeclarationKind::Type { .. } => "type",
            DeclarationKind::Method { .. } => "method",
            DeclarationKind::Property { .. } => "property",
            DeclarationKind::Field { .. } => "field",
            DeclarationKind::Parameter { .. } => "parameter",
        }
    }

    /// The type this declaration is a member of, if it is a member
    pub fn declaring_type(&self) -> Option<DeclarationId> {
        match self.kind {
            DeclarationKind::Method { declaring_type, .. }
            | DeclarationKind::Property { declaring_type, .. }
            | DeclarationKind::Field { declaring_type, .. } => Some(declaring_type),
            _ => None,
        }
    }

    /// Return type of a method, or the value type of a property or field
    pub fn return_type(&self) -> Option<DeclarationId> {
        match self.kind {
            DeclarationKind::Method { return_type, .. } => return_type,
            DeclarationKind::Property { property_type, .. } => Some(property_type),
            DeclarationKind::Field { field_type, .. } => Some(field_type),
            _ => None,
        }
    }

    /// Parameter declaration at `index`, if this declaration has parameters
    /// and the index is in range
    pub fn parameter(&self, index: usize) -> Option<DeclarationId> {
        match &self.kind {
            DeclarationKind::Method { parameters, .. } => parameters.get(index).copied(),
            _ => None,
        }
    }

    /// Whether the declaration can be written to. `None` when the question
    /// does not apply to this kind.
    pub fn is_writable(&self) -> Option<bool> {
        match self.kind {
            DeclarationKind::Property { is_writable, .. }
            | DeclarationKind::Field { is_writable, .. } => Some(is_writable),
            _ => None,
        }
    }

    /// Whether the declaration is static. `None` when the question does not
    /// apply to this kind.
    pub fn is_static(&self) -> Option<bool> {
        match self.kind {
            DeclarationKind::Method { is_static, .. }
            | DeclarationKind::Property { is_static, .. }
            | DeclarationKind::Field { is_static, .. } => Some(is_static),
            _ => None,
        }
    }

    /// Base type of a type declaration
    pub fn base_type(&self) -> Option<DeclarationId> {
        match self.kind {
            DeclarationKind::Type { base, .. } => base,
            _ => None,
        }
    }

    pub fn is_member(&self) -> bool {
        self.declaring_type().is_some()
    }
}

/// Arena of declarations for one source snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationArena {
    declarations: Vec<Declaration>,
}

impl DeclarationArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a declaration and return its stable id
    pub fn alloc(
        &mut self,
        name: impl Into<String>,
        accessibility: Accessibility,
        kind: DeclarationKind,
    ) -> DeclarationId {
        let id = DeclarationId(self.declarations.len() as u32);
        self.declarations.push(Declaration {
            id,
            name: name.into(),
            accessibility,
            kind,
        });
        id
    }

    pub fn get(&self, id: DeclarationId) -> Option<&Declaration> {
        self.declarations.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }
}
