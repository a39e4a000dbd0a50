//! # Eligibility Rule Trees
//!
//! Rules are built compositionally during aspect-class construction (a
//! declaration-independent phase) and evaluated per declaration by the
//! [`crate::eligibility::EligibilityEvaluator`].
//!
//! ## Composition
//!
//! - `all_of` groups require every sub-rule to pass; a failing sub-rule
//!   propagates its justification.
//! - `any_of` groups pass if any sub-rule passes and surface a justification
//!   only when all fail.
//! - Child rules re-target evaluation to a structurally related declaration
//!   (declaring type, return type, a parameter). A missing relation is
//!   ineligibility, never an error.
//! - A rule may be scoped to a subset of usage scenarios, e.g. rules that
//!   gate direct application but not inherited application.

use crate::eligibility::scenario::UsageScenarios;
use crate::model::declaration::{Declaration, DeclarationArena, DeclarationId};
use std::fmt;
use std::sync::Arc;

/// Predicate over a declaration, with the arena available for id-to-id hops
pub type DeclarationPredicate =
    Arc<dyn Fn(&Declaration, &DeclarationArena) -> bool + Send + Sync>;

/// Projection from a declaration to a structurally related declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationProjection {
    DeclaringType,
    ReturnType,
    Parameter(usize),
}

impl DeclarationProjection {
    pub fn apply(&self, declaration: &Declaration) -> Option<DeclarationId> {
        match self {
            Self::DeclaringType => declaration.declaring_type(),
            Self::ReturnType => declaration.return_type(),
            Self::Parameter(index) => declaration.parameter(*index),
        }
    }
}

impl fmt::Display for DeclarationProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeclaringType => write!(f, "declaring type"),
            Self::ReturnType => write!(f, "return type"),
            Self::Parameter(index) => write!(f, "parameter {index}"),
        }
    }
}

/// Immutable, composable eligibility rule
#[derive(Clone)]
pub struct EligibilityRule {
    node: Arc<RuleNode>,
}

pub(crate) enum RuleNode {
    Always,
    Predicate {
        description: String,
        blocks: UsageScenarios,
        predicate: DeclarationPredicate,
    },
    AllOf(Vec<EligibilityRule>),
    AnyOf(Vec<EligibilityRule>),
    Child {
        projection: DeclarationProjection,
        rule: EligibilityRule,
    },
    Scoped {
        scenarios: UsageScenarios,
        rule: EligibilityRule,
    },
}

impl fmt::Debug for EligibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.as_ref() {
            RuleNode::Always => write!(f, "Always"),
            RuleNode::Predicate { description, blocks, .. } => {
                write!(f, "Predicate({description:?}, blocks {blocks})")
            }
            RuleNode::AllOf(rules) => f.debug_tuple("AllOf").field(rules).finish(),
            RuleNode::AnyOf(rules) => f.debug_tuple("AnyOf").field(rules).finish(),
            RuleNode::Child { projection, rule } => {
                f.debug_struct("Child").field("projection", projection).field("rule", rule).finish()
            }
            RuleNode::Scoped { scenarios, rule } => {
                f.debug_struct("Scoped").field("scenarios", scenarios).field("rule", rule).finish()
            }
        }
    }
}

impl EligibilityRule {
    fn from_node(node: RuleNode) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    pub(crate) fn node(&self) -> &RuleNode {
        self.node.as_ref()
    }

    /// Rule that never blocks anything
    pub fn always() -> Self {
        Self::from_node(RuleNode::Always)
    }

    /// Leaf predicate. When the predicate is false for a declaration, the
    /// given scenarios are blocked and the description becomes the
    /// justification.
    pub fn require<F>(description: impl Into<String>, blocks: UsageScenarios, predicate: F) -> Self
    where
        F: Fn(&Declaration, &DeclarationArena) -> bool + Send + Sync + 'static,
    {
        Self::from_node(RuleNode::Predicate {
            description: description.into(),
            blocks,
            predicate: Arc::new(predicate),
        })
    }

    pub fn all_of(rules: Vec<EligibilityRule>) -> Self {
        Self::from_node(RuleNode::AllOf(rules))
    }

    pub fn any_of(rules: Vec<EligibilityRule>) -> Self {
        Self::from_node(RuleNode::AnyOf(rules))
    }

    /// Re-target `rule` to a structurally related declaration
    pub fn on_child(projection: DeclarationProjection, rule: EligibilityRule) -> Self {
        Self::from_node(RuleNode::Child { projection, rule })
    }

    pub fn on_declaring_type(rule: EligibilityRule) -> Self {
        Self::on_child(DeclarationProjection::DeclaringType, rule)
    }

    pub fn on_return_type(rule: EligibilityRule) -> Self {
        Self::on_child(DeclarationProjection::ReturnType, rule)
    }

    pub fn on_parameter(index: usize, rule: EligibilityRule) -> Self {
        Self::on_child(DeclarationProjection::Parameter(index), rule)
    }

    /// Restrict `rule` so it can only block the given scenarios
    pub fn scoped(scenarios: UsageScenarios, rule: EligibilityRule) -> Self {
        Self::from_node(RuleNode::Scoped { scenarios, rule })
    }

    /// Union of scenarios any predicate in this tree can block. Used when a
    /// child projection has no target: the projected sub-tree counts as
    /// fully failed.
    pub fn blockable(&self) -> UsageScenarios {
        match self.node.as_ref() {
            RuleNode::Always => UsageScenarios::NONE,
            RuleNode::Predicate { blocks, .. } => *blocks,
            RuleNode::AllOf(rules) | RuleNode::AnyOf(rules) => rules
                .iter()
                .fold(UsageScenarios::NONE, |acc, r| acc | r.blockable()),
            RuleNode::Child { rule, .. } => rule.blockable(),
            RuleNode::Scoped { scenarios, rule } => rule.blockable() & *scenarios,
        }
    }
}

impl Default for EligibilityRule {
    fn default() -> Self {
        Self::always()
    }
}

/// Common predicate constructors shared by aspect classes
pub mod predicates {
    use super::*;

    /// The declaration must be writable. Kinds without a writability
    /// capability (types, namespaces, methods) are ineligible.
    pub fn must_be_writable() -> EligibilityRule {
        EligibilityRule::require("must be writable", UsageScenarios::ALL, |decl, _| {
            decl.is_writable().unwrap_or(false)
        })
    }

    /// The declaration must not be static. Kinds without a staticness
    /// capability are ineligible.
    pub fn must_not_be_static() -> EligibilityRule {
        EligibilityRule::require("must not be static", UsageScenarios::ALL, |decl, _| {
            matches!(decl.is_static(), Some(false))
        })
    }

    pub fn must_be_method() -> EligibilityRule {
        EligibilityRule::require("must be a method", UsageScenarios::ALL, |decl, _| {
            decl.kind_name() == "method"
        })
    }

    /// The declaration must be a member of a type
    pub fn must_be_member() -> EligibilityRule {
        EligibilityRule::require("must be a member", UsageScenarios::ALL, |decl, _| {
            decl.is_member()
        })
    }

    pub fn must_be_public() -> EligibilityRule {
        EligibilityRule::require("must be public", UsageScenarios::ALL, |decl, _| {
            matches!(
                decl.accessibility,
                crate::model::declaration::Accessibility::Public
            )
        })
    }

    /// The declaration must be an unsealed type
    pub fn must_not_be_sealed() -> EligibilityRule {
        EligibilityRule::require("must not be sealed", UsageScenarios::ALL, |decl, _| {
            matches!(
                decl.kind,
                crate::model::declaration::DeclarationKind::Type { is_sealed: false, .. }
            )
        })
    }
}
