//! # Eligibility Evaluator
//!
//! Evaluates a rule tree against a declaration, yielding the usage-scenario
//! subset the aspect may run under plus a human-readable justification when
//! scenarios were excluded.
//!
//! Evaluation is a pure function of (rule, declaration) and is memoized per
//! declaration identity for the lifetime of the evaluator, which the
//! pipeline scopes to one source snapshot. Evaluation is total: declarations
//! of a kind a rule was not designed for evaluate to ineligible, never to a
//! panic or error.

use crate::eligibility::rule::{EligibilityRule, RuleNode};
use crate::eligibility::scenario::UsageScenarios;
use crate::model::declaration::{Declaration, DeclarationArena, DeclarationId};
use dashmap::DashMap;
use serde::Serialize;

/// Result of evaluating one rule tree against one declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityOutcome {
    /// Scenarios the aspect may run under for this declaration
    pub eligible: UsageScenarios,
    /// Why scenarios were excluded, when any were
    pub justification: Option<String>,
}

impl EligibilityOutcome {
    fn eligible_all() -> Self {
        Self {
            eligible: UsageScenarios::ALL,
            justification: None,
        }
    }

    pub fn is_fully_eligible(&self) -> bool {
        self.eligible.is_all()
    }

    pub fn is_fully_ineligible(&self) -> bool {
        self.eligible.is_empty()
    }
}

/// Snapshot-scoped evaluator with per-declaration memoization
pub struct EligibilityEvaluator {
    memoize: bool,
    memo: DashMap<(String, DeclarationId), EligibilityOutcome>,
}

impl EligibilityEvaluator {
    pub fn new(memoize: bool) -> Self {
        Self {
            memoize,
            memo: DashMap::new(),
        }
    }

    /// Evaluate an aspect's rule against a declaration, memoized per
    /// (aspect, declaration) within this evaluator's snapshot
    pub fn evaluate_for_aspect(
        &self,
        aspect_name: &str,
        rule: &EligibilityRule,
        arena: &DeclarationArena,
        declaration: DeclarationId,
    ) -> EligibilityOutcome {
        if !self.memoize {
            return Self::evaluate(rule, arena, declaration);
        }
        let key = (aspect_name.to_string(), declaration);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }
        let outcome = Self::evaluate(rule, arena, declaration);
        self.memo.insert(key, outcome.clone());
        outcome
    }

    /// Evaluate a rule tree against a declaration
    pub fn evaluate(
        rule: &EligibilityRule,
        arena: &DeclarationArena,
        declaration: DeclarationId,
    ) -> EligibilityOutcome {
        match arena.get(declaration) {
            Some(decl) => Self::walk(rule, arena, decl),
            None => EligibilityOutcome {
                eligible: UsageScenarios::ALL.minus(rule.blockable()),
                justification: Some(format!("{declaration} does not exist in this snapshot")),
            },
        }
    }

    fn walk(
        rule: &EligibilityRule,
        arena: &DeclarationArena,
        declaration: &Declaration,
    ) -> EligibilityOutcome {
        match rule.node() {
            RuleNode::Always => EligibilityOutcome::eligible_all(),

            RuleNode::Predicate {
                description,
                blocks,
                predicate,
            } => {
                if predicate(declaration, arena) {
                    EligibilityOutcome::eligible_all()
                } else {
                    EligibilityOutcome {
                        eligible: UsageScenarios::ALL.minus(*blocks),
                        justification: Some(format!(
                            "{} '{}' {}",
                            declaration.kind_name(),
                            declaration.name,
                            description
                        )),
                    }
                }
            }

            RuleNode::AllOf(rules) => {
                let mut eligible = UsageScenarios::ALL;
                let mut justification = None;
                for sub in rules {
                    let outcome = Self::walk(sub, arena, declaration);
                    eligible = eligible & outcome.eligible;
                    if justification.is_none() {
                        justification = outcome.justification;
                    }
                }
                EligibilityOutcome {
                    eligible,
                    justification,
                }
            }

            RuleNode::AnyOf(rules) => {
                if rules.is_empty() {
                    return EligibilityOutcome::eligible_all();
                }
                let mut eligible = UsageScenarios::NONE;
                let mut failures = Vec::new();
                let mut any_passed = false;
                for sub in rules {
                    let outcome = Self::walk(sub, arena, declaration);
                    eligible = eligible | outcome.eligible;
                    match outcome.justification {
                        Some(reason) => failures.push(reason),
                        None => any_passed = true,
                    }
                }
                EligibilityOutcome {
                    eligible,
                    justification: if any_passed {
                        None
                    } else {
                        Some(failures.join("; "))
                    },
                }
            }

            RuleNode::Child { projection, rule } => {
                let target = projection
                    .apply(declaration)
                    .and_then(|id| arena.get(id));
                match target {
                    Some(related) => Self::walk(rule, arena, related),
                    None => EligibilityOutcome {
                        eligible: UsageScenarios::ALL.minus(rule.blockable()),
                        justification: Some(format!(
                            "{} '{}' has no {}",
                            declaration.kind_name(),
                            declaration.name,
                            projection
                        )),
                    },
                }
            }

            RuleNode::Scoped { scenarios, rule } => {
                let inner = Self::walk(rule, arena, declaration);
                let blocked = UsageScenarios::ALL.minus(inner.eligible) & *scenarios;
                EligibilityOutcome {
                    eligible: UsageScenarios::ALL.minus(blocked),
                    justification: if blocked.is_empty() {
                        None
                    } else {
                        inner.justification
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::rule::predicates;
    use crate::model::declaration::{Accessibility, DeclarationKind};

    fn arena_with_samples() -> (DeclarationArena, DeclarationId, DeclarationId, DeclarationId) {
        let mut arena = DeclarationArena::new();
        let ty = arena.alloc(
            "Order",
            Accessibility::Public,
            DeclarationKind::Type {
                base: None,
                is_sealed: false,
            },
        );
        let namespace = arena.alloc("Billing", Accessibility::Public, DeclarationKind::Namespace);
        let property = arena.alloc(
            "Total",
            Accessibility::Private,
            DeclarationKind::Property {
                declaring_type: ty,
                property_type: ty,
                is_writable: false,
                is_static: false,
            },
        );
        (arena, ty, namespace, property)
    }

    #[test]
    fn wrong_kind_is_ineligible_not_an_error() {
        let (arena, ty, namespace, _) = arena_with_samples();
        let rule = predicates::must_be_writable();

        let on_type = EligibilityEvaluator::evaluate(&rule, &arena, ty);
        assert!(on_type.is_fully_ineligible());
        assert!(on_type.justification.unwrap().contains("must be writable"));

        let on_namespace = EligibilityEvaluator::evaluate(&rule, &arena, namespace);
        assert!(on_namespace.is_fully_ineligible());
    }

    #[test]
    fn and_group_propagates_first_failure() {
        let (arena, _, _, property) = arena_with_samples();
        let rule = EligibilityRule::all_of(vec![
            predicates::must_not_be_static(),
            predicates::must_be_writable(),
        ]);
        let outcome = EligibilityEvaluator::evaluate(&rule, &arena, property);
        assert!(outcome.is_fully_ineligible());
        assert!(outcome.justification.unwrap().contains("must be writable"));
    }

    #[test]
    fn or_group_surfaces_justification_only_when_all_fail() {
        let (arena, _, _, property) = arena_with_samples();

        let one_passes = EligibilityRule::any_of(vec![
            predicates::must_be_writable(),
            predicates::must_not_be_static(),
        ]);
        let outcome = EligibilityEvaluator::evaluate(&one_passes, &arena, property);
        assert!(outcome.is_fully_eligible());
        assert!(outcome.justification.is_none());

        let all_fail = EligibilityRule::any_of(vec![
            predicates::must_be_writable(),
            predicates::must_be_public(),
        ]);
        let outcome = EligibilityEvaluator::evaluate(&all_fail, &arena, property);
        assert!(outcome.is_fully_ineligible());
        let justification = outcome.justification.unwrap();
        assert!(justification.contains("must be writable"));
        assert!(justification.contains("must be public"));
    }

    #[test]
    fn missing_child_projection_is_ineligible() {
        let (arena, ty, _, _) = arena_with_samples();
        // Types have no declaring type; the projected rule counts as failed.
        let rule = EligibilityRule::on_declaring_type(predicates::must_not_be_sealed());
        let outcome = EligibilityEvaluator::evaluate(&rule, &arena, ty);
        assert!(outcome.is_fully_ineligible());
        assert!(outcome.justification.unwrap().contains("has no declaring type"));
    }

    #[test]
    fn child_projection_evaluates_related_declaration() {
        let (arena, _, _, property) = arena_with_samples();
        let rule = EligibilityRule::on_declaring_type(predicates::must_not_be_sealed());
        let outcome = EligibilityEvaluator::evaluate(&rule, &arena, property);
        assert!(outcome.is_fully_eligible());
    }

    #[test]
    fn scoped_rule_blocks_only_its_scenarios() {
        let (arena, _, _, property) = arena_with_samples();
        let rule = EligibilityRule::scoped(
            UsageScenarios::INHERITANCE,
            predicates::must_be_writable(),
        );
        let outcome = EligibilityEvaluator::evaluate(&rule, &arena, property);
        assert_eq!(
            outcome.eligible,
            UsageScenarios::DEFAULT | UsageScenarios::LIVE_TEMPLATE
        );
        assert!(outcome.justification.is_some());
    }

    #[test]
    fn unknown_declaration_id_is_total() {
        let arena = DeclarationArena::new();
        let rule = predicates::must_be_method();
        let outcome = EligibilityEvaluator::evaluate(&rule, &arena, DeclarationId(42));
        assert!(outcome.is_fully_ineligible());
        assert!(outcome.justification.is_some());
    }

    #[test]
    fn memoized_evaluation_is_stable() {
        let (arena, _, _, property) = arena_with_samples();
        let evaluator = EligibilityEvaluator::new(true);
        let rule = predicates::must_be_writable();
        let first = evaluator.evaluate_for_aspect("Audit", &rule, &arena, property);
        let second = evaluator.evaluate_for_aspect("Audit", &rule, &arena, property);
        assert_eq!(first, second);
    }
}
