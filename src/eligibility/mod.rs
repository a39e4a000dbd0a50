// Eligibility rules for aspect application
//
// Each aspect class carries one composable rule tree, built once per
// aspect-logic compile and evaluated per declaration. The result is a
// usage-scenario subset, not a boolean: a rule may block inherited
// application while leaving direct application eligible.

pub mod evaluator;
pub mod rule;
pub mod scenario;

pub use evaluator::{EligibilityEvaluator, EligibilityOutcome};
pub use rule::{DeclarationProjection, EligibilityRule};
pub use scenario::UsageScenarios;
