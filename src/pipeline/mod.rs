// Pipeline configuration and execution
//
// Configuration construction (compile aspect logic, derive ordering edges,
// assign ranks) is the expensive phase; execution runs ranked layers over
// eligibility-filtered targets. The transformation mechanics themselves live
// behind the PipelineExecutor collaborator trait.

pub mod compiler;
pub mod configuration;
pub mod executor;
pub mod types;

pub use compiler::{AspectCompiler, CompileError, CompiledAspects, LogicDomain, LogicRegistry};
pub use configuration::{ConfigurationError, PipelineConfiguration};
pub use executor::{ExecutionDriver, ExecutionError, PipelineExecutor, UnitTransformRequest};
pub use types::{
    Diagnostic, EligibleTarget, IneligibilityNotice, IntroducedDeclaration, Severity, Suppression,
    TransformedSnapshot, UnitTransformResult,
};
