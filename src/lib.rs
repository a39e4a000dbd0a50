#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Weaver Core Rust
//!
//! High-performance Rust core of an incremental aspect-weaving pipeline,
//! designed to serve interactive design-time hosts that re-invoke it on
//! every edit.
//!
//! ## Overview
//!
//! Aspect classes are declaratively ordered, conditionally eligible code
//! transformations. The hard part is not the transformation mechanics
//! (those live behind collaborator traits) but keeping three concerns
//! correct under constant re-invocation:
//!
//! - **Deterministic ordering** of layers that only carry a partial
//!   specification of relative order ([`ordering`])
//! - **Eligibility gating** of which transformations may run on a given
//!   declaration, per usage scenario ([`eligibility`])
//! - **Staleness-aware caching** of the expensive pipeline configuration,
//!   including recovery through an out-of-process rebuild when compiled
//!   aspect logic cannot be hot-replaced ([`cache`], [`rebuild`])
//!
//! ## Module Organization
//!
//! - [`model`] - Declaration arena and source snapshots
//! - [`ordering`] - Ordering edges, cycle detection, rank assignment
//! - [`eligibility`] - Composable rules and the scenario-subset evaluator
//! - [`pipeline`] - Configuration construction and rank-ordered execution
//! - [`cache`] - Per-project sessions, staleness state machine, counters
//! - [`rebuild`] - Rebuild-completion marker watching
//! - [`events`] - Lifecycle event publishing
//! - [`config`] - Runtime configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use weaver_core::cache::PipelineCache;
//! use weaver_core::config::WeaverConfig;
//! use weaver_core::model::{ProjectId, SourceSnapshot, SourceUnitId, SourceUnitKind};
//! use weaver_core::pipeline::{AspectCompiler, PipelineExecutor};
//!
//! # async fn example(
//! #     compiler: Arc<dyn AspectCompiler>,
//! #     executor: Arc<dyn PipelineExecutor>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = PipelineCache::new(WeaverConfig::default(), compiler, executor);
//!
//! let mut snapshot = SourceSnapshot::new(ProjectId::new("billing"));
//! snapshot.add_unit(
//!     SourceUnitId::new("src/order.cs"),
//!     SourceUnitKind::Ordinary,
//!     "class Order {}",
//! );
//!
//! let outcome = cache.execute(&snapshot, &CancellationToken::new()).await?;
//! println!("pipeline status: {}", outcome.status);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod eligibility;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod pipeline;
pub mod rebuild;

pub use cache::{
    CacheEntry, CacheStats, ExecutionOutcome, Fingerprint, FingerprintSet, PipelineCache,
    PipelineStatus, SnapshotDelta, StalenessDecision, StalenessTracker,
};
pub use config::WeaverConfig;
pub use eligibility::{EligibilityEvaluator, EligibilityOutcome, EligibilityRule, UsageScenarios};
pub use error::{Result, WeaverError};
pub use events::EventPublisher;
pub use model::{
    Accessibility, Declaration, DeclarationArena, DeclarationId, DeclarationKind, ProjectId,
    SourceSnapshot, SourceUnit, SourceUnitId, SourceUnitKind,
};
pub use ordering::{
    AspectClass, LayerId, LayerSorter, OrderingEdge, OrderingError, RankedLayer, RankedLayers,
};
pub use pipeline::{
    AspectCompiler, CompileError, CompiledAspects, Diagnostic, EligibleTarget, ExecutionDriver,
    IneligibilityNotice, LogicDomain, LogicRegistry, PipelineConfiguration, PipelineExecutor,
    Severity, TransformedSnapshot, UnitTransformRequest, UnitTransformResult,
};
pub use rebuild::{RebuildCoordinator, RebuildCoordinatorConfig, RebuildWatcherHandle};
