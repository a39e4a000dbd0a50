//! # Aspect-Logic Compilation Collaborators
//!
//! ## Overview
//!
//! Compiling aspect-logic source into [`AspectClass`] sets is the expensive,
//! host-specific part of configuration construction, so it sits behind the
//! [`AspectCompiler`] trait. Compiled logic loads into a [`LogicDomain`]
//! with an explicit load/unload lifecycle; a domain that cannot be
//! hot-replaced in-process is a first-class outcome
//! ([`CompileError::CannotHotReplace`]), not an exception: the cache
//! degrades to NeedsExternalRebuild and keeps serving the last good
//! configuration.
//!
//! Compiled aspect sets are shared through the [`LogicRegistry`], an
//! injectable session-scoped registry keyed by logic fingerprint with an
//! explicit init/teardown lifecycle instead of process statics, so multiple
//! independent project sessions coexist in one process and tests stay
//! hermetic.

use crate::cache::fingerprint::Fingerprint;
use crate::model::snapshot::SourceUnit;
use crate::ordering::types::AspectClass;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Result of one aspect-logic compilation
#[derive(Debug, Clone)]
pub struct CompiledAspects {
    pub aspects: Vec<AspectClass>,
    /// Whether the compiled representation can be replaced in-process.
    /// When false, any later logic change forces an external rebuild.
    pub hot_replaceable: bool,
}

/// Errors from the compilation collaborator. Every variant forces the
/// NeedsExternalRebuild state; none of them is fatal to the host.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The compiled representation of an aspect class cannot be replaced
    /// in the running process
    #[error("aspect logic cannot be hot-replaced: {reason}")]
    CannotHotReplace { reason: String },

    /// The compilation itself failed
    #[error("aspect logic compilation failed: {0}")]
    Failed(#[from] anyhow::Error),
}

/// Collaborator that compiles aspect-logic source units into aspect classes
#[async_trait]
pub trait AspectCompiler: Send + Sync {
    /// Compile the given aspect-logic units. Returns a usable aspect-class
    /// set or a failure that forces NeedsExternalRebuild.
    async fn compile(&self, logic_units: &[SourceUnit]) -> Result<CompiledAspects, CompileError>;

    /// Compiler name for logging and diagnostics
    fn compiler_name(&self) -> &'static str;
}

/// Lifecycle state of a logic domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    Loaded,
    Unloaded,
}

/// An isolated load of compiled aspect logic with an explicit lifecycle
#[derive(Debug, Clone)]
pub struct LogicDomain {
    pub id: Uuid,
    pub fingerprint: Fingerprint,
    aspects: Arc<Vec<AspectClass>>,
    hot_replaceable: bool,
    state: DomainState,
    pub loaded_at: DateTime<Utc>,
}

impl LogicDomain {
    pub fn load(fingerprint: Fingerprint, compiled: CompiledAspects) -> Self {
        let id = Uuid::new_v4();
        debug!(
            domain_id = %id,
            fingerprint = %fingerprint,
            aspects = compiled.aspects.len(),
            hot_replaceable = compiled.hot_replaceable,
            "Loaded logic domain"
        );
        Self {
            id,
            fingerprint,
            aspects: Arc::new(compiled.aspects),
            hot_replaceable: compiled.hot_replaceable,
            state: DomainState::Loaded,
            loaded_at: Utc::now(),
        }
    }

    pub fn aspects(&self) -> &[AspectClass] {
        &self.aspects
    }

    /// Whether this domain's compiled logic can be replaced in-process
    pub fn can_hot_replace(&self) -> bool {
        self.hot_replaceable && self.state == DomainState::Loaded
    }

    pub fn state(&self) -> DomainState {
        self.state
    }

    /// Mark the domain unloaded. Unloading is idempotent.
    pub fn unload(&mut self) {
        if self.state == DomainState::Loaded {
            debug!(domain_id = %self.id, "Unloaded logic domain");
            self.state = DomainState::Unloaded;
        }
    }
}

/// Session-scoped registry of compiled logic, keyed by logic fingerprint
pub struct LogicRegistry {
    domains: DashMap<Fingerprint, Arc<LogicDomain>>,
}

impl LogicRegistry {
    pub fn new() -> Self {
        Self {
            domains: DashMap::new(),
        }
    }

    /// Register a loaded domain, replacing any previous load for the same
    /// fingerprint
    pub fn register(&self, domain: LogicDomain) -> Arc<LogicDomain> {
        let shared = Arc::new(domain);
        self.domains
            .insert(shared.fingerprint.clone(), Arc::clone(&shared));
        shared
    }

    /// Look up a previously compiled domain by fingerprint
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<Arc<LogicDomain>> {
        self.domains.get(fingerprint).map(|d| Arc::clone(&d))
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Teardown: drop every registered domain
    pub fn clear(&self) {
        let count = self.domains.len();
        self.domains.clear();
        if count > 0 {
            info!(domains = count, "Cleared logic registry");
        }
    }
}

impl Default for LogicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
