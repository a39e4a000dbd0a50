//! # Pipeline Configuration
//!
//! The compiled, ranked, rule-bearing artifact derived from aspect-logic
//! source. Expensive to build; valid only for the exact logic fingerprints
//! it was built from. Replaced wholesale, never mutated.

use crate::cache::fingerprint::Fingerprint;
use crate::model::snapshot::{SourceSnapshot, SourceUnit, SourceUnitId};
use crate::ordering::edges::{
    DeclaredOrderEdgeSource, EdgeSource, InheritanceEdgeSource, IntraClassEdgeSource,
};
use crate::ordering::errors::OrderingError;
use crate::ordering::sorter::LayerSorter;
use crate::ordering::types::{AspectClass, RankedLayers};
use crate::pipeline::compiler::{
    AspectCompiler, CompileError, CompiledAspects, DomainState, LogicDomain, LogicRegistry,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors from configuration construction
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Ordering(#[from] OrderingError),
}

/// Compiled pipeline configuration for one logic fingerprint set
#[derive(Debug)]
pub struct PipelineConfiguration {
    pub id: Uuid,
    pub aspects: Vec<AspectClass>,
    pub ranked_layers: RankedLayers,
    /// Logic fingerprints this configuration was built from
    pub logic_basis: BTreeMap<SourceUnitId, Fingerprint>,
    /// Whether the compiled logic can be replaced in-process
    pub hot_replaceable: bool,
    pub built_at: DateTime<Utc>,
}

impl PipelineConfiguration {
    /// Compile aspect logic and assign layer ranks for `snapshot`.
    ///
    /// Compiled aspect sets are shared through `registry` keyed by the
    /// combined logic fingerprint, so a second session over the same logic
    /// source skips the compile.
    pub async fn build(
        compiler: &dyn AspectCompiler,
        registry: &LogicRegistry,
        snapshot: &SourceSnapshot,
    ) -> Result<Self, ConfigurationError> {
        let logic_units: Vec<SourceUnit> = snapshot.logic_units().cloned().collect();
        let unit_fingerprints: Vec<Fingerprint> = logic_units
            .iter()
            .map(|unit| Fingerprint::of(&unit.content))
            .collect();
        let combined = Fingerprint::combine(unit_fingerprints.iter());

        let compiled = match registry.lookup(&combined) {
            Some(domain) if domain.state() == DomainState::Loaded => {
                debug!(
                    fingerprint = %combined,
                    domain_id = %domain.id,
                    "Reusing compiled aspect logic from registry"
                );
                CompiledAspects {
                    aspects: domain.aspects().to_vec(),
                    hot_replaceable: domain.can_hot_replace(),
                }
            }
            _ => {
                let compiled = compiler.compile(&logic_units).await?;
                registry.register(LogicDomain::load(combined, compiled.clone()));
                compiled
            }
        };

        let sources: [&dyn EdgeSource; 3] = [
            &IntraClassEdgeSource,
            &DeclaredOrderEdgeSource,
            &InheritanceEdgeSource,
        ];
        let ranked_layers = LayerSorter::sort(&compiled.aspects, &sources)?;

        let logic_basis: BTreeMap<SourceUnitId, Fingerprint> = logic_units
            .iter()
            .zip(unit_fingerprints)
            .map(|(unit, fingerprint)| (unit.id.clone(), fingerprint))
            .collect();

        let configuration = Self {
            id: Uuid::new_v4(),
            aspects: compiled.aspects,
            ranked_layers,
            logic_basis,
            hot_replaceable: compiled.hot_replaceable,
            built_at: Utc::now(),
        };

        info!(
            configuration_id = %configuration.id,
            compiler = compiler.compiler_name(),
            aspects = configuration.aspects.len(),
            layers = configuration.ranked_layers.len(),
            "Built pipeline configuration"
        );
        Ok(configuration)
    }

    /// Whether this configuration still matches the given observed logic
    /// fingerprints
    pub fn matches_logic(&self, observed: &BTreeMap<SourceUnitId, Fingerprint>) -> bool {
        &self.logic_basis == observed
    }
}
