//! Shared test collaborators and snapshot builders.
//!
//! The compiler and executor stubs stand in for the host-specific
//! transformation machinery so cache and ordering behavior can be verified
//! hermetically.
#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use weaver_core::model::{
    Accessibility, DeclarationKind, ProjectId, SourceSnapshot, SourceUnitId, SourceUnitKind,
};
use weaver_core::ordering::AspectClass;
use weaver_core::pipeline::{
    AspectCompiler, CompileError, CompiledAspects, PipelineExecutor, UnitTransformRequest,
    UnitTransformResult,
};

/// Compiler stub returning a configurable aspect set
pub struct StubCompiler {
    aspects: Mutex<Vec<AspectClass>>,
    pub compile_calls: AtomicU64,
    pub fail_next: AtomicBool,
}

impl StubCompiler {
    pub fn new(aspects: Vec<AspectClass>) -> Arc<Self> {
        Arc::new(Self {
            aspects: Mutex::new(aspects),
            compile_calls: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
        })
    }

    pub fn set_aspects(&self, aspects: Vec<AspectClass>) {
        *self.aspects.lock().unwrap() = aspects;
    }
}

#[async_trait]
impl AspectCompiler for StubCompiler {
    async fn compile(
        &self,
        _logic_units: &[weaver_core::model::SourceUnit],
    ) -> Result<CompiledAspects, CompileError> {
        self.compile_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(CompileError::CannotHotReplace {
                reason: "stub compiler forced failure".to_string(),
            });
        }
        Ok(CompiledAspects {
            aspects: self.aspects.lock().unwrap().clone(),
            hot_replaceable: false,
        })
    }

    fn compiler_name(&self) -> &'static str {
        "stub_compiler"
    }
}

/// Executor stub that tags transformed source with the rank it ran at
pub struct RecordingExecutor {
    pub calls: AtomicU64,
    pub delay_ms: AtomicU64,
    fail_unit: Mutex<Option<SourceUnitId>>,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU64::new(0),
            delay_ms: AtomicU64::new(0),
            fail_unit: Mutex::new(None),
        })
    }

    pub fn fail_for(&self, unit: SourceUnitId) {
        *self.fail_unit.lock().unwrap() = Some(unit);
    }
}

#[async_trait]
impl PipelineExecutor for RecordingExecutor {
    async fn transform_unit(
        &self,
        request: UnitTransformRequest<'_>,
    ) -> Result<UnitTransformResult, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail_unit.lock().unwrap().as_ref() == Some(&request.unit.id) {
            anyhow::bail!("forced failure for {}", request.unit.id);
        }
        let mut result = UnitTransformResult::empty(request.unit.id.clone());
        result.transformed_source = Some(format!("rank{}:{}", request.rank, request.unit.content));
        Ok(result)
    }

    fn executor_name(&self) -> &'static str {
        "recording_executor"
    }
}

/// Snapshot with the given ordinary and aspect-logic units. Every ordinary
/// unit gets one public type declaration so eligibility filtering has
/// targets to work on.
pub fn snapshot_with(
    project: &str,
    ordinary: &[(&str, &str)],
    logic: &[(&str, &str)],
) -> SourceSnapshot {
    let mut snapshot = SourceSnapshot::new(ProjectId::new(project));
    for (name, content) in ordinary {
        let id = SourceUnitId::new(*name);
        snapshot.add_unit(id.clone(), SourceUnitKind::Ordinary, *content);
        let declaration = snapshot.declarations.alloc(
            format!("TypeIn_{name}"),
            Accessibility::Public,
            DeclarationKind::Type {
                base: None,
                is_sealed: false,
            },
        );
        snapshot.attach_declaration(&id, declaration);
    }
    for (name, content) in logic {
        snapshot.add_unit(SourceUnitId::new(*name), SourceUnitKind::AspectLogic, *content);
    }
    snapshot
}

/// One single-layer aspect with no constraints
pub fn simple_aspect(name: &str, declaration_order: u32) -> AspectClass {
    AspectClass::new(name, declaration_order)
}
