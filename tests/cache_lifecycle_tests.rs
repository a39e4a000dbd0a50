//! Cache state-machine and counter behavior: idempotent caching,
//! incremental recomputation, degradation to NeedsExternalRebuild,
//! recovery, coalescing and cancellation.

mod common;

use common::{simple_aspect, snapshot_with, RecordingExecutor, StubCompiler};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use weaver_core::cache::{PipelineCache, PipelineStatus};
use weaver_core::config::WeaverConfig;
use weaver_core::error::WeaverError;
use weaver_core::model::{ProjectId, SourceUnitId};
use weaver_core::ordering::AspectClass;

fn cache_with(
    aspects: Vec<AspectClass>,
) -> (Arc<PipelineCache>, Arc<StubCompiler>, Arc<RecordingExecutor>) {
    let compiler = StubCompiler::new(aspects);
    let executor = RecordingExecutor::new();
    let cache = Arc::new(PipelineCache::new(
        WeaverConfig::default(),
        compiler.clone(),
        executor.clone(),
    ));
    (cache, compiler, executor)
}

#[tokio::test]
async fn unchanged_snapshot_is_idempotent() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let snapshot = snapshot_with(
        "billing",
        &[("a.cs", "class A {}"), ("b.cs", "class B {}")],
        &[("logic.cs", "aspect v1")],
    );
    let cancel = CancellationToken::new();

    let first = cache.execute(&snapshot, &cancel).await.unwrap();
    let second = cache.execute(&snapshot, &cancel).await.unwrap();

    assert_eq!(first.execution_id, second.execution_id);
    let stats = cache.stats(&ProjectId::new("billing"));
    assert_eq!(stats.configuration_builds, 1);
    assert_eq!(stats.executions, 1);
    assert_eq!(stats.status, Some(PipelineStatus::Ready));
}

#[tokio::test]
async fn ordinary_change_increments_execution_only() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let cancel = CancellationToken::new();
    let logic = &[("logic.cs", "aspect v1")];

    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], logic);
    cache.execute(&snapshot, &cancel).await.unwrap();

    let edited = snapshot_with("billing", &[("a.cs", "class A { int X; }")], logic);
    let outcome = cache.execute(&edited, &cancel).await.unwrap();

    assert_eq!(outcome.status, PipelineStatus::Ready);
    assert!(!outcome.configuration_stale);
    let stats = cache.stats(&ProjectId::new("billing"));
    assert_eq!(stats.configuration_builds, 1);
    assert_eq!(stats.executions, 2);

    let result = &outcome.transformed.results[&SourceUnitId::new("a.cs")];
    assert_eq!(
        result.transformed_source.as_deref(),
        Some("rank0:class A { int X; }")
    );
}

#[tokio::test]
async fn dependents_are_recomputed_conservatively() {
    let (cache, _, executor) = cache_with(vec![simple_aspect("Audit", 0)]);
    let cancel = CancellationToken::new();

    let mut snapshot = snapshot_with(
        "billing",
        &[("base.cs", "class Base {}"), ("derived.cs", "class Derived {}"), ("other.cs", "class Other {}")],
        &[("logic.cs", "aspect v1")],
    );
    snapshot.add_dependency(SourceUnitId::new("derived.cs"), SourceUnitId::new("base.cs"));
    cache.execute(&snapshot, &cancel).await.unwrap();
    let calls_after_initial = executor.calls.load(Ordering::SeqCst);

    let mut edited = snapshot_with(
        "billing",
        &[("base.cs", "class Base { int X; }"), ("derived.cs", "class Derived {}"), ("other.cs", "class Other {}")],
        &[("logic.cs", "aspect v1")],
    );
    edited.add_dependency(SourceUnitId::new("derived.cs"), SourceUnitId::new("base.cs"));
    cache.execute(&edited, &cancel).await.unwrap();

    // base.cs changed; derived.cs depends on it; other.cs stays cached.
    let incremental_calls = executor.calls.load(Ordering::SeqCst) - calls_after_initial;
    assert_eq!(incremental_calls, 2);
}

#[tokio::test]
async fn logic_change_degrades_to_needs_external_rebuild() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let cancel = CancellationToken::new();
    let project = ProjectId::new("billing");

    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);
    cache.execute(&snapshot, &cancel).await.unwrap();

    let logic_changed =
        snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v2")]);
    let outcome = cache.execute(&logic_changed, &cancel).await.unwrap();

    assert_eq!(outcome.status, PipelineStatus::NeedsExternalRebuild);
    assert!(outcome.configuration_stale);
    let stats = cache.stats(&project);
    // The stale configuration keeps being served; no in-process rebuild.
    assert_eq!(stats.configuration_builds, 1);
    assert!(cache.is_unit_outdated(&project, &SourceUnitId::new("logic.cs")));
    assert!(!cache.is_unit_outdated(&project, &SourceUnitId::new("a.cs")));
}

#[tokio::test]
async fn ordinary_changes_continue_while_stale() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let cancel = CancellationToken::new();
    let project = ProjectId::new("billing");

    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);
    cache.execute(&snapshot, &cancel).await.unwrap();
    let logic_changed =
        snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v2")]);
    cache.execute(&logic_changed, &cancel).await.unwrap();

    let both_changed = snapshot_with(
        "billing",
        &[("a.cs", "class A { int X; }")],
        &[("logic.cs", "aspect v2")],
    );
    let outcome = cache.execute(&both_changed, &cancel).await.unwrap();

    // Partial usefulness: recomputation proceeds with the stale configuration.
    assert_eq!(outcome.status, PipelineStatus::NeedsExternalRebuild);
    let result = &outcome.transformed.results[&SourceUnitId::new("a.cs")];
    assert_eq!(
        result.transformed_source.as_deref(),
        Some("rank0:class A { int X; }")
    );
    let stats = cache.stats(&project);
    assert_eq!(stats.configuration_builds, 1);
    assert_eq!(stats.executions, 3);
}

#[tokio::test]
async fn rebuild_signal_recovers_exactly_once() {
    let (cache, compiler, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let cancel = CancellationToken::new();
    let project = ProjectId::new("billing");

    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);
    cache.execute(&snapshot, &cancel).await.unwrap();
    let logic_changed =
        snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v2")]);
    cache.execute(&logic_changed, &cancel).await.unwrap();
    assert_eq!(cache.stats(&project).status, Some(PipelineStatus::NeedsExternalRebuild));

    // The external rebuild produced a new aspect set.
    compiler.set_aspects(vec![simple_aspect("Audit", 0), simple_aspect("Metrics", 1)]);

    assert!(cache.on_rebuild_completed(&project).await.unwrap());
    let stats = cache.stats(&project);
    assert_eq!(stats.status, Some(PipelineStatus::Ready));
    assert_eq!(stats.configuration_builds, 2);
    assert!(!cache.is_unit_outdated(&project, &SourceUnitId::new("logic.cs")));

    // Redundant signals are no-ops once the configuration is current.
    assert!(!cache.on_rebuild_completed(&project).await.unwrap());
    assert_eq!(cache.stats(&project).configuration_builds, 2);
}

#[tokio::test]
async fn rebuild_signal_without_stale_state_is_ignored() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let project = ProjectId::new("billing");

    // No committed entry at all.
    assert!(!cache.on_rebuild_completed(&project).await.unwrap());

    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);
    cache
        .execute(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    // Ready state: the transition must not fire speculatively.
    assert!(!cache.on_rebuild_completed(&project).await.unwrap());
    assert_eq!(cache.stats(&project).configuration_builds, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_same_snapshot_coalesces_to_one_build() {
    let (cache, _, executor) = cache_with(vec![simple_aspect("Audit", 0)]);
    executor.delay_ms.store(50, Ordering::SeqCst);
    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let snapshot = snapshot.clone();
        handles.push(tokio::spawn(async move {
            cache.execute(&snapshot, &CancellationToken::new()).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = cache.stats(&ProjectId::new("billing"));
    assert_eq!(stats.configuration_builds, 1);
    assert_eq!(stats.executions, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_projects_execute_independently() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let first = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);
    let second = snapshot_with("shipping", &[("s.cs", "class S {}")], &[("logic.cs", "aspect v1")]);

    let first_cancel = CancellationToken::new();
    let second_cancel = CancellationToken::new();
    let (left, right) = tokio::join!(
        cache.execute(&first, &first_cancel),
        cache.execute(&second, &second_cancel),
    );
    left.unwrap();
    right.unwrap();

    assert_eq!(cache.stats(&ProjectId::new("billing")).configuration_builds, 1);
    assert_eq!(cache.stats(&ProjectId::new("shipping")).configuration_builds, 1);
}

#[tokio::test]
async fn shared_logic_compiles_once_across_projects() {
    let (cache, compiler, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let logic = &[("logic.cs", "aspect v1")];
    let first = snapshot_with("billing", &[("a.cs", "class A {}")], logic);
    let second = snapshot_with("shipping", &[("s.cs", "class S {}")], logic);

    cache.execute(&first, &CancellationToken::new()).await.unwrap();
    cache.execute(&second, &CancellationToken::new()).await.unwrap();

    // Both sessions built a configuration, but the identical logic source
    // was compiled once and shared through the registry.
    assert_eq!(cache.stats(&ProjectId::new("billing")).configuration_builds, 1);
    assert_eq!(cache.stats(&ProjectId::new("shipping")).configuration_builds, 1);
    assert_eq!(compiler.compile_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.registry().len(), 1);
}

#[tokio::test]
async fn cancellation_commits_nothing() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);
    let project = ProjectId::new("billing");

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let result = cache.execute(&snapshot, &cancelled).await;
    assert!(matches!(result, Err(WeaverError::Cancelled)));

    let stats = cache.stats(&project);
    assert_eq!(stats.executions, 0);
    assert_eq!(stats.status, None);

    // A later uncancelled call proceeds normally.
    cache
        .execute(&snapshot, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(cache.stats(&project).executions, 1);
}

#[tokio::test]
async fn collaborator_failure_is_isolated_per_unit() {
    let (cache, _, executor) = cache_with(vec![simple_aspect("Audit", 0)]);
    executor.fail_for(SourceUnitId::new("bad.cs"));
    let snapshot = snapshot_with(
        "billing",
        &[("bad.cs", "class Bad {}"), ("good.cs", "class Good {}")],
        &[("logic.cs", "aspect v1")],
    );

    let outcome = cache
        .execute(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    let bad = &outcome.transformed.results[&SourceUnitId::new("bad.cs")];
    assert!(bad.has_errors());
    let good = &outcome.transformed.results[&SourceUnitId::new("good.cs")];
    assert!(!good.has_errors());
    assert_eq!(good.transformed_source.as_deref(), Some("rank0:class Good {}"));
}

#[tokio::test]
async fn initial_compile_failure_is_an_error() {
    let (cache, compiler, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    compiler.fail_next.store(true, Ordering::SeqCst);
    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);

    let result = cache.execute(&snapshot, &CancellationToken::new()).await;
    assert!(matches!(result, Err(WeaverError::CompilationError(_))));
    assert_eq!(cache.stats(&ProjectId::new("billing")).configuration_builds, 0);
}

#[tokio::test]
async fn ordering_conflict_fails_configuration_construction() {
    let aspects = vec![
        AspectClass::new("A", 0).executes_before("B"),
        AspectClass::new("B", 1).executes_before("A"),
    ];
    let (cache, _, _) = cache_with(aspects);
    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);

    let result = cache.execute(&snapshot, &CancellationToken::new()).await;
    let error = result.unwrap_err();
    assert!(error.to_string().contains("cyclic ordering"));
    assert_eq!(cache.stats(&ProjectId::new("billing")).status, None);
}

#[tokio::test]
async fn end_session_tears_down_state() {
    let (cache, _, _) = cache_with(vec![simple_aspect("Audit", 0)]);
    let project = ProjectId::new("billing");
    let snapshot = snapshot_with("billing", &[("a.cs", "class A {}")], &[("logic.cs", "aspect v1")]);
    cache
        .execute(&snapshot, &CancellationToken::new())
        .await
        .unwrap();

    cache.end_session(&project);
    let stats = cache.stats(&project);
    assert_eq!(stats.configuration_builds, 0);
    assert_eq!(stats.status, None);
}
