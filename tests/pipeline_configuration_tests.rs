//! Configuration construction: compiled aspects flow through edge sources
//! and the sorter into a ranked, rule-bearing artifact.

mod common;

use common::{snapshot_with, StubCompiler};
use weaver_core::ordering::{AspectClass, LayerId};
use weaver_core::pipeline::{LogicRegistry, PipelineConfiguration};

#[tokio::test]
async fn chain_shift_matches_declared_order() {
    // A (one extra layer) before B (one extra layer):
    // A=0, A:1=1, B=2, B:1=3
    let compiler = StubCompiler::new(vec![
        AspectClass::new("A", 0).with_layer("L1").executes_before("B"),
        AspectClass::new("B", 1).with_layer("L1"),
    ]);
    let snapshot = snapshot_with("p", &[], &[("logic.cs", "v1")]);

    let configuration = PipelineConfiguration::build(compiler.as_ref(), &LogicRegistry::new(), &snapshot)
        .await
        .unwrap();
    let ranked = &configuration.ranked_layers;

    assert_eq!(ranked.rank_of(&LayerId::new("A", 0)), Some(0));
    assert_eq!(ranked.rank_of(&LayerId::new("A", 1)), Some(1));
    assert_eq!(ranked.rank_of(&LayerId::new("B", 0)), Some(2));
    assert_eq!(ranked.rank_of(&LayerId::new("B", 1)), Some(3));
    assert_eq!(ranked.max_rank(), Some(3));
}

#[tokio::test]
async fn logic_basis_records_compiled_fingerprints() {
    let compiler = StubCompiler::new(vec![AspectClass::new("Audit", 0)]);
    let snapshot = snapshot_with(
        "p",
        &[("a.cs", "ordinary")],
        &[("logic_a.cs", "v1"), ("logic_b.cs", "v1")],
    );

    let configuration = PipelineConfiguration::build(compiler.as_ref(), &LogicRegistry::new(), &snapshot)
        .await
        .unwrap();

    assert_eq!(configuration.logic_basis.len(), 2);
    assert!(configuration
        .logic_basis
        .contains_key(&weaver_core::model::SourceUnitId::new("logic_a.cs")));

    // Same logic content matches; edited content does not.
    let same = snapshot_with(
        "p",
        &[("a.cs", "edited ordinary")],
        &[("logic_a.cs", "v1"), ("logic_b.cs", "v1")],
    );
    let observed = weaver_core::cache::FingerprintSet::of_snapshot(&same).logic;
    assert!(configuration.matches_logic(&observed));

    let edited = snapshot_with("p", &[], &[("logic_a.cs", "v2"), ("logic_b.cs", "v1")]);
    let observed = weaver_core::cache::FingerprintSet::of_snapshot(&edited).logic;
    assert!(!configuration.matches_logic(&observed));
}

#[tokio::test]
async fn unrelated_aspects_share_every_rank_index() {
    let compiler = StubCompiler::new(vec![
        AspectClass::new("Log", 0).with_layer("Flush"),
        AspectClass::new("Cache", 1).with_layer("Evict"),
    ]);
    let snapshot = snapshot_with("p", &[], &[("logic.cs", "v1")]);

    let configuration = PipelineConfiguration::build(compiler.as_ref(), &LogicRegistry::new(), &snapshot)
        .await
        .unwrap();
    let ranked = &configuration.ranked_layers;

    for index in 0..2u16 {
        assert_eq!(
            ranked.rank_of(&LayerId::new("Log", index)),
            ranked.rank_of(&LayerId::new("Cache", index)),
        );
    }
}
