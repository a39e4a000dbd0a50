//! Proptest strategies for ordering properties.

use proptest::prelude::*;
use weaver_core::ordering::AspectClass;

/// Strategy for generating aspect sets whose declared order edges only point
/// from lower to higher declaration index, guaranteeing acyclic input
pub fn acyclic_aspect_set_strategy() -> impl Strategy<Value = Vec<AspectClass>> {
    (2usize..=6).prop_flat_map(|count| {
        let edges = prop::collection::vec(
            (0..count, 0..count).prop_filter("forward edges only", |(from, to)| from < to),
            0..10,
        );
        let extra_layers = prop::collection::vec(0usize..3, count);
        (Just(count), edges, extra_layers).prop_map(|(count, edges, extra_layers)| {
            build_aspects(count, &edges, &extra_layers)
        })
    })
}

/// Strategy for aspect sets with one deliberate back edge closing a cycle
pub fn cyclic_aspect_set_strategy() -> impl Strategy<Value = Vec<AspectClass>> {
    (2usize..=5).prop_flat_map(|count| {
        let extra_layers = prop::collection::vec(0usize..2, count);
        extra_layers.prop_map(move |extra_layers| {
            // Chain 0 -> 1 -> ... -> n-1, then n-1 -> 0 closes the cycle.
            let mut edges: Vec<(usize, usize)> =
                (0..count - 1).map(|i| (i, i + 1)).collect();
            edges.push((count - 1, 0));
            build_aspects(count, &edges, &extra_layers)
        })
    })
}

fn build_aspects(
    count: usize,
    edges: &[(usize, usize)],
    extra_layers: &[usize],
) -> Vec<AspectClass> {
    let mut before: Vec<Vec<String>> = vec![Vec::new(); count];
    for &(from, to) in edges {
        before[from].push(format!("Aspect{to}"));
    }
    (0..count)
        .map(|i| {
            let mut aspect = AspectClass::new(format!("Aspect{i}"), i as u32);
            for layer in 0..extra_layers[i] {
                aspect = aspect.with_layer(format!("Stage{layer}"));
            }
            for target in &before[i] {
                aspect = aspect.executes_before(target.clone());
            }
            aspect
        })
        .collect()
}

/// All declared (preceding, following) aspect-name pairs of a set
pub fn declared_order_pairs(aspects: &[AspectClass]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for aspect in aspects {
        for other in &aspect.before {
            pairs.push((aspect.name.clone(), other.clone()));
        }
        for other in &aspect.after {
            pairs.push((other.clone(), aspect.name.clone()));
        }
    }
    pairs
}
