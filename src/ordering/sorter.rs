//! # Layer Sorter
//!
//! Assigns every layer a deterministic execution rank consistent with all
//! "must precede" edges.
//!
//! ## Overview
//!
//! The sorter builds a directed graph over the full layer set from the union
//! of edges of every [`EdgeSource`], rejects cycles as ordering conflicts,
//! and assigns each layer's rank as the length of the longest path ending at
//! it from any layer with no predecessors. This is a leveled assignment, not
//! a plain topological sort: layers with no declared relative order share a
//! rank instead of receiving an arbitrary one.
//!
//! ## Determinism
//!
//! Identical input graphs always produce identical output. Equal-rank layers
//! are tie-broken by aspect declaration order, then aspect name, then
//! intra-class index, so diagnostics and test output are reproducible across
//! runs and thread schedules.

use crate::ordering::edges::EdgeSource;
use crate::ordering::errors::OrderingError;
use crate::ordering::types::{AspectClass, LayerId, RankedLayer, RankedLayers};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

pub struct LayerSorter;

impl LayerSorter {
    /// Sort the layers of `aspects` using the union of edges from `sources`.
    ///
    /// Returns a rank per layer such that every edge (A precedes B)
    /// satisfies rank(A) < rank(B), or an [`OrderingError`] naming the
    /// implicated classes when the edges form a cycle.
    pub fn sort(
        aspects: &[AspectClass],
        sources: &[&dyn EdgeSource],
    ) -> Result<RankedLayers, OrderingError> {
        // Layer nodes in declaration order; index-based adjacency.
        let mut layers: Vec<LayerId> = Vec::new();
        let mut declaration_order: Vec<u32> = Vec::new();
        for aspect in aspects {
            for layer in aspect.layer_ids() {
                layers.push(layer);
                declaration_order.push(aspect.declaration_order);
            }
        }
        let index_of: HashMap<&LayerId, usize> =
            layers.iter().enumerate().map(|(i, l)| (l, i)).collect();
        let total = layers.len();

        // Union of edges from every source, deduplicated.
        let mut edge_set: HashSet<(usize, usize)> = HashSet::new();
        for source in sources {
            for edge in source.edges(aspects) {
                let from = *index_of.get(&edge.from).ok_or_else(|| {
                    OrderingError::UnknownLayer {
                        layer: edge.from.to_string(),
                    }
                })?;
                let to = *index_of.get(&edge.to).ok_or_else(|| {
                    OrderingError::UnknownLayer {
                        layer: edge.to.to_string(),
                    }
                })?;
                edge_set.insert((from, to));
            }
        }

        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); total];
        let mut in_degree: Vec<usize> = vec![0; total];
        for &(from, to) in &edge_set {
            successors[from].push(to);
            in_degree[to] += 1;
        }
        // Deterministic traversal regardless of HashSet iteration order.
        for succ in &mut successors {
            succ.sort_unstable();
        }

        Self::detect_cycle(&layers, &successors)?;

        // Longest-path level assignment, seeded from nodes with no
        // predecessors (Kahn order guarantees predecessors are final).
        let mut ranks: Vec<u32> = vec![0; total];
        let mut degree = in_degree.clone();
        let mut queue: VecDeque<usize> =
            (0..total).filter(|&i| degree[i] == 0).collect();
        while let Some(node) = queue.pop_front() {
            for &next in &successors[node] {
                if ranks[node] + 1 > ranks[next] {
                    ranks[next] = ranks[node] + 1;
                }
                degree[next] -= 1;
                if degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        let mut ranked: Vec<RankedLayer> = layers
            .into_iter()
            .enumerate()
            .map(|(i, layer)| RankedLayer {
                layer,
                rank: ranks[i],
            })
            .collect();
        let order_by_layer: HashMap<LayerId, u32> = ranked
            .iter()
            .enumerate()
            .map(|(i, l)| (l.layer.clone(), declaration_order[i]))
            .collect();
        ranked.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| order_by_layer[&a.layer].cmp(&order_by_layer[&b.layer]))
                .then_with(|| a.layer.aspect.cmp(&b.layer.aspect))
                .then_with(|| a.layer.index.cmp(&b.layer.index))
        });

        debug!(
            layers = ranked.len(),
            edges = edge_set.len(),
            max_rank = ranked.iter().map(|l| l.rank).max().unwrap_or(0),
            "Assigned layer ranks"
        );

        Ok(RankedLayers::new(ranked))
    }

    /// Depth-first cycle detection with an explicit recursion stack.
    /// A back edge to a gray node is reported as an ordering conflict
    /// listing the implicated aspect classes along the cycle.
    fn detect_cycle(
        layers: &[LayerId],
        successors: &[Vec<usize>],
    ) -> Result<(), OrderingError> {
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;

        let total = layers.len();
        let mut color = vec![WHITE; total];

        for start in 0..total {
            if color[start] != WHITE {
                continue;
            }
            // (node, next successor position) frames
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = GRAY;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                if frame.1 < successors[node].len() {
                    let next = successors[node][frame.1];
                    frame.1 += 1;
                    match color[next] {
                        WHITE => {
                            color[next] = GRAY;
                            stack.push((next, 0));
                        }
                        GRAY => {
                            // Found a cycle: everything from `next` on the
                            // stack participates.
                            let cycle_start = stack
                                .iter()
                                .position(|&(n, _)| n == next)
                                .unwrap_or(0);
                            let mut classes: Vec<String> = stack[cycle_start..]
                                .iter()
                                .map(|&(n, _)| layers[n].aspect.clone())
                                .collect();
                            classes.push(layers[next].aspect.clone());
                            classes.dedup();
                            return Err(OrderingError::CycleDetected { classes });
                        }
                        _ => {}
                    }
                } else {
                    color[node] = BLACK;
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}
