//! # Ordering Edge Sources
//!
//! Edges are "must precede" relationships between layers. They come from
//! three places: the implicit chain inside every aspect class, explicit
//! before/after declarations between classes, and constraints a derived
//! class inherits from its base. Each source is a separate implementation
//! of [`EdgeSource`] so the sorter consumes their union uniformly.

use crate::ordering::types::{AspectClass, LayerId};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A "from must precede to" relationship between two layers.
/// Duplicate edges are idempotent; the sorter deduplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderingEdge {
    pub from: LayerId,
    pub to: LayerId,
}

impl OrderingEdge {
    pub fn new(from: LayerId, to: LayerId) -> Self {
        Self { from, to }
    }
}

/// Produces ordering edges for a set of aspect classes
pub trait EdgeSource: Send + Sync {
    /// Emit all edges this source derives from the given classes
    fn edges(&self, aspects: &[AspectClass]) -> Vec<OrderingEdge>;

    /// Source name for diagnostics
    fn source_name(&self) -> &'static str;
}

/// Implicit intra-class chain: layer i precedes layer i+1 of the same class
pub struct IntraClassEdgeSource;

impl EdgeSource for IntraClassEdgeSource {
    fn edges(&self, aspects: &[AspectClass]) -> Vec<OrderingEdge> {
        let mut edges = Vec::new();
        for aspect in aspects {
            for index in 0..aspect.layer_count().saturating_sub(1) {
                edges.push(OrderingEdge::new(
                    LayerId::new(aspect.name.clone(), index),
                    LayerId::new(aspect.name.clone(), index + 1),
                ));
            }
        }
        edges
    }

    fn source_name(&self) -> &'static str {
        "intra_class"
    }
}

/// Explicit before/after declarations between classes. "A precedes B" becomes
/// an edge from the last layer of A's chain to the first layer of B's chain,
/// which shifts B's entire chain past the end of A's.
pub struct DeclaredOrderEdgeSource;

impl DeclaredOrderEdgeSource {
    fn chain_edge(
        preceding: &AspectClass,
        following: &AspectClass,
    ) -> OrderingEdge {
        OrderingEdge::new(preceding.last_layer(), following.first_layer())
    }
}

impl EdgeSource for DeclaredOrderEdgeSource {
    fn edges(&self, aspects: &[AspectClass]) -> Vec<OrderingEdge> {
        let by_name: HashMap<&str, &AspectClass> =
            aspects.iter().map(|a| (a.name.as_str(), a)).collect();
        let mut edges = Vec::new();

        for aspect in aspects {
            for other_name in &aspect.before {
                match by_name.get(other_name.as_str()) {
                    Some(other) => edges.push(Self::chain_edge(aspect, other)),
                    None => warn!(
                        aspect = %aspect.name,
                        references = %other_name,
                        "ordering declaration references unknown aspect class"
                    ),
                }
            }
            for other_name in &aspect.after {
                match by_name.get(other_name.as_str()) {
                    Some(other) => edges.push(Self::chain_edge(other, aspect)),
                    None => warn!(
                        aspect = %aspect.name,
                        references = %other_name,
                        "ordering declaration references unknown aspect class"
                    ),
                }
            }
        }
        edges
    }

    fn source_name(&self) -> &'static str {
        "declared_order"
    }
}

/// Inheritance-derived constraints. A derived class inherits its base's
/// declared before/after relationships but remains unordered relative to the
/// base itself unless declared otherwise.
pub struct InheritanceEdgeSource;

impl EdgeSource for InheritanceEdgeSource {
    fn edges(&self, aspects: &[AspectClass]) -> Vec<OrderingEdge> {
        let by_name: HashMap<&str, &AspectClass> =
            aspects.iter().map(|a| (a.name.as_str(), a)).collect();
        let mut edges = Vec::new();

        for aspect in aspects {
            let mut seen: HashSet<&str> = HashSet::new();
            seen.insert(aspect.name.as_str());
            let mut current = aspect.base.as_deref();

            while let Some(base_name) = current {
                if !seen.insert(base_name) {
                    // Base chain loops back on itself; stop walking.
                    break;
                }
                let Some(base) = by_name.get(base_name) else {
                    break;
                };

                for other_name in &base.before {
                    if let Some(other) = by_name.get(other_name.as_str()) {
                        if other.name != aspect.name {
                            edges.push(OrderingEdge::new(
                                aspect.last_layer(),
                                other.first_layer(),
                            ));
                        }
                    }
                }
                for other_name in &base.after {
                    if let Some(other) = by_name.get(other_name.as_str()) {
                        if other.name != aspect.name {
                            edges.push(OrderingEdge::new(
                                other.last_layer(),
                                aspect.first_layer(),
                            ));
                        }
                    }
                }

                current = base.base.as_deref();
            }
        }
        edges
    }

    fn source_name(&self) -> &'static str {
        "inheritance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intra_class_chains_layers() {
        let aspects = vec![AspectClass::new("Cache", 0)
            .with_layer("Validate")
            .with_layer("Apply")];
        let edges = IntraClassEdgeSource.edges(&aspects);
        assert_eq!(
            edges,
            vec![
                OrderingEdge::new(LayerId::new("Cache", 0), LayerId::new("Cache", 1)),
                OrderingEdge::new(LayerId::new("Cache", 1), LayerId::new("Cache", 2)),
            ]
        );
    }

    #[test]
    fn declared_order_links_chain_ends() {
        let aspects = vec![
            AspectClass::new("Log", 0).executes_before("Retry"),
            AspectClass::new("Retry", 1).with_layer("Backoff"),
        ];
        let edges = DeclaredOrderEdgeSource.edges(&aspects);
        assert_eq!(
            edges,
            vec![OrderingEdge::new(
                LayerId::new("Log", 0),
                LayerId::new("Retry", 0)
            )]
        );
    }

    #[test]
    fn unknown_reference_is_skipped() {
        let aspects = vec![AspectClass::new("Log", 0).executes_before("Missing")];
        assert!(DeclaredOrderEdgeSource.edges(&aspects).is_empty());
    }

    #[test]
    fn derived_inherits_base_constraints_but_not_base_ordering() {
        let aspects = vec![
            AspectClass::new("Base", 0).executes_before("Other"),
            AspectClass::new("Other", 1),
            AspectClass::new("Derived", 2).with_base("Base"),
        ];
        let edges = InheritanceEdgeSource.edges(&aspects);
        // Derived precedes Other (inherited), but no edge between Derived and Base.
        assert_eq!(
            edges,
            vec![OrderingEdge::new(
                LayerId::new("Derived", 0),
                LayerId::new("Other", 0)
            )]
        );
    }
}
