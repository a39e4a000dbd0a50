// Layer ordering for aspect classes
//
// Aspect classes contribute ordered chains of layers; constraint sources
// contribute "must precede" edges between layers. The sorter assigns each
// layer a deterministic execution rank consistent with every edge.

pub mod edges;
pub mod errors;
pub mod sorter;
pub mod types;

pub use edges::{
    DeclaredOrderEdgeSource, EdgeSource, InheritanceEdgeSource, IntraClassEdgeSource, OrderingEdge,
};
pub use errors::OrderingError;
pub use sorter::LayerSorter;
pub use types::{AspectClass, LayerId, RankedLayer, RankedLayers};
