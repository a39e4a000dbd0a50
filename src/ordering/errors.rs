use crate::error::WeaverError;

/// Errors produced while assigning layer ranks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    /// A cycle exists among the ordering edges. The implicated aspect
    /// classes are listed in traversal order. No partial rank assignment
    /// is produced.
    #[error("cyclic ordering among aspect classes: {}", classes.join(" -> "))]
    CycleDetected { classes: Vec<String> },

    /// An edge referenced a layer that is not part of the sorted set.
    #[error("ordering edge references unknown layer: {layer}")]
    UnknownLayer { layer: String },
}

impl From<OrderingError> for WeaverError {
    fn from(err: OrderingError) -> Self {
        WeaverError::OrderingConflict(err.to_string())
    }
}
