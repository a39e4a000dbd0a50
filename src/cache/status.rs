use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline status for one project session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// The cached pipeline configuration is up to date with all
    /// aspect-logic source
    Ready,
    /// Aspect-logic source changed in a way that cannot be re-evaluated
    /// in-process; the last known-good configuration is served until an
    /// external rebuild completes
    NeedsExternalRebuild,
}

impl PipelineStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether results served under this status may lag the latest
    /// aspect-logic source
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::NeedsExternalRebuild)
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::NeedsExternalRebuild => write!(f, "needs_external_rebuild"),
        }
    }
}

impl std::str::FromStr for PipelineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "needs_external_rebuild" => Ok(Self::NeedsExternalRebuild),
            _ => Err(format!("Invalid pipeline status: {s}")),
        }
    }
}
