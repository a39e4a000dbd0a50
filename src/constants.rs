//! # System Constants
//!
//! Core constants shared across the weaving pipeline: the rebuild marker
//! artifact name, lifecycle event names, and operational defaults.

/// File name of the rebuild-completion marker written by the external build
/// step into a project-scoped directory. Presence or update of this file is
/// the sole recovery signal for a stale pipeline configuration.
pub const REBUILD_MARKER_FILE: &str = "aspects.rebuilt";

/// Default debounce window for marker-file events, in milliseconds.
pub const DEFAULT_REBUILD_DEBOUNCE_MS: u64 = 500;

/// Default bound on concurrently transformed source units within one rank.
pub const DEFAULT_MAX_CONCURRENT_UNITS: usize = 8;

/// Default capacity of the lifecycle event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Lifecycle event names published through the [`crate::events::EventPublisher`].
pub mod events {
    /// A pipeline configuration was built or rebuilt.
    pub const CONFIGURATION_REBUILT: &str = "pipeline.configuration_rebuilt";
    /// The pipeline status changed (Ready <-> NeedsExternalRebuild).
    pub const STATUS_CHANGED: &str = "pipeline.status_changed";
    /// A pipeline execution committed its results.
    pub const EXECUTION_COMPLETED: &str = "pipeline.execution_completed";
    /// A project session was torn down.
    pub const SESSION_ENDED: &str = "pipeline.session_ended";
}
