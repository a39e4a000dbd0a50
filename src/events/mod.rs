// Lifecycle event system for the weaving pipeline
//
// Hosts subscribe to observe configuration rebuilds, status transitions and
// committed executions without polling the cache.

pub mod publisher;

pub use publisher::{EventPublisher, PublishError, PublishedEvent};
