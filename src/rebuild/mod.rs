// External rebuild coordination
//
// Recovery from NeedsExternalRebuild is driven by a filesystem marker
// written by an out-of-process build step; the coordinator watches for it
// and fires the recovery transition exactly once per signal burst.

pub mod coordinator;

pub use coordinator::{RebuildCoordinator, RebuildCoordinatorConfig, RebuildWatcherHandle};
