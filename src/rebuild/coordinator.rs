//! # External Rebuild Coordinator
//!
//! ## Overview
//!
//! Watches a project-scoped marker artifact written by an external build
//! step and, on observation, invokes the NeedsExternalRebuild→Ready
//! transition on the pipeline cache exactly once per signal burst, even
//! when several marker updates arrive in quick succession.
//!
//! ## Architecture
//!
//! A background tokio task receives [`notify`] events over an mpsc channel,
//! debounces them, and calls into the cache. The cache applies the
//! transition under the same per-project gate as the query path, so status
//! is never torn. The coordinator never fires speculatively: only marker
//! events schedule the transition, and entering NeedsExternalRebuild
//! produces no marker.
//!
//! ## Missing marker directory
//!
//! The marker directory may not exist when watching starts. The watch is
//! established on the nearest existing ancestor (recursively), so a marker
//! created together with its directory is still observed and the first
//! signal is never permanently missed.

use crate::cache::pipeline_cache::PipelineCache;
use crate::error::WeaverError;
use crate::model::snapshot::ProjectId;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Configuration for one project's rebuild watch
#[derive(Debug, Clone)]
pub struct RebuildCoordinatorConfig {
    /// Project-scoped directory the external build writes the marker into
    pub marker_directory: PathBuf,
    /// Marker file name within the directory
    pub marker_file_name: String,
    /// Debounce window for marker-event bursts
    pub debounce: Duration,
}

impl RebuildCoordinatorConfig {
    pub fn new(marker_directory: impl Into<PathBuf>, weaver: &crate::config::WeaverConfig) -> Self {
        Self {
            marker_directory: marker_directory.into(),
            marker_file_name: weaver.rebuild_marker_file.clone(),
            debounce: Duration::from_millis(weaver.rebuild_debounce_ms),
        }
    }

    fn marker_path(&self) -> PathBuf {
        self.marker_directory.join(&self.marker_file_name)
    }
}

/// Handle to a running rebuild watch. Drop to stop watching.
pub struct RebuildWatcherHandle {
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl RebuildWatcherHandle {
    /// Stop the watch gracefully.
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RebuildWatcherHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub struct RebuildCoordinator;

impl RebuildCoordinator {
    /// Start watching for rebuild-completion markers for `project`.
    ///
    /// The returned handle stops the watch when dropped.
    pub fn start(
        config: RebuildCoordinatorConfig,
        cache: Arc<PipelineCache>,
        project: ProjectId,
    ) -> Result<RebuildWatcherHandle, WeaverError> {
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        let (event_tx, mut event_rx) = mpsc::channel::<Event>(100);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = event_tx.blocking_send(event);
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| WeaverError::WatchError(e.to_string()))?;

        let watch_root = nearest_existing_ancestor(&config.marker_directory);
        watcher
            .watch(&watch_root, RecursiveMode::Recursive)
            .map_err(|e| WeaverError::WatchError(e.to_string()))?;
        debug!(
            %project,
            watch_root = %watch_root.display(),
            marker = %config.marker_path().display(),
            "Watching for rebuild-completion marker"
        );

        let marker_path = config.marker_path();
        let debounce = config.debounce;
        tokio::spawn(async move {
            // The OS watcher stops when dropped; keep it inside the task.
            let _watcher = watcher;
            let mut pending = false;
            let mut deadline = tokio::time::Instant::now();

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!(%project, "Rebuild watch shut down");
                        break;
                    }
                    maybe_event = event_rx.recv() => {
                        match maybe_event {
                            Some(event) if is_marker_event(&event, &marker_path) => {
                                // Debounced to the latest signal in a burst.
                                pending = true;
                                deadline = tokio::time::Instant::now() + debounce;
                            }
                            Some(_) => {}
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep_until(deadline), if pending => {
                        pending = false;
                        match cache.on_rebuild_completed(&project).await {
                            Ok(true) => {
                                info!(%project, "Rebuild-completion marker absorbed");
                            }
                            Ok(false) => {
                                debug!(%project, "Rebuild-completion marker observed with nothing to recover");
                            }
                            Err(error) => {
                                warn!(%project, %error, "Failed to absorb rebuild-completion marker");
                            }
                        }
                    }
                }
            }
        });

        Ok(RebuildWatcherHandle {
            shutdown_tx: Some(shutdown_tx),
        })
    }
}

fn is_marker_event(event: &Event, marker_path: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p == marker_path)
}

/// First existing ancestor of `path`, including `path` itself
fn nearest_existing_ancestor(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        if ancestor.exists() {
            return ancestor.to_path_buf();
        }
    }
    PathBuf::from(".")
}
