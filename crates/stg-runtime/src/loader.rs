//! Background batch loader.
//!
//! Runs [`load_batch_with_progress`] on tokio's blocking pool and forwards
//! every [`LoadProgress`] step through an `mpsc` channel, so an interactive
//! front end keeps handling input while large batches are parsed.

use std::path::PathBuf;

use stg_core::error::Result;
use stg_core::models::Dataset;
use stg_data::analysis::{load_batch_with_progress, LoadProgress};
use tokio::sync::mpsc;

// ── Public types ──────────────────────────────────────────────────────────────

/// A message from the background load.
#[derive(Debug)]
pub enum LoaderEvent {
    Progress(LoadProgress),
    /// Always the last event of a load.
    Finished(Result<Dataset>),
}

// ── BatchLoader ───────────────────────────────────────────────────────────────

/// Loads one batch of log files off the calling task.
pub struct BatchLoader {
    paths: Vec<PathBuf>,
}

impl BatchLoader {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Start the load.
    ///
    /// Returns the event receiver and a [`LoaderHandle`] for the blocking
    /// task. The receiver yields any number of
    /// [`LoaderEvent::Progress`] events followed by exactly one
    /// [`LoaderEvent::Finished`].
    pub fn start(self) -> (mpsc::Receiver<LoaderEvent>, LoaderHandle) {
        let (tx, rx) = mpsc::channel(32);

        let handle = tokio::task::spawn_blocking(move || {
            let progress_tx = tx.clone();
            let report = move |step: LoadProgress| {
                if progress_tx.blocking_send(LoaderEvent::Progress(step)).is_err() {
                    tracing::debug!("loader receiver dropped; progress discarded");
                }
            };

            let result = load_batch_with_progress(&self.paths, &report);
            if let Err(e) = &result {
                tracing::debug!(error = %e, "background load failed");
            }
            if tx.blocking_send(LoaderEvent::Finished(result)).is_err() {
                tracing::warn!("loader receiver dropped before the load finished");
            }
        });

        (rx, LoaderHandle { handle })
    }
}

// ── LoaderHandle ──────────────────────────────────────────────────────────────

/// Handle to a running background load.
pub struct LoaderHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl LoaderHandle {
    /// `true` once the blocking task has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the blocking task to return.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "loader task did not complete");
        }
    }
}

/// Drain `rx` until the final event and return the load result.
///
/// `on_progress` sees every progress step in arrival order. Returns `None`
/// if the loader stopped without reporting a result.
pub async fn wait_for_dataset(
    rx: &mut mpsc::Receiver<LoaderEvent>,
    mut on_progress: impl FnMut(&LoadProgress),
) -> Option<Result<Dataset>> {
    while let Some(event) = rx.recv().await {
        match event {
            LoaderEvent::Progress(step) => on_progress(&step),
            LoaderEvent::Finished(result) => return Some(result),
        }
    }
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────
