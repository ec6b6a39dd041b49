//! The loaded dataset of one interactive session.
//!
//! A [`Session`] owns the most recently loaded [`Dataset`] together with the
//! paths it came from, so a front end can reload the same batch or re-run
//! aggregations without re-reading files. The last aggregation is cached and
//! returned as-is when the identical request is repeated.

use std::path::PathBuf;

use chrono::NaiveDate;
use stg_core::error::{Result, StgError};
use stg_core::models::{AggregationRequest, AggregationResult, Dataset, DatasetInfo};
use stg_data::aggregator::{aggregate, describe};
use stg_data::analysis::load_batch;

// ── Session ───────────────────────────────────────────────────────────────────

/// Dataset state shared by the load, reload and aggregate operations.
///
/// # Example
/// ```no_run
/// use std::path::PathBuf;
/// use stg_core::models::AggregationRequest;
/// use stg_runtime::session::Session;
///
/// let mut session = Session::new();
/// session.load(vec![PathBuf::from("traffic.csv")])?;
/// let result = session.aggregate(&AggregationRequest::default())?;
/// println!("{} rows", result.rows.len());
/// # Ok::<(), stg_core::StgError>(())
/// ```
#[derive(Debug, Default)]
pub struct Session {
    /// Files of the current batch, in the order given.
    paths: Vec<PathBuf>,
    /// Dataset of the last successful load.
    dataset: Option<Dataset>,
    /// Result of the last aggregation against `dataset`.
    cached: Option<AggregationResult>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Loading ───────────────────────────────────────────────────────────

    /// Load a new batch, replacing the current dataset.
    ///
    /// On failure the previous dataset stays in place.
    pub fn load(&mut self, paths: Vec<PathBuf>) -> Result<&Dataset> {
        match load_batch(&paths) {
            Ok(dataset) => Ok(self.install(paths, dataset)),
            Err(e) => {
                tracing::warn!(error = %e, "batch load failed; keeping previous dataset");
                Err(e)
            }
        }
    }

    /// Re-read the files of the current batch, picking up rows appended
    /// since the last load.
    pub fn reload(&mut self) -> Result<&Dataset> {
        if self.paths.is_empty() {
            return Err(StgError::EmptyBatch);
        }
        tracing::debug!(files = self.paths.len(), "reloading batch");
        let paths = self.paths.clone();
        self.load(paths)
    }

    /// Adopt a dataset loaded elsewhere, e.g. by a
    /// [`BatchLoader`](crate::loader::BatchLoader).
    pub fn install(&mut self, paths: Vec<PathBuf>, dataset: Dataset) -> &Dataset {
        self.paths = paths;
        self.cached = None;
        self.dataset.insert(dataset)
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Aggregate the current dataset, reusing the previous result when the
    /// request is unchanged.
    pub fn aggregate(&mut self, request: &AggregationRequest) -> Result<&AggregationResult> {
        let stale = !self
            .cached
            .as_ref()
            .is_some_and(|r| r.request == *request);

        if stale {
            let dataset = self.dataset.as_ref().ok_or(StgError::EmptyBatch)?;
            let result = aggregate(dataset, request)?;
            return Ok(self.cached.insert(result));
        }

        tracing::debug!("returning cached aggregation result");
        self.cached.as_ref().ok_or(StgError::EmptyBatch)
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Calendar dates available as range bounds; empty before the first load.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.dataset.as_ref().map(Dataset::dates).unwrap_or_default()
    }

    pub fn info(&self) -> Option<DatasetInfo> {
        self.dataset.as_ref().and_then(describe)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
