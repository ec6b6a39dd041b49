//! Batch-load pipeline.
//!
//! Validates the identity line of every file before any body is parsed, then
//! parses bodies in parallel and merges them into a single [`Dataset`].
//! Any failure aborts the whole batch; callers never see a partial dataset.

use std::path::PathBuf;

use rayon::prelude::*;
use stg_core::error::{Result, StgError};
use stg_core::models::{Dataset, TargetDescriptor};
use tracing::info;

use crate::identity::validate_targets;
use crate::merger::merge;
use crate::reader::{parse_file, parse_header, ParsedFile};

// ── Public types ──────────────────────────────────────────────────────────────

/// Progress notifications emitted while a batch loads.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadProgress {
    /// All identity lines were read and agree on one target.
    HeadersValidated {
        files: usize,
        target: TargetDescriptor,
    },
    /// One file body was parsed. Files may finish in any order.
    FileParsed {
        index: usize,
        total: usize,
        path: PathBuf,
        samples: usize,
    },
    /// The merged dataset is ready.
    Merged { rows: usize },
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Load, validate and merge a batch of STG log files.
pub fn load_batch(paths: &[PathBuf]) -> Result<Dataset> {
    load_batch_with_progress(paths, &|_: LoadProgress| {})
}

/// Same as [`load_batch`], reporting each stage through `progress`.
///
/// `progress` may be called from worker threads.
pub fn load_batch_with_progress(
    paths: &[PathBuf],
    progress: &(dyn Fn(LoadProgress) + Sync),
) -> Result<Dataset> {
    if paths.is_empty() {
        return Err(StgError::EmptyBatch);
    }

    // ── Step 1: Identity lines ────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let headers = paths
        .iter()
        .map(|p| parse_header(p).map(|t| (p.clone(), t)))
        .collect::<Result<Vec<_>>>()?;
    let target = validate_targets(&headers)?;
    progress(LoadProgress::HeadersValidated {
        files: paths.len(),
        target: target.clone(),
    });

    // ── Step 2: Bodies ────────────────────────────────────────────────────────
    let total = paths.len();
    let parsed: Vec<Result<ParsedFile>> = paths
        .par_iter()
        .enumerate()
        .map(|(index, path)| {
            let file = parse_file(path)?;
            progress(LoadProgress::FileParsed {
                index,
                total,
                path: path.clone(),
                samples: file.samples.len(),
            });
            Ok(file)
        })
        .collect();
    // Report the first failure in input order.
    let files = parsed.into_iter().collect::<Result<Vec<_>>>()?;

    // A file may have been rotated between the header pass and now.
    if let Some(changed) = files.iter().find(|f| f.target != target) {
        return Err(StgError::InconsistentTarget {
            path: changed.path.clone(),
            expected: target.to_string(),
            found: changed.target.to_string(),
        });
    }
    let raw_samples: usize = files.iter().map(|f| f.samples.len()).sum();
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 3: Merge ─────────────────────────────────────────────────────────
    let merge_start = std::time::Instant::now();
    let dataset = merge(target, files, paths.to_vec())?;
    let merge_time = merge_start.elapsed().as_secs_f64();

    progress(LoadProgress::Merged {
        rows: dataset.len(),
    });
    info!(
        "Loaded {} file(s) for {}: {} samples read in {:.3}s, {} rows after merge in {:.3}s",
        total,
        dataset.target().address(),
        raw_samples,
        load_time,
        dataset.len(),
        merge_time
    );

    Ok(dataset)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
