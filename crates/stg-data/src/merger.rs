//! Merges per-file samples into one ordered, deduplicated [`Dataset`].

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use stg_core::error::{Result, StgError};
use stg_core::models::{Dataset, Sample, TargetDescriptor};
use stg_core::time_utils::seconds_between;
use tracing::debug;

use crate::reader::ParsedFile;

/// Merge parsed files into a dataset.
///
/// 1. Concatenate samples in file order and drop the uptime column.
/// 2. Drop exact `(timestamp, recv, send)` duplicates; rotated files overlap.
/// 3. Sort by timestamp.
/// 4. Derive each row's interval from its predecessor, then drop the first
///    row, whose byte counts cover an unknown span.
///
/// Two distinct samples sharing a timestamp leave a zero interval and fail
/// with [`StgError::DegenerateInterval`].
pub fn merge(
    target: TargetDescriptor,
    files: Vec<ParsedFile>,
    sources: Vec<PathBuf>,
) -> Result<Dataset> {
    let total: usize = files.iter().map(|f| f.samples.len()).sum();

    let mut seen: HashSet<(NaiveDateTime, u64, u64)> = HashSet::with_capacity(total);
    let mut rows: Vec<(NaiveDateTime, u64, u64)> = Vec::with_capacity(total);
    for file in files {
        for s in file.samples {
            let key = (s.timestamp, s.received_bytes, s.sent_bytes);
            if seen.insert(key) {
                rows.push(key);
            }
        }
    }
    let duplicates = total - rows.len();

    // Stable: equal timestamps keep file order.
    rows.sort_by_key(|&(ts, _, _)| ts);

    if rows.len() < 2 {
        return Err(StgError::InsufficientData(rows.len()));
    }

    let mut samples = Vec::with_capacity(rows.len() - 1);
    for pair in rows.windows(2) {
        let (prev_ts, _, _) = pair[0];
        let (ts, received_bytes, sent_bytes) = pair[1];
        let delta_time = seconds_between(prev_ts, ts);
        if delta_time <= 0.0 {
            return Err(StgError::DegenerateInterval { timestamp: ts });
        }
        samples.push(Sample {
            timestamp: ts,
            received_bytes,
            sent_bytes,
            delta_time,
        });
    }

    debug!(
        "Merged {} samples ({} duplicates removed, first row dropped) into {} rows",
        total,
        duplicates,
        samples.len()
    );

    Ok(Dataset::new(target, samples, sources))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
