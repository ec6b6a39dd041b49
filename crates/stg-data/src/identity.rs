//! Checks that every file of a batch was captured from the same target.

use std::path::PathBuf;

use stg_core::error::{Result, StgError};
use stg_core::models::TargetDescriptor;
use tracing::debug;

/// Compare every descriptor against the first one.
///
/// Returns the shared descriptor, or [`StgError::InconsistentTarget`] naming
/// the first file whose header differs in any of the four fields.
pub fn validate_targets(headers: &[(PathBuf, TargetDescriptor)]) -> Result<TargetDescriptor> {
    let Some((first_path, baseline)) = headers.first() else {
        return Err(StgError::EmptyBatch);
    };

    for (path, target) in &headers[1..] {
        if target.fields() != baseline.fields() {
            return Err(StgError::InconsistentTarget {
                path: path.clone(),
                expected: baseline.to_string(),
                found: target.to_string(),
            });
        }
    }

    debug!(
        "{} file(s) share target {} (baseline {})",
        headers.len(),
        baseline.address(),
        first_path.display()
    );
    Ok(baseline.clone())
}
