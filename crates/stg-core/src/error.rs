use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// All errors produced by the STG log pipeline.
#[derive(Error, Debug)]
pub enum StgError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An export could not be written to disk.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The first line of a log file is not valid UTF-8.
    #[error("Header line is not valid UTF-8: {path}")]
    Encoding { path: PathBuf },

    /// A log file does not have the STG layout.
    #[error("Not an STG CSV file {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// A sample date string did not match any recognised layout.
    #[error("Invalid timestamp \"{value}\" in {path}")]
    Timestamp { path: PathBuf, value: String },

    /// A file in the batch was captured from a different target.
    #[error("Target information in {path} does not match: expected [{expected}], found [{found}]")]
    InconsistentTarget {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// No files were given to a batch load.
    #[error("No log files given")]
    EmptyBatch,

    /// The batch does not contain enough samples to derive an interval.
    #[error("At least two unique samples are required, found {0}")]
    InsufficientData(usize),

    /// A sample interval is zero or negative.
    #[error("Degenerate sampling interval at {timestamp}")]
    DegenerateInterval { timestamp: NaiveDateTime },

    /// An aggregation date range selected no rows.
    #[error("No samples between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    /// A unit key is not one of the recognised units.
    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    /// A granularity key is not one of the recognised averaging intervals.
    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    /// A date-range bound is not a calendar date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The CSV writer failed.
    #[error("Failed to write CSV: {0}")]
    CsvWrite(#[from] csv::Error),

    /// A JSON document could not be produced or parsed.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the STG crates.
pub type Result<T> = std::result::Result<T, StgError>;
