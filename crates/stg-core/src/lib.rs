//! Shared types for the STG throughput pipeline.
//!
//! Holds the error taxonomy, the data model (samples, datasets, closed unit
//! and granularity enums, aggregation requests and results), number and
//! timestamp helpers, and the command-line settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{Result, StgError};
