//! Ingestion and aggregation layer for STG throughput logs.
//!
//! Reads and validates rotation log files, merges them into one dataset,
//! resamples it into throughput rows and renders summaries and exports.

pub mod aggregator;
pub mod analysis;
pub mod export;
pub mod identity;
pub mod merger;
pub mod reader;
pub mod summary;

pub use stg_core as core;
