//! Runtime layer for the STG throughput tools.
//!
//! Holds the per-session dataset state and runs batch loads in the background
//! so front ends are not blocked while files are parsed.

pub mod loader;
pub mod session;

pub use stg_core as core;
pub use stg_data as data;
