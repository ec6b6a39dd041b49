//! CSV export and plot-ready series for aggregation results.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stg_core::error::{Result, StgError};
use stg_core::models::{AggregationResult, Granularity, TargetDescriptor};
use tracing::info;

use crate::summary::format_summary;

/// Timestamp layout of exported rows; the fraction is written only when present.
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ── CSV ───────────────────────────────────────────────────────────────────────

/// Serialise `result` as CSV.
///
/// Columns are `timestamp,delta_time,recv_<unit>,send_<unit>` with values
/// scaled to the request unit.
pub fn to_csv(result: &AggregationResult) -> Result<Vec<u8>> {
    let unit = result.unit();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "timestamp".to_string(),
        "delta_time".to_string(),
        format!("recv_{unit}"),
        format!("send_{unit}"),
    ])?;

    for (i, row) in result.rows.iter().enumerate() {
        writer.write_record([
            row.timestamp.format(EXPORT_TIMESTAMP_FORMAT).to_string(),
            row.delta_time.to_string(),
            result.received(i).to_string(),
            result.sent(i).to_string(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| StgError::Io(io::Error::other(e.to_string())))
}

/// File name of the CSV export, e.g. `192.168.0.1_5min.csv`.
pub fn output_file_name(target: &TargetDescriptor, granularity: Granularity) -> String {
    format!("{}_{}.csv", target.address(), granularity.label())
}

/// Write the CSV export into `dir` and return the full path.
pub fn write_csv(
    result: &AggregationResult,
    target: &TargetDescriptor,
    dir: &Path,
) -> Result<PathBuf> {
    let path = dir.join(output_file_name(target, result.request.granularity));
    let bytes = to_csv(result)?;
    write_file(&path, &bytes)?;
    info!("Wrote {} rows to {}", result.rows.len(), path.display());
    Ok(path)
}

// ── Plot series ───────────────────────────────────────────────────────────────

/// Vertical axis ceiling of a plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisScale {
    /// Let the renderer fit the data.
    #[default]
    Auto,
    /// Fixed ceiling in bits per second.
    Fixed(u64),
}

/// Everything a renderer needs to draw one throughput chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSeries {
    pub title: String,
    pub y_label: String,
    pub timestamps: Vec<String>,
    pub received: Vec<f64>,
    pub sent: Vec<f64>,
    /// Receive/send maximum lines shown under the chart.
    pub annotations: Vec<String>,
    /// Ceiling in the result unit; `None` to auto-scale.
    pub y_max: Option<u64>,
}

/// Build the chart data for `result`.
pub fn plot_series(
    result: &AggregationResult,
    target: &TargetDescriptor,
    axis: AxisScale,
) -> PlotSeries {
    let unit = result.unit();
    let (recv_line, send_line) = format_summary(result);

    PlotSeries {
        title: format!(
            "{} throughput ({})",
            target.address(),
            result.request.granularity.label()
        ),
        y_label: format!("Throughput [{unit}]"),
        timestamps: result
            .rows
            .iter()
            .map(|r| r.timestamp.format(EXPORT_TIMESTAMP_FORMAT).to_string())
            .collect(),
        received: (0..result.rows.len()).map(|i| result.received(i)).collect(),
        sent: (0..result.rows.len()).map(|i| result.sent(i)).collect(),
        annotations: vec![recv_line, send_line],
        y_max: match axis {
            AxisScale::Auto => None,
            AxisScale::Fixed(bps) => Some(bps / unit.divisor()),
        },
    }
}

/// Write `series` as pretty-printed JSON.
pub fn write_plot_json(series: &PlotSeries, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(series)?;
    write_file(path, &json)?;
    info!("Wrote plot series to {}", path.display());
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|source| StgError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
