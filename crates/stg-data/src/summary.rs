//! Human-readable summary lines for aggregation results and datasets.

use stg_core::formatting::{format_number, format_throughput, format_timestamp};
use stg_core::models::{AggregationResult, DatasetInfo, Extremum, TargetDescriptor, Unit};

/// Receive and send maxima as two aligned lines.
///
/// ```text
/// Recv MAX: 12.346 Mbps (2020-08-01 12:00:10)
/// Send MAX:  1.000 Mbps (2020-08-01 12:00:20)
/// ```
///
/// Both values are right-aligned to the width of the longer one.
pub fn format_summary(result: &AggregationResult) -> (String, String) {
    let unit = result.unit();
    let recv = format_throughput(result.receive_max.value, unit);
    let send = format_throughput(result.send_max.value, unit);
    let width = recv.chars().count().max(send.chars().count());

    (
        summary_line("Recv MAX:", &recv, width, unit, &result.receive_max),
        summary_line("Send MAX:", &send, width, unit, &result.send_max),
    )
}

/// Lines describing a freshly loaded dataset.
pub fn format_dataset_info(info: &DatasetInfo) -> Vec<String> {
    vec![
        format!("Start:    {}", format_timestamp(info.start)),
        format!("End:      {}", format_timestamp(info.end)),
        format!(
            "Interval: {} ~ {} s",
            format_number(info.min_interval, 2),
            format_number(info.max_interval, 2)
        ),
        format!("Rows:     {}", format_number(info.rows as f64, 0)),
        format!(
            "Recv MAX: {} {}",
            format_throughput(info.receive_max_bps as f64, Unit::Bps),
            Unit::Bps
        ),
        format!(
            "Send MAX: {} {}",
            format_throughput(info.send_max_bps as f64, Unit::Bps),
            Unit::Bps
        ),
    ]
}

/// The four header fields of the target, one per line.
pub fn format_target(target: &TargetDescriptor) -> Vec<String> {
    target.fields().to_vec()
}

fn summary_line(label: &str, value: &str, width: usize, unit: Unit, max: &Extremum) -> String {
    format!(
        "{} {:>width$} {} ({})",
        label,
        value,
        unit,
        format_timestamp(max.timestamp),
        width = width
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
