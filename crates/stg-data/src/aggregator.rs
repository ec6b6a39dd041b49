//! Resampling and throughput computation over a loaded [`Dataset`].
//!
//! Everything here is a pure function of its inputs; the same request against
//! the same dataset always yields an identical result.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use stg_core::error::{Result, StgError};
use stg_core::models::{
    AggregationRequest, AggregationResult, Dataset, DatasetInfo, Extremum, Granularity, Sample,
    ThroughputRow, Unit,
};
use stg_core::time_utils::floor_to_bucket;
use tracing::debug;

// ── Public API ────────────────────────────────────────────────────────────────

/// Resample, filter and convert `dataset` as described by `request`.
pub fn aggregate(dataset: &Dataset, request: &AggregationRequest) -> Result<AggregationResult> {
    let resampled = resample(dataset.samples(), request.granularity);

    let selected: Vec<&Sample> = match &request.range {
        Some(range) => resampled
            .iter()
            .filter(|s| range.contains(s.timestamp))
            .collect(),
        None => resampled.iter().collect(),
    };

    if selected.is_empty() {
        return Err(match request.range {
            Some(range) => StgError::EmptyRange {
                start: range.start,
                end: range.end,
            },
            None => StgError::InsufficientData(0),
        });
    }

    let rows = selected
        .into_iter()
        .map(to_throughput_row)
        .collect::<Result<Vec<_>>>()?;

    // `rows` is non-empty, so both maxima exist.
    let receive_max = find_max(&rows, request.unit, |r| r.received_bps);
    let send_max = find_max(&rows, request.unit, |r| r.sent_bps);

    debug!(
        "Aggregated {} samples at {} into {} rows",
        dataset.len(),
        request.granularity,
        rows.len()
    );

    Ok(AggregationResult {
        request: *request,
        rows,
        receive_max,
        send_max,
    })
}

/// Sum samples into fixed-width buckets aligned to wall-clock boundaries.
///
/// Each bucket carries the summed bytes and intervals of its samples and is
/// stamped with its start time. Buckets without samples are omitted. `Raw`
/// returns the samples unchanged.
pub fn resample(samples: &[Sample], granularity: Granularity) -> Vec<Sample> {
    let Some(width) = granularity.bucket_seconds() else {
        return samples.to_vec();
    };

    let mut buckets: BTreeMap<NaiveDateTime, Sample> = BTreeMap::new();
    for s in samples {
        let start = floor_to_bucket(s.timestamp, width);
        let bucket = buckets.entry(start).or_insert_with(|| Sample {
            timestamp: start,
            received_bytes: 0,
            sent_bytes: 0,
            delta_time: 0.0,
        });
        // Counter deltas near u64::MAX pin the bucket instead of wrapping.
        bucket.received_bytes = bucket.received_bytes.saturating_add(s.received_bytes);
        bucket.sent_bytes = bucket.sent_bytes.saturating_add(s.sent_bytes);
        bucket.delta_time += s.delta_time;
    }

    buckets.into_values().collect()
}

/// Bits per second for `bytes` transferred over `delta_time` seconds, floored
/// to a whole number.
pub fn throughput_bps(bytes: u64, delta_time: f64) -> Option<u64> {
    if delta_time.is_nan() || delta_time <= 0.0 {
        return None;
    }
    Some(floor_div(bytes as f64 * 8.0, delta_time) as u64)
}

/// Overview of a dataset at raw resolution, in bps.
///
/// Returns `None` for an empty dataset.
pub fn describe(dataset: &Dataset) -> Option<DatasetInfo> {
    let samples = dataset.samples();
    let first = samples.first()?;
    let last = samples.last()?;

    let mut min_interval = f64::INFINITY;
    let mut max_interval = f64::NEG_INFINITY;
    let mut receive_max_bps = 0;
    let mut send_max_bps = 0;
    for s in samples {
        min_interval = min_interval.min(s.delta_time);
        max_interval = max_interval.max(s.delta_time);
        if let Some(bps) = throughput_bps(s.received_bytes, s.delta_time) {
            receive_max_bps = receive_max_bps.max(bps);
        }
        if let Some(bps) = throughput_bps(s.sent_bytes, s.delta_time) {
            send_max_bps = send_max_bps.max(bps);
        }
    }

    Some(DatasetInfo {
        start: first.timestamp,
        end: last.timestamp,
        min_interval,
        max_interval,
        rows: samples.len(),
        receive_max_bps,
        send_max_bps,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn to_throughput_row(s: &Sample) -> Result<ThroughputRow> {
    let degenerate = || StgError::DegenerateInterval {
        timestamp: s.timestamp,
    };
    Ok(ThroughputRow {
        timestamp: s.timestamp,
        delta_time: s.delta_time,
        received_bps: throughput_bps(s.received_bytes, s.delta_time).ok_or_else(degenerate)?,
        sent_bps: throughput_bps(s.sent_bytes, s.delta_time).ok_or_else(degenerate)?,
    })
}

/// Largest value of `key` and the first row that reaches it.
fn find_max(rows: &[ThroughputRow], unit: Unit, key: impl Fn(&ThroughputRow) -> u64) -> Extremum {
    let mut best = &rows[0];
    for row in &rows[1..] {
        if key(row) > key(best) {
            best = row;
        }
    }
    Extremum {
        bps: key(best),
        value: unit.scale(key(best)),
        timestamp: best.timestamp,
    }
}

/// Floor of `a / b` derived from the exact remainder rather than from the
/// already rounded quotient, so `floor_div(1.0, 0.1)` is 9.
fn floor_div(a: f64, b: f64) -> f64 {
    let rem = a % b;
    let mut div = (a - rem) / b;
    if rem != 0.0 && ((b < 0.0) != (rem < 0.0)) {
        div -= 1.0;
    }
    if div == 0.0 {
        return 0.0;
    }
    let floor = div.floor();
    if div - floor > 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stg_core::models::{DateRange, TargetDescriptor};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn sample(t: &str, recv: u64, send: u64, delta: f64) -> Sample {
        Sample {
            timestamp: ts(t),
            received_bytes: recv,
            sent_bytes: send,
            delta_time: delta,
        }
    }

    fn dataset(samples: Vec<Sample>) -> Dataset {
        let target = TargetDescriptor::new(
            "10.0.0.1",
            [
                "Target Address:10.0.0.1".to_string(),
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
            ],
        );
        Dataset::new(target, samples, vec![])
    }

    /// Samples across two days with uneven intervals.
    fn two_day_dataset() -> Dataset {
        dataset(vec![
            sample("2020-08-01 12:00:10", 1_000, 500, 10.0),
            sample("2020-08-01 12:00:20", 3_000, 700, 10.0),
            sample("2020-08-01 12:04:50", 2_000, 900, 270.0),
            sample("2020-08-01 12:05:00", 7_000, 100, 10.0),
            sample("2020-08-02 00:00:10", 4_000, 4_000, 43_150.0),
        ])
    }

    fn req(granularity: Granularity, unit: Unit) -> AggregationRequest {
        AggregationRequest::new(granularity, unit, None)
    }

    // ── throughput_bps ────────────────────────────────────────────────────────

    #[test]
    fn test_throughput_floors() {
        // 1000 * 8 / 3 = 2666.67
        assert_eq!(throughput_bps(1_000, 3.0), Some(2_666));
        assert_eq!(throughput_bps(1_000, 8.0), Some(1_000));
    }

    #[test]
    fn test_throughput_zero_interval_is_none() {
        assert_eq!(throughput_bps(1_000, 0.0), None);
        assert_eq!(throughput_bps(1_000, -1.0), None);
    }

    #[test]
    fn test_floor_div_exact_multiples() {
        assert_eq!(floor_div(80.0, 10.0), 8.0);
        // The quotient 1.0 / 0.1 rounds up to 10.0, but 0.1 is slightly more
        // than a tenth, so the true floor is 9.
        assert_eq!(floor_div(1.0, 0.1), 9.0);
        assert_eq!(floor_div(7.0, 2.0), 3.0);
    }

    // ── raw aggregation ───────────────────────────────────────────────────────

    #[test]
    fn test_raw_keeps_every_row() {
        let ds = two_day_dataset();
        let result = aggregate(&ds, &req(Granularity::Raw, Unit::Bps)).unwrap();
        assert_eq!(result.rows.len(), ds.len());
        for (row, s) in result.rows.iter().zip(ds.samples()) {
            let expected = ((s.received_bytes * 8) as f64 / s.delta_time).floor() as u64;
            assert_eq!(row.received_bps, expected);
        }
    }

    #[test]
    fn test_raw_exact_floored_values() {
        let result = aggregate(&two_day_dataset(), &req(Granularity::Raw, Unit::Bps)).unwrap();
        // 2000 * 8 / 270 = 59.259...
        assert_eq!(result.rows[2].received_bps, 59);
        // 4000 * 8 / 43150 = 0.74...
        assert_eq!(result.rows[4].sent_bps, 0);
    }

    #[test]
    fn test_max_and_timestamp() {
        let result = aggregate(&two_day_dataset(), &req(Granularity::Raw, Unit::Bps)).unwrap();
        // 7000 * 8 / 10 = 5600
        assert_eq!(result.receive_max.bps, 5_600);
        assert_eq!(result.receive_max.timestamp, ts("2020-08-01 12:05:00"));
        // 700 * 8 / 10 = 560
        assert_eq!(result.send_max.bps, 560);
        assert_eq!(result.send_max.timestamp, ts("2020-08-01 12:00:20"));
    }

    #[test]
    fn test_max_ties_resolve_to_earliest() {
        let ds = dataset(vec![
            sample("2020-08-01 12:00:10", 100, 1, 10.0),
            sample("2020-08-01 12:00:20", 500, 1, 10.0),
            sample("2020-08-01 12:00:30", 500, 1, 10.0),
        ]);
        let result = aggregate(&ds, &req(Granularity::Raw, Unit::Bps)).unwrap();
        assert_eq!(result.receive_max.timestamp, ts("2020-08-01 12:00:20"));
        assert_eq!(result.send_max.timestamp, ts("2020-08-01 12:00:10"));
    }

    #[test]
    fn test_unit_scaling_keeps_bps_floor() {
        let ds = dataset(vec![sample("2020-08-01 12:00:10", 15_432_097, 0, 10.0)]);
        let result = aggregate(&ds, &req(Granularity::Raw, Unit::Mbps)).unwrap();
        // 15432097 * 8 / 10 = 12345677.6 -> 12345677 bps
        assert_eq!(result.rows[0].received_bps, 12_345_677);
        assert!((result.received(0) - 12.345677).abs() < 1e-12);
        assert!((result.receive_max.value - 12.345677).abs() < 1e-12);
    }

    // ── resampling ────────────────────────────────────────────────────────────

    #[test]
    fn test_five_minute_buckets_sum() {
        let result =
            aggregate(&two_day_dataset(), &req(Granularity::Minutes5, Unit::Bps)).unwrap();
        assert_eq!(result.rows.len(), 3);

        let first = &result.rows[0];
        assert_eq!(first.timestamp, ts("2020-08-01 12:00:00"));
        assert_eq!(first.delta_time, 290.0);
        // (1000 + 3000 + 2000) * 8 / 290 = 165.5
        assert_eq!(first.received_bps, 165);

        assert_eq!(result.rows[1].timestamp, ts("2020-08-01 12:05:00"));
        assert_eq!(result.rows[2].timestamp, ts("2020-08-02 00:00:00"));
    }

    #[test]
    fn test_resample_matches_manual_grouping() {
        let ds = two_day_dataset();
        let buckets = resample(ds.samples(), Granularity::Minutes5);

        let mut manual: BTreeMap<NaiveDateTime, (u64, u64, f64)> = BTreeMap::new();
        for s in ds.samples() {
            let secs = s.timestamp.and_utc().timestamp();
            let key = chrono::DateTime::from_timestamp(secs - secs % 300, 0)
                .unwrap()
                .naive_utc();
            let e = manual.entry(key).or_insert((0, 0, 0.0));
            e.0 += s.received_bytes;
            e.1 += s.sent_bytes;
            e.2 += s.delta_time;
        }

        assert_eq!(buckets.len(), manual.len());
        for (b, (key, (recv, send, delta))) in buckets.iter().zip(manual) {
            assert_eq!(b.timestamp, key);
            assert_eq!(b.received_bytes, recv);
            assert_eq!(b.sent_bytes, send);
            assert_eq!(b.delta_time, delta);
        }
    }

    #[test]
    fn test_resample_omits_empty_buckets() {
        let ds = two_day_dataset();
        let buckets = resample(ds.samples(), Granularity::Minutes1);
        // Samples fall in 12:00, 12:04, 12:05 and 00:00 the next day.
        assert_eq!(buckets.len(), 4);
    }

    #[test]
    fn test_resample_daily() {
        let buckets = resample(two_day_dataset().samples(), Granularity::Days1);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].timestamp, ts("2020-08-01 00:00:00"));
        assert_eq!(buckets[0].received_bytes, 13_000);
    }

    #[test]
    fn test_resample_saturates_byte_sums() {
        let samples = vec![
            sample("2020-08-01 12:00:10", u64::MAX, u64::MAX, 10.0),
            sample("2020-08-01 12:00:20", u64::MAX, 1, 10.0),
        ];
        let buckets = resample(&samples, Granularity::Minutes1);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].received_bytes, u64::MAX);
        assert_eq!(buckets[0].sent_bytes, u64::MAX);
        assert_eq!(buckets[0].delta_time, 20.0);
    }

    // ── date range ────────────────────────────────────────────────────────────

    #[test]
    fn test_range_is_inclusive_by_date() {
        let ds = two_day_dataset();
        let range = DateRange::parse("2020-08-02", "2020-08-02").unwrap();
        let request = AggregationRequest::new(Granularity::Raw, Unit::Bps, Some(range));
        let result = aggregate(&ds, &request).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].timestamp, ts("2020-08-02 00:00:10"));
    }

    #[test]
    fn test_range_before_dataset_is_empty_range() {
        let ds = two_day_dataset();
        let range = DateRange::parse("2019-01-01", "2019-12-31").unwrap();
        let request = AggregationRequest::new(Granularity::Raw, Unit::Mbps, Some(range));
        let err = aggregate(&ds, &request).unwrap_err();
        assert!(matches!(
            err,
            StgError::EmptyRange { start, end }
                if start == NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()
                && end == NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()
        ));
        // The dataset is still usable afterwards.
        assert!(aggregate(&ds, &req(Granularity::Raw, Unit::Mbps)).is_ok());
    }

    #[test]
    fn test_zero_interval_row_is_degenerate() {
        let ds = dataset(vec![sample("2020-08-01 12:00:10", 1, 1, 0.0)]);
        assert!(matches!(
            aggregate(&ds, &req(Granularity::Raw, Unit::Bps)),
            Err(StgError::DegenerateInterval { .. })
        ));
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let ds = two_day_dataset();
        let request = req(Granularity::Minutes1, Unit::Kbps);
        assert_eq!(aggregate(&ds, &request).unwrap(), aggregate(&ds, &request).unwrap());
    }

    // ── describe ──────────────────────────────────────────────────────────────

    #[test]
    fn test_describe() {
        let info = describe(&two_day_dataset()).unwrap();
        assert_eq!(info.rows, 5);
        assert_eq!(info.start, ts("2020-08-01 12:00:10"));
        assert_eq!(info.end, ts("2020-08-02 00:00:10"));
        assert_eq!(info.min_interval, 10.0);
        assert_eq!(info.max_interval, 43_150.0);
        assert_eq!(info.receive_max_bps, 5_600);
        assert_eq!(info.send_max_bps, 560);
    }

    #[test]
    fn test_describe_empty() {
        assert!(describe(&dataset(vec![])).is_none());
    }
}
