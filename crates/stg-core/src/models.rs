use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StgError};

// ── Raw input ─────────────────────────────────────────────────────────────────

/// One data row of an STG log file, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    /// Wall-clock time the counters were read (no timezone in the log).
    pub timestamp: NaiveDateTime,
    /// Device uptime in seconds; zero marks a failed read.
    pub uptime: u64,
    /// Bytes received since the previous sample.
    pub received_bytes: u64,
    /// Bytes sent since the previous sample.
    pub sent_bytes: u64,
}

/// The four header fields that identify the monitored target.
///
/// The first field has the form `Target Address:<addr>`; the other three are
/// free text written by the traffic generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    address: String,
    fields: [String; 4],
}

impl TargetDescriptor {
    pub fn new(address: impl Into<String>, fields: [String; 4]) -> Self {
        Self {
            address: address.into(),
            fields,
        }
    }

    /// The address extracted from the `Target Address:` field.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// All four header fields in file order.
    pub fn fields(&self) -> &[String; 4] {
        &self.fields
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.join(","))
    }
}

// ── Dataset ───────────────────────────────────────────────────────────────────

/// A merged sample with the elapsed time since its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub received_bytes: u64,
    pub sent_bytes: u64,
    /// Seconds since the previous sample in the merged sequence.
    pub delta_time: f64,
}

/// Chronologically ordered, deduplicated samples of one target.
///
/// Built once per batch load. Timestamps are strictly ascending and every
/// `delta_time` is positive.
#[derive(Debug, Clone)]
pub struct Dataset {
    target: TargetDescriptor,
    samples: Vec<Sample>,
    sources: Vec<PathBuf>,
}

impl Dataset {
    /// Wrap already merged samples. Callers must uphold the ordering and
    /// positive-interval invariants.
    pub fn new(target: TargetDescriptor, samples: Vec<Sample>, sources: Vec<PathBuf>) -> Self {
        Self {
            target,
            samples,
            sources,
        }
    }

    pub fn target(&self) -> &TargetDescriptor {
        &self.target
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Files the dataset was loaded from, in the order given.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Distinct calendar dates covered by the dataset, ascending.
    ///
    /// These are the valid choices for a [`DateRange`] bound.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.samples.iter().map(|s| s.timestamp.date()).collect();
        dates.dedup();
        dates
    }
}

// ── Unit ──────────────────────────────────────────────────────────────────────

/// Throughput unit used for display and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "bps")]
    Bps,
    #[serde(rename = "kbps")]
    Kbps,
    #[default]
    #[serde(rename = "Mbps")]
    Mbps,
    #[serde(rename = "Gbps")]
    Gbps,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Bps, Unit::Kbps, Unit::Mbps, Unit::Gbps];

    /// Bits per second in one of this unit.
    pub fn divisor(self) -> u64 {
        match self {
            Unit::Bps => 1,
            Unit::Kbps => 1_000,
            Unit::Mbps => 1_000_000,
            Unit::Gbps => 1_000_000_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Unit::Bps => "bps",
            Unit::Kbps => "kbps",
            Unit::Mbps => "Mbps",
            Unit::Gbps => "Gbps",
        }
    }

    /// Decimal places used when rendering values in this unit.
    pub fn decimals(self) -> u32 {
        match self {
            Unit::Bps | Unit::Kbps => 0,
            Unit::Mbps | Unit::Gbps => 3,
        }
    }

    /// Scale a bits-per-second value into this unit.
    pub fn scale(self, bps: u64) -> f64 {
        bps as f64 / self.divisor() as f64
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Unit {
    type Err = StgError;

    fn from_str(s: &str) -> Result<Self> {
        Unit::ALL
            .into_iter()
            .find(|u| u.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StgError::InvalidUnit(s.to_string()))
    }
}

// ── Granularity ───────────────────────────────────────────────────────────────

/// Averaging interval applied before throughput is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Granularity {
    #[default]
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "10s")]
    Seconds10,
    #[serde(rename = "15s")]
    Seconds15,
    #[serde(rename = "30s")]
    Seconds30,
    #[serde(rename = "1min")]
    Minutes1,
    #[serde(rename = "2min")]
    Minutes2,
    #[serde(rename = "5min")]
    Minutes5,
    #[serde(rename = "10min")]
    Minutes10,
    #[serde(rename = "15min")]
    Minutes15,
    #[serde(rename = "30min")]
    Minutes30,
    #[serde(rename = "1h")]
    Hours1,
    #[serde(rename = "3h")]
    Hours3,
    #[serde(rename = "6h")]
    Hours6,
    #[serde(rename = "12h")]
    Hours12,
    #[serde(rename = "1d")]
    Days1,
}

impl Granularity {
    /// All granularities in menu order, finest first.
    pub const ALL: [Granularity; 15] = [
        Granularity::Raw,
        Granularity::Seconds10,
        Granularity::Seconds15,
        Granularity::Seconds30,
        Granularity::Minutes1,
        Granularity::Minutes2,
        Granularity::Minutes5,
        Granularity::Minutes10,
        Granularity::Minutes15,
        Granularity::Minutes30,
        Granularity::Hours1,
        Granularity::Hours3,
        Granularity::Hours6,
        Granularity::Hours12,
        Granularity::Days1,
    ];

    /// Bucket width in seconds, `None` for raw samples.
    pub fn bucket_seconds(self) -> Option<i64> {
        const MINUTE: i64 = 60;
        const HOUR: i64 = 60 * MINUTE;
        match self {
            Granularity::Raw => None,
            Granularity::Seconds10 => Some(10),
            Granularity::Seconds15 => Some(15),
            Granularity::Seconds30 => Some(30),
            Granularity::Minutes1 => Some(MINUTE),
            Granularity::Minutes2 => Some(2 * MINUTE),
            Granularity::Minutes5 => Some(5 * MINUTE),
            Granularity::Minutes10 => Some(10 * MINUTE),
            Granularity::Minutes15 => Some(15 * MINUTE),
            Granularity::Minutes30 => Some(30 * MINUTE),
            Granularity::Hours1 => Some(HOUR),
            Granularity::Hours3 => Some(3 * HOUR),
            Granularity::Hours6 => Some(6 * HOUR),
            Granularity::Hours12 => Some(12 * HOUR),
            Granularity::Days1 => Some(24 * HOUR),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Raw => "raw",
            Granularity::Seconds10 => "10s",
            Granularity::Seconds15 => "15s",
            Granularity::Seconds30 => "30s",
            Granularity::Minutes1 => "1min",
            Granularity::Minutes2 => "2min",
            Granularity::Minutes5 => "5min",
            Granularity::Minutes10 => "10min",
            Granularity::Minutes15 => "15min",
            Granularity::Minutes30 => "30min",
            Granularity::Hours1 => "1h",
            Granularity::Hours3 => "3h",
            Granularity::Hours6 => "6h",
            Granularity::Hours12 => "12h",
            Granularity::Days1 => "1d",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Granularity {
    type Err = StgError;

    fn from_str(s: &str) -> Result<Self> {
        Granularity::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StgError::InvalidGranularity(s.to_string()))
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StgError::InvalidDate(format!("{start} is after {end}")));
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from `YYYY-MM-DD` or `YYYY/MM/DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let date = ts.date();
        self.start <= date && date <= self.end
    }
}

/// Parse a single calendar date bound.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| StgError::InvalidDate(s.to_string()))
}

/// Parameters of one aggregation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub granularity: Granularity,
    pub unit: Unit,
    /// `None` selects the whole dataset.
    pub range: Option<DateRange>,
}

impl AggregationRequest {
    pub fn new(granularity: Granularity, unit: Unit, range: Option<DateRange>) -> Self {
        Self {
            granularity,
            unit,
            range,
        }
    }

    /// Build a request from the string keys a front end holds, e.g. the
    /// current selection of a drop-down.
    pub fn from_keys(
        granularity: &str,
        unit: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Self> {
        let range = match (from, to) {
            (Some(f), Some(t)) => Some(DateRange::parse(f, t)?),
            (None, None) => None,
            (Some(d), None) | (None, Some(d)) => {
                return Err(StgError::InvalidDate(format!(
                    "both range bounds are required, got only {d}"
                )))
            }
        };
        Ok(Self::new(granularity.parse()?, unit.parse()?, range))
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Throughput of one (possibly bucketed) row, floored to whole bits per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputRow {
    pub timestamp: NaiveDateTime,
    /// Sampling interval in seconds (summed across a bucket).
    pub delta_time: f64,
    pub received_bps: u64,
    pub sent_bps: u64,
}

/// The largest throughput of one direction and when it first occurred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub bps: u64,
    /// `bps` scaled to the request unit.
    pub value: f64,
    pub timestamp: NaiveDateTime,
}

/// Output of one aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult {
    pub request: AggregationRequest,
    pub rows: Vec<ThroughputRow>,
    pub receive_max: Extremum,
    pub send_max: Extremum,
}

impl AggregationResult {
    pub fn unit(&self) -> Unit {
        self.request.unit
    }

    /// Receive throughput of row `i` in the request unit.
    pub fn received(&self, i: usize) -> f64 {
        self.request.unit.scale(self.rows[i].received_bps)
    }

    /// Send throughput of row `i` in the request unit.
    pub fn sent(&self, i: usize) -> f64 {
        self.request.unit.scale(self.rows[i].sent_bps)
    }
}

/// Overview of a freshly loaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub min_interval: f64,
    pub max_interval: f64,
    pub rows: usize,
    pub receive_max_bps: u64,
    pub send_max_bps: u64,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
