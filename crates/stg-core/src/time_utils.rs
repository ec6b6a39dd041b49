use chrono::{DateTime, NaiveDateTime};

// ── STG timestamps ────────────────────────────────────────────────────────────

/// Date layouts written by the traffic generator, tried in order.
///
/// `%.f` also matches a missing fractional part.
pub const STG_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%a %b %d %H:%M:%S%.f %Y",
    "%a %b %e %H:%M:%S%.f %Y",
    "%b %d %Y %H:%M:%S%.f",
    "%d %b %Y %H:%M:%S%.f",
    "%d-%b-%Y %H:%M:%S%.f",
    "%Y/%b/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
];

/// Undo the generator's misspelling of August before parsing.
pub fn fix_month_abbreviation(s: &str) -> String {
    s.replace("Avg", "Aug")
}

/// Parse one STG date cell into a naive wall-clock timestamp.
///
/// Returns `None` when no known layout matches.
pub fn parse_stg_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let fixed = fix_month_abbreviation(raw.trim());
    // Collapse runs of spaces so padded day numbers still match.
    let normalised = fixed.split_whitespace().collect::<Vec<_>>().join(" ");
    STG_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalised, fmt).ok())
}

// ── Buckets ───────────────────────────────────────────────────────────────────

/// Floor `ts` to the start of its `width_secs` wide bucket.
///
/// Buckets are counted from midnight 1970-01-01 of the naive clock, so every
/// width that divides a day lines up with wall-clock boundaries.
pub fn floor_to_bucket(ts: NaiveDateTime, width_secs: i64) -> NaiveDateTime {
    let secs = ts.and_utc().timestamp();
    let floored = secs - secs.rem_euclid(width_secs);
    DateTime::from_timestamp(floored, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(ts)
}

/// Elapsed seconds from `earlier` to `later`, with microsecond resolution.
pub fn seconds_between(earlier: NaiveDateTime, later: NaiveDateTime) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
