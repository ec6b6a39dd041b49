use chrono::NaiveDateTime;

use crate::models::Unit;

/// Layout used when a timestamp is shown to a person (sub-second part dropped).
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format `value` with `decimals` places and comma-grouped whole digits.
///
/// # Examples
///
/// ```
/// use stg_core::formatting::format_number;
///
/// assert_eq!(format_number(3590.0, 2), "3,590.00");
/// assert_eq!(format_number(86_400.0, 0), "86,400");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.*}", decimals as usize, value);
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, frac) = match digits.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (digits, None),
    };
    let mut out = format!("{sign}{}", group_thousands(whole));
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Render a throughput value already scaled to `unit`.
///
/// Mbps and Gbps keep three decimals; bps and kbps are truncated to whole
/// numbers. Both get thousands separators.
///
/// # Examples
///
/// ```
/// use stg_core::formatting::format_throughput;
/// use stg_core::models::Unit;
///
/// assert_eq!(format_throughput(12.345678, Unit::Mbps), "12.346");
/// assert_eq!(format_throughput(1234.9, Unit::Kbps), "1,234");
/// ```
pub fn format_throughput(value: f64, unit: Unit) -> String {
    match unit.decimals() {
        0 => format_number(value.trunc(), 0),
        decimals => format_number(value, decimals),
    }
}

/// Format a timestamp for summaries, without fractional seconds.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(DISPLAY_TIMESTAMP_FORMAT).to_string()
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert a comma between every group of three digits, counting from the right.
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.char_indices() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
