//! STG rotation-log discovery and parsing.
//!
//! An STG log starts with a UTF-8 identity line
//! (`STG,Target Address:<addr>,<f2>,<f3>,<f4>`), followed by a SHIFT-JIS
//! encoded CSV body whose first row is a column header and whose remaining
//! rows are `date,uptime,recv,send` samples.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use stg_core::error::{Result, StgError};
use stg_core::models::{RawSample, TargetDescriptor};
use stg_core::time_utils::parse_stg_timestamp;
use tracing::{debug, warn};

/// Marker every STG log's first line starts with.
const STG_MARKER: &str = "STG";

/// Number of comma-separated fields on the identity line.
const HEADER_FIELDS: usize = 5;

/// Columns of every data row: date, uptime, recv, send.
const BODY_FIELDS: usize = 4;

/// One log file after parsing, before it is merged with the rest of a batch.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub target: TargetDescriptor,
    pub samples: Vec<RawSample>,
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Returns `true` for `*.csv` and rotated `*.csv.<n>` file names, in any case.
pub fn is_log_file_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.ends_with(".csv") {
        return true;
    }
    match name.rsplit_once(".csv.") {
        Some((stem, suffix)) => {
            !stem.is_empty() && !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Find all STG log files recursively under `dir`, sorted by path.
pub fn find_log_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Log directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(is_log_file_name)
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Expand the paths given by a caller: files are kept as they are and
/// directories are replaced by the log files they contain.
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            out.extend(find_log_files(path));
        } else {
            out.push(path.clone());
        }
    }
    out
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Read and validate only the identity line of `path`.
pub fn parse_header(path: &Path) -> Result<TargetDescriptor> {
    let file = std::fs::File::open(path).map_err(|source| StgError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut first = Vec::new();
    reader
        .read_until(b'\n', &mut first)
        .map_err(|source| StgError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
    parse_header_line(path, &first)
}

/// Parse a whole log file: identity line plus samples.
///
/// Samples whose uptime is zero (failed reads) are dropped.
pub fn parse_file(path: &Path) -> Result<ParsedFile> {
    let bytes = std::fs::read(path).map_err(|source| StgError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let (first, body) = match bytes.iter().position(|&b| b == b'\n') {
        Some(pos) => (&bytes[..=pos], &bytes[pos + 1..]),
        None => (&bytes[..], &[][..]),
    };
    let target = parse_header_line(path, first)?;

    let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(body);
    if had_errors {
        warn!(
            "{}: body contains bytes that are not SHIFT-JIS; they were replaced",
            path.display()
        );
    }

    let samples = parse_body(path, &text)?;
    Ok(ParsedFile {
        path: path.to_path_buf(),
        target,
        samples,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn target_address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Target Address:(.+)").expect("regex is valid"))
}

/// Validate the identity line and extract the target descriptor.
fn parse_header_line(path: &Path, raw: &[u8]) -> Result<TargetDescriptor> {
    let line = std::str::from_utf8(raw).map_err(|_| StgError::Encoding {
        path: path.to_path_buf(),
    })?;
    let line = line.trim_end_matches(['\r', '\n']);

    let format_error = |reason: String| StgError::Format {
        path: path.to_path_buf(),
        reason,
    };

    let columns: Vec<&str> = line.split(',').collect();
    if !line.starts_with(STG_MARKER) {
        return Err(format_error(format!(
            "first line does not start with \"{STG_MARKER}\""
        )));
    }
    if columns.len() != HEADER_FIELDS {
        return Err(format_error(format!(
            "first line has {} fields, expected {HEADER_FIELDS}",
            columns.len()
        )));
    }

    let address = target_address_regex()
        .captures(columns[1])
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| format_error("missing \"Target Address:\" field".to_string()))?;

    let fields = [
        columns[1].to_string(),
        columns[2].to_string(),
        columns[3].to_string(),
        columns[4].to_string(),
    ];
    Ok(TargetDescriptor::new(address, fields))
}

/// Parse the decoded body. The first row is the column header and is skipped.
fn parse_body(path: &Path, body: &str) -> Result<Vec<RawSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut samples = Vec::new();
    let mut failed_reads = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| StgError::Format {
            path: path.to_path_buf(),
            reason: format!("unreadable row: {e}"),
        })?;
        // File line: +1 for the identity line stripped before the CSV reader.
        let line = record.position().map(|p| p.line() + 1).unwrap_or_default();

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.len() != BODY_FIELDS {
            return Err(StgError::Format {
                path: path.to_path_buf(),
                reason: format!(
                    "line {line} has {} columns, expected {BODY_FIELDS}",
                    record.len()
                ),
            });
        }

        // A failed read may leave the other columns blank or garbled.
        let uptime = parse_counter(path, line, "uptime", &record[1])?;
        if uptime == 0 {
            failed_reads += 1;
            continue;
        }
        let timestamp = parse_stg_timestamp(&record[0]).ok_or_else(|| StgError::Timestamp {
            path: path.to_path_buf(),
            value: record[0].to_string(),
        })?;

        samples.push(RawSample {
            timestamp,
            uptime,
            received_bytes: parse_counter(path, line, "recv", &record[2])?,
            sent_bytes: parse_counter(path, line, "send", &record[3])?,
        });
    }

    debug!(
        "File {}: {} samples, {} failed reads dropped",
        path.display(),
        samples.len(),
        failed_reads
    );

    Ok(samples)
}

/// Parse a non-negative counter. Whole-valued decimals such as `"1200.0"` are
/// accepted as well.
fn parse_counter(path: &Path, line: u64, column: &str, value: &str) -> Result<u64> {
    if let Ok(v) = value.parse::<u64>() {
        return Ok(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v.is_finite() => Ok(v as u64),
        _ => Err(StgError::Format {
            path: path.to_path_buf(),
            reason: format!("line {line}: invalid {column} value \"{value}\""),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
