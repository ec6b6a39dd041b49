use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::models::{AggregationRequest, DateRange, Granularity, Unit};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Throughput graphs from STG rotation logs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "stg-graph",
    about = "Merge STG rotation logs and report receive/send throughput",
    version
)]
pub struct Settings {
    /// STG log files or directories containing them
    pub paths: Vec<PathBuf>,

    /// Averaging interval (raw, 10s, 15s, 30s, 1min, 2min, 5min, 10min, 15min, 30min, 1h, 3h, 6h, 12h, 1d)
    #[arg(long, short = 'g', default_value = "raw")]
    pub granularity: Granularity,

    /// Throughput unit (bps, kbps, Mbps, Gbps)
    #[arg(long, short = 'u', default_value = "Mbps")]
    pub unit: Unit,

    /// First date to include (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Directory for the CSV export (defaults to the directory of the first log)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Fixed y-axis ceiling for the plot series, in bps
    #[arg(long)]
    pub axis_max: Option<u64>,

    /// Write the plot-ready series as JSON to this path
    #[arg(long)]
    pub plot_json: Option<PathBuf>,

    /// Print the summary only, without writing the CSV export
    #[arg(long)]
    pub no_csv: bool,

    /// Reload the files of the previous run
    #[arg(long)]
    pub reload: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.stg-graph/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".stg-graph").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge with last-used params where no explicit
    /// CLI value was provided.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    ///
    /// Persisting the loaded file list is left to the caller, after the batch
    /// has loaded successfully.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        if !is_arg_explicitly_set(&matches, "granularity") {
            if let Some(g) = last.granularity {
                settings.granularity = g;
            }
        }
        if !is_arg_explicitly_set(&matches, "unit") {
            if let Some(u) = last.unit {
                settings.unit = u;
            }
        }
        if settings.output_dir.is_none() {
            settings.output_dir = last.output_dir;
        }
        if settings.reload && settings.paths.is_empty() {
            settings.paths = last.files;
        }

        Self::apply_debug(settings)
    }

    /// Build the aggregation request described by these settings.
    pub fn request(&self) -> Result<AggregationRequest> {
        let range = match (&self.from, &self.to) {
            (Some(from), Some(to)) => Some(DateRange::parse(from, to)?),
            _ => None,
        };
        Ok(AggregationRequest::new(self.granularity, self.unit, range))
    }

    /// The params to persist after a successful run over `files`.
    pub fn to_last_used(&self, files: &[PathBuf]) -> LastUsedParams {
        LastUsedParams {
            granularity: Some(self.granularity),
            unit: Some(self.unit),
            output_dir: self.output_dir.clone(),
            files: files.to_vec(),
        }
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            granularity: Some(Granularity::Minutes5),
            unit: Some(Unit::Kbps),
            output_dir: Some(PathBuf::from("/tmp/out")),
            files: vec![PathBuf::from("/logs/a.csv"), PathBuf::from("/logs/a.csv.1")],
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.granularity, Some(Granularity::Minutes5));
        assert_eq!(loaded.unit, Some(Unit::Kbps));
        assert_eq!(loaded.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(loaded.files.len(), 2);
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_config_path(&tmp));
        assert!(loaded.granularity.is_none());
        assert!(loaded.unit.is_none());
        assert!(loaded.files.is_empty());
    }

    #[test]
    fn test_last_used_params_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(LastUsedParams::load_from(&path).unit.is_none());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["stg-graph"]);
        assert!(settings.paths.is_empty());
        assert_eq!(settings.granularity, Granularity::Raw);
        assert_eq!(settings.unit, Unit::Mbps);
        assert!(settings.from.is_none());
        assert!(settings.axis_max.is_none());
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(!settings.reload);
    }

    #[test]
    fn test_settings_cli_parsing() {
        let settings = Settings::parse_from([
            "stg-graph",
            "--granularity",
            "5min",
            "--unit",
            "kbps",
            "--from",
            "2020-08-01",
            "--to",
            "2020-08-02",
            "a.csv",
            "b.csv",
        ]);
        assert_eq!(settings.granularity, Granularity::Minutes5);
        assert_eq!(settings.unit, Unit::Kbps);
        assert_eq!(settings.paths, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
        let req = settings.request().unwrap();
        assert!(req.range.is_some());
    }

    #[test]
    fn test_settings_rejects_unknown_unit() {
        let result = Settings::try_parse_from(["stg-graph", "--unit", "Tbps"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_with_last_used_merges_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            granularity: Some(Granularity::Hours1),
            unit: Some(Unit::Gbps),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(vec!["stg-graph".into()], &config_path);
        assert_eq!(settings.granularity, Granularity::Hours1);
        assert_eq!(settings.unit, Unit::Gbps);
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            unit: Some(Unit::Gbps),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["stg-graph".into(), "--unit".into(), "bps".into()],
            &config_path,
        );
        assert_eq!(settings.unit, Unit::Bps);
    }

    #[test]
    fn test_load_with_last_used_reload_uses_saved_files() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            files: vec![PathBuf::from("/logs/stg.csv")],
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["stg-graph".into(), "--reload".into()],
            &config_path,
        );
        assert_eq!(settings.paths, vec![PathBuf::from("/logs/stg.csv")]);
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&config_path).expect("save");
        assert!(config_path.exists());

        Settings::load_with_last_used_impl(
            vec!["stg-graph".into(), "--clear".into()],
            &config_path,
        );
        assert!(!config_path.exists(), "file must be gone after --clear");
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            vec!["stg-graph".into(), "--debug".into()],
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_to_last_used_records_files() {
        let settings = Settings::parse_from(["stg-graph", "--unit", "kbps"]);
        let last = settings.to_last_used(&[PathBuf::from("x.csv")]);
        assert_eq!(last.unit, Some(Unit::Kbps));
        assert_eq!(last.files, vec![PathBuf::from("x.csv")]);
    }
}
