mod bootstrap;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stg_core::settings::{LastUsedParams, Settings};
use stg_data::analysis::LoadProgress;
use stg_data::export::{plot_series, write_csv, write_plot_json, AxisScale};
use stg_data::reader::expand_paths;
use stg_data::summary::{format_dataset_info, format_summary, format_target};
use stg_runtime::loader::{wait_for_dataset, BatchLoader};
use stg_runtime::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("STG graph v{} starting", env!("CARGO_PKG_VERSION"));

    if settings.clear && settings.paths.is_empty() {
        tracing::info!("Last-used parameters cleared");
        return Ok(());
    }

    let request = settings.request()?;
    let paths = expand_paths(&settings.paths);
    if paths.is_empty() {
        bail!("No STG log files given; pass files or directories, or --reload after a previous run");
    }
    tracing::info!(
        "Granularity: {}, Unit: {}, Files: {}",
        request.granularity,
        request.unit,
        paths.len()
    );

    // ── Load ──────────────────────────────────────────────────────────────────
    let (mut rx, handle) = BatchLoader::new(paths.clone()).start();
    let loaded = wait_for_dataset(&mut rx, log_progress).await;
    handle.join().await;
    let dataset = loaded.context("Loader stopped before reporting a result")??;

    let mut session = Session::new();
    let dataset = session.install(paths.clone(), dataset);
    let target = dataset.target().clone();

    for line in format_target(&target) {
        println!("{line}");
    }
    if let Some(info) = session.info() {
        for line in format_dataset_info(&info) {
            println!("{line}");
        }
    }
    let dates = session.dates();
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        tracing::info!("Dates available: {} to {} ({} days)", first, last, dates.len());
    }

    // ── Aggregate ─────────────────────────────────────────────────────────────
    let result = session.aggregate(&request)?;
    let (recv_line, send_line) = format_summary(result);
    println!("{recv_line}");
    println!("{send_line}");

    // ── Export ────────────────────────────────────────────────────────────────
    if !settings.no_csv {
        let dir = output_dir(settings.output_dir.as_deref(), &paths);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory {}", dir.display()))?;
        let written = write_csv(result, &target, &dir)?;
        println!("Saved {}", written.display());
    }

    if let Some(path) = &settings.plot_json {
        let axis = settings.axis_max.map_or(AxisScale::Auto, AxisScale::Fixed);
        write_plot_json(&plot_series(result, &target, axis), path)?;
        println!("Saved {}", path.display());
    }

    if let Err(e) = settings
        .to_last_used(&paths)
        .save_to(&LastUsedParams::config_path())
    {
        tracing::warn!("Could not save last-used parameters: {}", e);
    }

    Ok(())
}

fn log_progress(step: &LoadProgress) {
    match step {
        LoadProgress::HeadersValidated { files, target } => {
            tracing::info!("{} file header(s) match target {}", files, target.address());
        }
        LoadProgress::FileParsed {
            index,
            total,
            path,
            samples,
        } => {
            tracing::debug!("[{}/{}] {}: {} samples", index + 1, total, path.display(), samples);
        }
        LoadProgress::Merged { rows } => {
            tracing::debug!("Merged dataset has {} rows", rows);
        }
    }
}

/// The explicit output directory, else the directory of the first input file.
fn output_dir(explicit: Option<&Path>, inputs: &[PathBuf]) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| {
            inputs
                .first()
                .and_then(|p| p.parent())
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."))
}
