//! Runs the turnstile pipeline over a directory of yearly dumps.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::analyzers::matrix::DayMatrix;
use crate::config::TurnstileConfig;
use crate::error::PipelineError;
use crate::turnstile::aggregate::daily_totals;
use crate::turnstile::differencer::station_deltas;
use crate::turnstile::filter::filter_outliers;
use crate::turnstile::loader::load_file;
use crate::turnstile::merge::merge_years;
use crate::turnstile::types::{Reading, StationDay};

pub const TOTAL_LABEL: &str = "total";

/// Result matrices of one run.
#[derive(Debug)]
pub struct TurnstileRun {
    pub files_processed: Vec<PathBuf>,
    pub files_skipped: Vec<PathBuf>,
    /// Station × day entries.
    pub stations: DayMatrix,
    /// Rolling-mean year-over-year change of `stations`.
    pub stations_yoy: DayMatrix,
    /// Sum over stations, as a single `total` row.
    pub total: DayMatrix,
    /// `total`, its rolling mean and the year-over-year change of that mean.
    pub total_yoy: DayMatrix,
}

/// Deltas, outlier filter and daily sums for one station's readings.
pub fn process_station(readings: Vec<Reading>, config: &TurnstileConfig) -> Vec<StationDay> {
    let deltas = station_deltas(readings);
    let kept = filter_outliers(deltas, config.z_threshold, config.zero_variance);
    daily_totals(&kept)
}

/// Groups readings by station, moving them out of `readings`. The station
/// name is copied once per station.
pub fn split_by_station(readings: Vec<Reading>) -> BTreeMap<String, Vec<Reading>> {
    let mut stations: BTreeMap<String, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        match stations.get_mut(&reading.id.station) {
            Some(group) => group.push(reading),
            None => {
                stations.insert(reading.id.station.clone(), vec![reading]);
            }
        }
    }
    stations
}

/// Station-day aggregates of one yearly file.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn process_file(path: &Path, config: &TurnstileConfig) -> Result<Vec<StationDay>> {
    let loaded = load_file(path)?;
    let stations = split_by_station(loaded.readings);
    let station_count = stations.len();

    let mut rows = Vec::new();
    for (i, (station, readings)) in stations.into_iter().enumerate() {
        let station_rows = process_station(readings, config);
        debug!(
            station = %station,
            index = i + 1,
            of = station_count,
            days = station_rows.len(),
            "Station processed"
        );
        rows.extend(station_rows);
    }

    info!(year = loaded.year, stations = station_count, rows = rows.len(), "File aggregated");
    Ok(rows)
}

/// Lists `*.csv` files of `dir` in file-name order.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Processes every file in order, merges the years and derives the result
/// matrices. Files whose name carries no year are logged and skipped.
///
/// # Errors
///
/// Returns [`PipelineError::NoInput`] when no file could be processed, and
/// propagates I/O errors.
pub fn run(paths: &[PathBuf], config: &TurnstileConfig) -> Result<TurnstileRun> {
    let mut years = Vec::with_capacity(paths.len());
    let mut files_processed = Vec::new();
    let mut files_skipped = Vec::new();

    for (i, path) in paths.iter().enumerate() {
        info!(
            path = %path.display(),
            index = i + 1,
            of = paths.len(),
            "Processing file"
        );
        match process_file(path, config) {
            Ok(rows) => {
                years.push(rows);
                files_processed.push(path.clone());
            }
            Err(e) => match e.downcast_ref::<PipelineError>() {
                Some(PipelineError::UnrecognizedFileName(_)) => {
                    error!(error = %e, "Skipping file");
                    files_skipped.push(path.clone());
                }
                _ => return Err(e),
            },
        }
    }

    if files_processed.is_empty() {
        let dir = paths
            .first()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        return Err(PipelineError::NoInput(dir).into());
    }

    let merged = merge_years(years, config.plausibility_cap);
    let stations = DayMatrix::pivot(
        merged.into_iter().map(|r| (r.station, r.day, r.value)),
        config.series.day_axis,
    );
    let total = stations.column_totals(TOTAL_LABEL);

    info!(
        stations = stations.rows.len(),
        days = stations.days.len(),
        "Merged all years"
    );

    Ok(TurnstileRun {
        stations_yoy: stations.rolling_yoy(config.series.window, config.series.lag),
        total_yoy: total.yoy_breakdown(config.series.window, config.series.lag),
        stations,
        total,
        files_processed,
        files_skipped,
    })
}
