//! Spreadsheet export of result matrices and the JSON run summary.
//!
//! Matrices are written as CSV: one row per label, one column per day.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::matrix::DayMatrix;

pub const DAILY_STATIONS: &str = "daily_stations.csv";
pub const DAILY_STATIONS_PCT: &str = "daily_stations_pctchange.csv";
pub const DAILY_TOTAL: &str = "daily_total.csv";
pub const DAILY_TOTAL_PCT: &str = "daily_total_pctchange.csv";
pub const SPTRANS_DAILY_TOTAL: &str = "sptrans_daily_total.csv";
pub const SPTRANS_DAILY_TOTAL_PCT: &str = "sptrans_daily_total_pctchange.csv";
pub const SUMMARY: &str = "summary.json";

/// Overview of one run, written next to the exports.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub pipeline: String,
    pub inputs: Vec<String>,
    pub skipped_inputs: Vec<String>,
    pub rows: usize,
    pub days: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub outputs: Vec<String>,
}

impl RunSummary {
    pub fn new(pipeline: &str, matrix: &DayMatrix) -> Self {
        Self {
            generated_at: Utc::now(),
            pipeline: pipeline.to_string(),
            inputs: Vec::new(),
            skipped_inputs: Vec::new(),
            rows: matrix.rows.len(),
            days: matrix.days.len(),
            first_day: matrix.days.first().copied(),
            last_day: matrix.days.last().copied(),
            outputs: Vec::new(),
        }
    }
}

/// Writes `matrix` to `path`. `row_header` names the label column; empty
/// cells mark undefined values.
pub fn write_matrix(path: &Path, row_header: &str, matrix: &DayMatrix) -> Result<()> {
    debug!(path = %path.display(), rows = matrix.rows.len(), "Writing matrix");

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = Vec::with_capacity(matrix.days.len() + 1);
    header.push(row_header.to_string());
    header.extend(matrix.days.iter().map(|d| d.format("%Y-%m-%d").to_string()));
    writer.write_record(&header)?;

    for row in &matrix.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.label.clone());
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes each `(file name, row header, matrix)` into `dir` and returns the
/// written paths.
pub fn export_all(dir: &Path, exports: &[(&str, &str, &DayMatrix)]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = Vec::with_capacity(exports.len());
    for (name, row_header, matrix) in exports {
        let path = dir.join(name);
        write_matrix(&path, row_header, matrix)?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = written.len(), "Exports written");
    Ok(written)
}

/// Writes the summary as pretty-printed JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
