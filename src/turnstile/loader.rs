//! Reads one yearly turnstile usage dump.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::turnstile::types::{RawRow, Reading, TurnstileId};

const FILE_MARKER: &str = "Turnstile_Usage_Data__";

/// Readings of one file plus what the loader learned about it.
#[derive(Debug)]
pub struct TurnstileFile {
    pub year: i32,
    pub readings: Vec<Reading>,
    /// Rows dropped because a field could not be parsed.
    pub skipped_rows: usize,
    /// Readings dated outside `year`. They are kept.
    pub out_of_year: usize,
}

/// Extracts the year from a `*Turnstile_Usage_Data__<year>.csv` file name.
pub fn year_from_path(path: &Path) -> Result<i32, PipelineError> {
    let unrecognized = || PipelineError::UnrecognizedFileName(path.to_path_buf());

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(unrecognized)?;
    let start = name.rfind(FILE_MARKER).ok_or_else(unrecognized)? + FILE_MARKER.len();
    let year = name[start..].strip_suffix(".csv").ok_or_else(unrecognized)?;

    year.trim().parse().map_err(|_| unrecognized())
}

/// Loads every reading of the file at `path`.
///
/// # Errors
///
/// Returns [`PipelineError::UnrecognizedFileName`] when the name carries no
/// year, and an I/O or CSV error when the file cannot be read.
pub fn load_file(path: &Path) -> Result<TurnstileFile> {
    let year = year_from_path(path)?;
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    let mut loaded = load_readings(file)?;
    loaded.year = year;
    loaded.out_of_year = loaded
        .readings
        .iter()
        .filter(|r| r.timestamp.year() != year)
        .count();

    if loaded.skipped_rows > 0 {
        warn!(
            path = %path.display(),
            skipped = loaded.skipped_rows,
            "Skipped unparseable rows"
        );
    }
    if loaded.out_of_year > 0 {
        warn!(
            path = %path.display(),
            year,
            out_of_year = loaded.out_of_year,
            "Readings dated outside the file's year"
        );
    }
    debug!(path = %path.display(), readings = loaded.readings.len(), "File loaded");

    Ok(loaded)
}

/// Parses readings from any CSV source. The returned `year` is 0.
pub fn load_readings<R: Read>(source: R) -> Result<TurnstileFile> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(source);

    let mut readings = Vec::new();
    let mut skipped_rows = 0;

    for result in rdr.deserialize::<RawRow>() {
        match result.map_err(anyhow::Error::from).and_then(parse_row) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                debug!(error = %e, "Dropping row");
                skipped_rows += 1;
            }
        }
    }

    Ok(TurnstileFile {
        year: 0,
        readings,
        skipped_rows,
        out_of_year: 0,
    })
}

fn parse_row(row: RawRow) -> Result<Reading> {
    let date = NaiveDate::parse_from_str(&row.date, "%m/%d/%Y")
        .with_context(|| format!("bad date {:?}", row.date))?;
    let time = NaiveTime::parse_from_str(&row.time, "%H:%M:%S")
        .with_context(|| format!("bad time {:?}", row.time))?;
    let entries: f64 = row
        .entries
        .parse()
        .with_context(|| format!("bad entries {:?}", row.entries))?;

    Ok(Reading {
        id: TurnstileId {
            control_area: row.control_area,
            unit: row.unit,
            scp: row.scp,
            station: row.station,
            line_name: row.line_name,
            division: row.division,
        },
        timestamp: NaiveDateTime::new(date, time),
        entries,
    })
}
