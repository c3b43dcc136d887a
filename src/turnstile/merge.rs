//! Combines the per-year station-day aggregates of a run.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::turnstile::types::StationDay;

/// Concatenates per-year aggregates in order, drops rows whose absolute
/// value is at or above `cap`, and resolves duplicate (station, day) rows by
/// keeping the one added last.
pub fn merge_years<I>(years: I, cap: f64) -> Vec<StationDay>
where
    I: IntoIterator<Item = Vec<StationDay>>,
{
    let mut merged: BTreeMap<(String, NaiveDate), f64> = BTreeMap::new();
    let mut capped = 0usize;

    for row in years.into_iter().flatten() {
        if row.value.abs() >= cap {
            capped += 1;
            continue;
        }
        merged.insert((row.station, row.day), row.value);
    }

    debug!(capped, rows = merged.len(), "Merged yearly aggregates");

    merged
        .into_iter()
        .map(|((station, day), value)| StationDay { station, day, value })
        .collect()
}
