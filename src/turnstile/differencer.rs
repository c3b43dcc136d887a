//! Turns one station's cumulative readings into per-period deltas.
//!
//! Readings are pivoted into a timestamp × turnstile matrix, each column is
//! forward-filled and then first-differenced.

use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::analyzers::rolling::forward_fill;
use crate::turnstile::types::{PeriodDelta, Reading, TurnstileId};

/// Timestamp × turnstile matrix of one station. `columns[c][t]` is the
/// value of turnstile `ids[c]` at `timestamps[t]`.
#[derive(Debug, Clone, PartialEq)]
pub struct StationMatrix {
    pub timestamps: Vec<NaiveDateTime>,
    pub ids: Vec<TurnstileId>,
    pub columns: Vec<Vec<Option<f64>>>,
}

impl StationMatrix {
    /// Pivots readings into a matrix. Several readings for the same
    /// turnstile and timestamp are averaged.
    pub fn from_readings(readings: Vec<Reading>) -> Self {
        let timestamps: Vec<NaiveDateTime> = readings
            .iter()
            .map(|r| r.timestamp)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut cells: BTreeMap<TurnstileId, BTreeMap<NaiveDateTime, (f64, u32)>> =
            BTreeMap::new();
        for reading in readings {
            let cell = cells
                .entry(reading.id)
                .or_default()
                .entry(reading.timestamp)
                .or_insert((0.0, 0));
            cell.0 += reading.entries;
            cell.1 += 1;
        }

        let mut ids = Vec::with_capacity(cells.len());
        let mut columns = Vec::with_capacity(cells.len());
        for (id, by_time) in cells {
            columns.push(
                timestamps
                    .iter()
                    .map(|t| by_time.get(t).map(|(sum, n)| sum / f64::from(*n)))
                    .collect(),
            );
            ids.push(id);
        }

        Self {
            timestamps,
            ids,
            columns,
        }
    }

    /// Forward-fills every column, then replaces it with its first difference.
    pub fn into_deltas(mut self) -> Self {
        for column in &mut self.columns {
            forward_fill(column);
            *column = first_difference(column);
        }
        self
    }

    /// Melts the matrix into one [`PeriodDelta`] per defined cell.
    pub fn melt(self) -> Vec<PeriodDelta> {
        let timestamps = self.timestamps;
        self.ids
            .into_iter()
            .zip(self.columns)
            .flat_map(|(id, column)| {
                let id = Arc::new(id);
                column
                    .into_iter()
                    .zip(timestamps.iter())
                    .filter_map(|(cell, &timestamp)| {
                        cell.map(|delta| PeriodDelta {
                            id: Arc::clone(&id),
                            timestamp,
                            delta,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// `out[i] = column[i] - column[i - 1]`; `out[0]` and any difference with an
/// empty side are undefined.
pub fn first_difference(column: &[Option<f64>]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(column.windows(2).map(|w| match (w[0], w[1]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        }))
        .take(column.len())
        .collect()
}

/// Per-period deltas of every turnstile of one station.
pub fn station_deltas(readings: Vec<Reading>) -> Vec<PeriodDelta> {
    StationMatrix::from_readings(readings).into_deltas().melt()
}
