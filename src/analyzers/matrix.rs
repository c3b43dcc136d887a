//! Label × day matrix of daily values.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::analyzers::rolling::{rolling_mean, rolling_yoy};
use crate::config::DayAxis;

/// One labelled row of a [`DayMatrix`], aligned with its `days`.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

/// Sparse matrix of one value per (label, day). Columns are sorted by day;
/// [`DayMatrix::pivot`] sorts rows by label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayMatrix {
    pub days: Vec<NaiveDate>,
    pub rows: Vec<Series>,
    /// How `days` was built. Decides whether gaps are padded before a
    /// percent change.
    pub axis: DayAxis,
}

impl DayMatrix {
    /// Pivots `(label, day, value)` cells into a matrix. A repeated
    /// (label, day) keeps the last value seen.
    pub fn pivot<I>(cells: I, axis: DayAxis) -> Self
    where
        I: IntoIterator<Item = (String, NaiveDate, f64)>,
    {
        let mut by_label: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        let mut observed = BTreeSet::new();

        for (label, day, value) in cells {
            observed.insert(day);
            by_label.entry(label).or_default().insert(day, value);
        }

        let days: Vec<NaiveDate> = match (axis, observed.first(), observed.last()) {
            (DayAxis::Calendar, Some(&first), Some(&last)) => {
                first.iter_days().take_while(|d| *d <= last).collect()
            }
            _ => observed.into_iter().collect(),
        };

        let rows = by_label
            .into_iter()
            .map(|(label, cells)| Series {
                values: days.iter().map(|d| cells.get(d).copied()).collect(),
                label,
            })
            .collect();

        Self { days, rows, axis }
    }

    /// Collapses all rows into one `label` row holding each day's sum over
    /// the defined cells. A day with no defined cell stays undefined.
    pub fn column_totals(&self, label: &str) -> Self {
        let values = (0..self.days.len())
            .map(|col| {
                self.rows
                    .iter()
                    .filter_map(|row| row.values[col])
                    .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v))
            })
            .collect();

        self.with_rows(vec![Series {
            label: label.to_string(),
            values,
        }])
    }

    /// Applies the rolling mean and lagged percent change to every row.
    pub fn rolling_yoy(&self, window: usize, lag: usize) -> Self {
        self.with_rows(
            self.rows
                .iter()
                .map(|row| Series {
                    label: row.label.clone(),
                    values: self.yoy_of(&row.values, window, lag),
                })
                .collect(),
        )
    }

    /// Each row followed by its rolling mean (`<label>_ma<window>d`) and the
    /// year-over-year change of that mean (`<label>_chg_yoy`).
    pub fn yoy_breakdown(&self, window: usize, lag: usize) -> Self {
        let mut rows = Vec::with_capacity(self.rows.len() * 3);
        for row in &self.rows {
            rows.push(row.clone());
            rows.push(Series {
                label: format!("{}_ma{window}d", row.label),
                values: rolling_mean(&row.values, window),
            });
            rows.push(Series {
                label: format!("{}_chg_yoy", row.label),
                values: self.yoy_of(&row.values, window, lag),
            });
        }
        self.with_rows(rows)
    }

    fn yoy_of(&self, values: &[Option<f64>], window: usize, lag: usize) -> Vec<Option<f64>> {
        rolling_yoy(values, window, lag, self.axis == DayAxis::Observed)
    }

    fn with_rows(&self, rows: Vec<Series>) -> Self {
        Self {
            days: self.days.clone(),
            rows,
            axis: self.axis,
        }
    }

    pub fn row(&self, label: &str) -> Option<&Series> {
        self.rows.iter().find(|row| row.label == label)
    }

    pub fn get(&self, label: &str, day: NaiveDate) -> Option<f64> {
        let col = self.days.binary_search(&day).ok()?;
        self.row(label).and_then(|row| row.values[col])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2016, 1, d).unwrap()
    }

    fn cells() -> Vec<(String, NaiveDate, f64)> {
        vec![
            ("B".to_string(), day(1), 10.0),
            ("A".to_string(), day(1), 5.0),
            ("A".to_string(), day(4), 7.0),
        ]
    }

    #[test]
    fn test_pivot_observed_axis() {
        let m = DayMatrix::pivot(cells(), DayAxis::Observed);

        assert_eq!(m.days, vec![day(1), day(4)]);
        assert_eq!(m.rows[0].label, "A");
        assert_eq!(m.rows[0].values, vec![Some(5.0), Some(7.0)]);
        assert_eq!(m.rows[1].values, vec![Some(10.0), None]);
    }

    #[test]
    fn test_pivot_calendar_axis_fills_gaps() {
        let m = DayMatrix::pivot(cells(), DayAxis::Calendar);

        assert_eq!(m.days, vec![day(1), day(2), day(3), day(4)]);
        assert_eq!(m.rows[0].values, vec![Some(5.0), None, None, Some(7.0)]);
        assert_eq!(m.get("A", day(4)), Some(7.0));
        assert_eq!(m.get("B", day(2)), None);
    }

    #[test]
    fn test_pivot_keeps_last_duplicate() {
        let mut input = cells();
        input.push(("A".to_string(), day(1), 6.0));
        let m = DayMatrix::pivot(input, DayAxis::Observed);

        assert_eq!(m.get("A", day(1)), Some(6.0));
    }

    #[test]
    fn test_column_totals() {
        let m = DayMatrix::pivot(cells(), DayAxis::Calendar).column_totals("total");

        assert_eq!(m.rows.len(), 1);
        assert_eq!(m.rows[0].label, "total");
        assert_eq!(m.rows[0].values, vec![Some(15.0), None, None, Some(7.0)]);
    }

    #[test]
    fn test_pivot_empty() {
        let m = DayMatrix::pivot(Vec::new(), DayAxis::Calendar);
        assert!(m.is_empty());
        assert!(m.days.is_empty());
    }

    #[test]
    fn test_observed_axis_pads_gaps_before_change() {
        let cells = vec![
            ("A".to_string(), day(1), 10.0),
            ("B".to_string(), day(2), 1.0),
            ("A".to_string(), day(3), 20.0),
            ("A".to_string(), day(4), 30.0),
        ];

        let observed = DayMatrix::pivot(cells.clone(), DayAxis::Observed).rolling_yoy(1, 2);
        assert_eq!(observed.rows[0].values, vec![None, None, Some(1.0), Some(2.0)]);

        let calendar = DayMatrix::pivot(cells, DayAxis::Calendar).rolling_yoy(1, 2);
        assert_eq!(calendar.rows[0].values, vec![None, None, Some(1.0), None]);
    }

    #[test]
    fn test_yoy_breakdown() {
        let cells = (1..=4).map(|d| ("total".to_string(), day(d), f64::from(d) * 10.0));
        let m = DayMatrix::pivot(cells, DayAxis::Calendar).yoy_breakdown(2, 1);

        let labels: Vec<_> = m.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["total", "total_ma2d", "total_chg_yoy"]);
        assert_eq!(m.get("total", day(4)), Some(40.0));
        assert_eq!(
            m.row("total_ma2d").unwrap().values,
            vec![None, Some(15.0), Some(25.0), Some(35.0)]
        );
        assert_eq!(m.get("total_chg_yoy", day(2)), None);
        assert_eq!(m.get("total_chg_yoy", day(3)), Some(25.0 / 15.0 - 1.0));
    }
}
