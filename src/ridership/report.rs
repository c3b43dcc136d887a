//! Daily bus-ridership series built from the store.

use anyhow::Result;

use crate::analyzers::matrix::DayMatrix;
use crate::config::SeriesConfig;
use crate::ridership::store::RidershipStore;

pub const TOTAL_LABEL: &str = "total_passengers";

/// Daily total passengers and its rolling-mean year-over-year change.
pub struct RidershipReport {
    pub daily: DayMatrix,
    /// `daily`, its rolling mean and the year-over-year change of that mean.
    pub yoy: DayMatrix,
}

/// Builds the report from every date in `store`.
pub fn daily_report(store: &RidershipStore, config: &SeriesConfig) -> Result<RidershipReport> {
    let totals = store.daily_totals()?;
    let daily = DayMatrix::pivot(
        totals
            .into_iter()
            .map(|(date, total)| (TOTAL_LABEL.to_string(), date, total)),
        config.day_axis,
    );
    let yoy = daily.yoy_breakdown(config.window, config.lag);
    Ok(RidershipReport { daily, yoy })
}
