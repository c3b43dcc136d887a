//! Sums filtered deltas into one value per station and calendar day.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::turnstile::types::{PeriodDelta, StationDay};

/// Groups deltas by (station, day of timestamp) and sums them. Output is
/// sorted by station, then day.
pub fn daily_totals(deltas: &[PeriodDelta]) -> Vec<StationDay> {
    let mut sums: BTreeMap<(&str, NaiveDate), f64> = BTreeMap::new();
    for d in deltas {
        *sums
            .entry((d.id.station.as_str(), d.timestamp.date()))
            .or_insert(0.0) += d.delta;
    }

    sums.into_iter()
        .map(|((station, day), value)| StationDay {
            station: station.to_string(),
            day,
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turnstile::types::TurnstileId;
    use std::sync::Arc;

    fn delta(station: &str, scp: &str, day: u32, hour: u32, value: f64) -> PeriodDelta {
        PeriodDelta {
            id: Arc::new(TurnstileId {
                control_area: "N329".into(),
                unit: "R201".into(),
                scp: scp.into(),
                station: station.into(),
                line_name: "EMR".into(),
                division: "IND".into(),
            }),
            timestamp: NaiveDate::from_ymd_opt(2017, 6, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            delta: value,
        }
    }

    #[test]
    fn test_same_day_deltas_sum() {
        let rows = daily_totals(&[
            delta("ELMHURST AV", "00", 1, 4, 120.0),
            delta("ELMHURST AV", "01", 1, 20, 80.0),
            delta("ELMHURST AV", "00", 2, 0, 30.0),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].day, NaiveDate::from_ymd_opt(2017, 6, 1).unwrap());
        assert_eq!(rows[0].value, 200.0);
        assert_eq!(rows[1].value, 30.0);
    }

    #[test]
    fn test_stations_stay_separate() {
        let rows = daily_totals(&[
            delta("WOODHAVEN BLVD", "00", 1, 4, 5.0),
            delta("ELMHURST AV", "00", 1, 4, 7.0),
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].station, "ELMHURST AV");
        assert_eq!(rows[1].station, "WOODHAVEN BLVD");
    }
}
