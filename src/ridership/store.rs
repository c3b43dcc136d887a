//! SQLite sink for ridership rows.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, ToSql};
use std::path::Path;
use std::time::Duration;

use crate::ridership::sheet::{COUNT_FIELDS, KEY_FIELDS, RidershipRow};

const TABLE: &str = "sptrans";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct RidershipStore {
    conn: Connection,
}

impl RidershipStore {
    /// Opens (or creates) the database at `path` and ensures the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        // Collector workers write concurrently, each through its own connection.
        conn.busy_timeout(Duration::from_secs(30))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let keys = KEY_FIELDS
            .iter()
            .map(|k| format!("{k} TEXT NOT NULL"))
            .collect::<Vec<_>>()
            .join(", ");
        let counts = COUNT_FIELDS
            .iter()
            .map(|c| format!("{c} INTEGER NOT NULL DEFAULT 0"))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} ({keys}, {counts}, \
             PRIMARY KEY ({}) ON CONFLICT REPLACE)",
            KEY_FIELDS.join(", ")
        ))?;
        Ok(Self { conn })
    }

    /// Inserts `rows` in one transaction. A row whose key already exists
    /// replaces the stored one. Returns the number of rows written.
    pub fn insert_batch(&mut self, rows: &[RidershipRow]) -> Result<usize> {
        let columns: Vec<&str> = KEY_FIELDS.iter().chain(COUNT_FIELDS.iter()).copied().collect();
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {TABLE} ({}) VALUES ({placeholders})",
            columns.join(", ")
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                let date = row.date.format(DATE_FORMAT).to_string();
                let mut params: Vec<&dyn ToSql> = vec![
                    &date as &dyn ToSql,
                    &row.kind,
                    &row.area,
                    &row.company,
                    &row.line,
                ];
                params.extend(row.counts.iter().map(|c| c as &dyn ToSql));
                stmt.execute(params.as_slice())?;
            }
        }
        tx.commit()?;

        Ok(rows.len())
    }

    /// Total passengers per date, in date order.
    pub fn daily_totals(&self) -> Result<Vec<(NaiveDate, f64)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT date, SUM(total_passengers) FROM {TABLE} GROUP BY date ORDER BY date"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut totals = Vec::new();
        for row in rows {
            let (date, total) = row?;
            let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
                .with_context(|| format!("bad stored date {date:?}"))?;
            totals.push((date, total as f64));
        }
        Ok(totals)
    }

    pub fn row_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, line: &str, total: i64) -> RidershipRow {
        let mut counts = [0; COUNT_FIELDS.len()];
        counts[13] = total;
        RidershipRow {
            date: NaiveDate::from_ymd_opt(2019, 1, day).unwrap(),
            kind: "ÔNIBUS".into(),
            area: "AREA 1".into(),
            company: "TRANSWOLFF".into(),
            line: line.into(),
            counts,
        }
    }

    #[test]
    fn test_total_passengers_index() {
        assert_eq!(COUNT_FIELDS[13], "total_passengers");
    }

    #[test]
    fn test_insert_and_daily_totals() {
        let mut store = RidershipStore::open_in_memory().unwrap();
        store
            .insert_batch(&[row(1, "6030-10", 100), row(1, "6091-10", 50), row(2, "6030-10", 70)])
            .unwrap();

        let totals = store.daily_totals().unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0], (NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), 150.0));
        assert_eq!(totals[1].1, 70.0);
    }

    #[test]
    fn test_conflicting_key_replaces_row() {
        let mut store = RidershipStore::open_in_memory().unwrap();
        store.insert_batch(&[row(1, "6030-10", 100)]).unwrap();
        store.insert_batch(&[row(1, "6030-10", 40)]).unwrap();

        assert_eq!(store.row_count().unwrap(), 1);
        assert_eq!(store.daily_totals().unwrap()[0].1, 40.0);
    }
}
