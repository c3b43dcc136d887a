//! Decoding of one daily ridership spreadsheet.
//!
//! Header names drift between publications, so every known variant is
//! mapped onto a fixed field name before rows are summed per key.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::io::Cursor;

use crate::error::SheetError;

/// Key columns, in key order.
pub const KEY_FIELDS: [&str; 5] = ["date", "type", "area", "company", "line"];

/// Passenger-count columns, in storage order.
pub const COUNT_FIELDS: [&str; 15] = [
    "cash_passengers",
    "normal_passengers",
    "monthly_normal_passengers",
    "students_passengers",
    "monthly_students_passengers",
    "vt_passengers",
    "monthly_vt_passengers",
    "int_cptm_passengers",
    "monthly_int_cptm_passengers",
    "paying_passengers",
    "int_bus_passengers",
    "free_pass_passengers",
    "free_pass_student_passengers",
    "total_passengers",
    "vt_and_normal_passengers",
];

/// Published header → field name.
static HEADER_SYNONYMS: &[(&str, &str)] = &[
    ("Data", "date"),
    ("Tipo", "type"),
    ("Area", "area"),
    ("Empresa", "company"),
    ("Linha", "line"),
    ("Passageiros Pagtes Em Dinheiro", "cash_passengers"),
    ("Passageiros Pagtes Comum", "normal_passengers"),
    ("Passageiros Pgts Bu Comum M", "monthly_normal_passengers"),
    ("Passageiros Pagtes Estudante", "students_passengers"),
    ("Passageiros Pgts Bu Est Mensal", "monthly_students_passengers"),
    ("Passageiros Pagtes Bu Vt", "vt_passengers"),
    ("Passageiros Pgts Bu Vt Mensal", "monthly_vt_passengers"),
    ("Passageiros Pagtes Int M/Cptm", "int_cptm_passengers"),
    ("Passageiros Pgts Int M/Cptm M", "monthly_int_cptm_passengers"),
    ("Passageiros Pagantes", "paying_passengers"),
    ("Passageiros Int Ônibus->Ônibus", "int_bus_passengers"),
    ("Passageiros Com Gratuidade", "free_pass_passengers"),
    ("Passageiros Com Gratuidade Est", "free_pass_student_passengers"),
    ("Tot Passageiros Transportados", "total_passengers"),
    ("Passageiros Comum e VT", "vt_and_normal_passengers"),
];

/// Ridership of one line for one day, summed over its spreadsheet rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RidershipRow {
    pub date: NaiveDate,
    pub kind: String,
    pub area: String,
    pub company: String,
    pub line: String,
    /// Aligned with [`COUNT_FIELDS`]; absent columns are zero.
    pub counts: [i64; COUNT_FIELDS.len()],
}

impl RidershipRow {
    pub fn count(&self, field: &str) -> Option<i64> {
        COUNT_FIELDS
            .iter()
            .position(|f| *f == field)
            .map(|i| self.counts[i])
    }
}

/// Maps a published header onto its field name.
pub fn normalize_header(header: &str) -> Option<&'static str> {
    let header = header.trim();
    HEADER_SYNONYMS
        .iter()
        .find(|(published, _)| published.eq_ignore_ascii_case(header))
        .map(|(_, field)| *field)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_count(cell: &Data) -> i64 {
    match cell {
        Data::Int(i) => *i,
        Data::Float(f) => f.round() as i64,
        Data::String(s) => s.trim().parse::<f64>().map(|v| v.round() as i64).unwrap_or(0),
        _ => 0,
    }
}

fn is_blank(row: &[Data]) -> bool {
    row.iter().all(|c| cell_text(c).is_empty())
}

fn has_date_header(row: &[Data]) -> bool {
    row.iter().any(|c| normalize_header(&cell_text(c)) == Some("date"))
}

/// Column → field mapping of a header row.
enum Column {
    Key(usize),
    Count(usize),
    Ignored,
}

fn map_columns(header: &[Data]) -> Vec<Column> {
    header
        .iter()
        .map(|cell| match normalize_header(&cell_text(cell)) {
            Some(field) => KEY_FIELDS
                .iter()
                .position(|k| *k == field)
                .map(Column::Key)
                .or_else(|| COUNT_FIELDS.iter().position(|c| *c == field).map(Column::Count))
                .unwrap_or(Column::Ignored),
            None => Column::Ignored,
        })
        .collect()
}

/// Builds ridership rows from worksheet rows.
///
/// The header is the first non-blank row if it names a `Data` column,
/// otherwise the one after it. Every row is stamped with `date`, rows with
/// an empty key cell are dropped, and rows sharing a key are summed.
pub fn parse_rows<'a, I>(rows: I, date: NaiveDate) -> Result<Vec<RidershipRow>, SheetError>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut rows = rows.into_iter().filter(|r| !is_blank(r));

    let first = rows.next().ok_or(SheetError::MissingHeader)?;
    let header = if has_date_header(first) {
        first
    } else {
        rows.next()
            .filter(|r| has_date_header(r))
            .ok_or(SheetError::MissingHeader)?
    };
    let columns = map_columns(header);

    let mut sums: BTreeMap<[String; 4], [i64; COUNT_FIELDS.len()]> = BTreeMap::new();
    for row in rows {
        let mut key: [String; 4] = Default::default();
        let mut counts = [0i64; COUNT_FIELDS.len()];

        for (cell, column) in row.iter().zip(&columns) {
            match column {
                // The date comes from the link, not the sheet.
                Column::Key(0) => {}
                Column::Key(k) => key[k - 1] = cell_text(cell),
                Column::Count(c) => counts[*c] = cell_count(cell),
                Column::Ignored => {}
            }
        }

        if key.iter().any(String::is_empty) {
            continue;
        }

        let total = sums.entry(key).or_insert([0; COUNT_FIELDS.len()]);
        for (acc, v) in total.iter_mut().zip(counts) {
            *acc += v;
        }
    }

    Ok(sums
        .into_iter()
        .map(|([kind, area, company, line], counts)| RidershipRow {
            date,
            kind,
            area,
            company,
            line,
            counts,
        })
        .collect())
}

/// Decodes the first worksheet of an `.xls`/`.xlsx` document.
pub fn parse_sheet(bytes: Vec<u8>, date: NaiveDate) -> Result<Vec<RidershipRow>, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(SheetError::Empty)??;
    parse_rows(range.rows(), date)
}
