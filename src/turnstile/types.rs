//! Data types used by the turnstile pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;

/// Composite key of one physical counting device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnstileId {
    pub control_area: String,
    pub unit: String,
    pub scp: String,
    pub station: String,
    pub line_name: String,
    pub division: String,
}

/// One cumulative counter sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub id: TurnstileId,
    pub timestamp: NaiveDateTime,
    pub entries: f64,
}

/// Per-period count of one turnstile: the forward-filled cumulative value
/// minus the previous one. Deltas of one turnstile share its id.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodDelta {
    pub id: Arc<TurnstileId>,
    pub timestamp: NaiveDateTime,
    pub delta: f64,
}

/// Summed entries of one station over one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct StationDay {
    pub station: String,
    pub day: NaiveDate,
    pub value: f64,
}

/// A single row of a raw turnstile usage CSV.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRow {
    #[serde(rename = "C/A")]
    pub(crate) control_area: String,
    #[serde(rename = "Unit")]
    pub(crate) unit: String,
    #[serde(rename = "SCP")]
    pub(crate) scp: String,
    #[serde(rename = "Station")]
    pub(crate) station: String,
    #[serde(rename = "Line Name")]
    pub(crate) line_name: String,
    #[serde(rename = "Division")]
    pub(crate) division: String,
    #[serde(rename = "Date")]
    pub(crate) date: String,
    #[serde(rename = "Time")]
    pub(crate) time: String,
    #[serde(rename = "Entries")]
    pub(crate) entries: String,
}
