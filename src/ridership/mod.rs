//! Daily bus ridership collected from the municipal spreadsheet archive.
//!
//! Listing pages link to one spreadsheet per day. Sheets are downloaded by a
//! small worker pool, normalized, stored in SQLite and later summarized into
//! a daily series.

pub mod catalog;
pub mod collector;
pub mod report;
pub mod sheet;
pub mod store;
