//! Day-series analysis shared by both pipelines.
//!
//! Daily values are pivoted into a label × day [`matrix::DayMatrix`], then
//! smoothed with a trailing rolling mean and compared against the value a
//! year earlier.

pub mod matrix;
pub mod rolling;
pub mod utility;
