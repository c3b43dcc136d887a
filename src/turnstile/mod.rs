//! Daily station entries from yearly turnstile usage dumps.
//!
//! Each file is loaded, split by station, differenced per turnstile,
//! filtered for resets and outliers, and summed per day. The yearly results
//! are merged into a station × day matrix.

pub mod aggregate;
pub mod differencer;
pub mod filter;
pub mod loader;
pub mod merge;
pub mod pipeline;
pub mod types;
