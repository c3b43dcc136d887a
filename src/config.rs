//! Tunables for the turnstile pipeline, the daily series and the ridership
//! collector.

use clap::ValueEnum;

/// What to do with a turnstile whose retained deltas all share one value.
///
/// The z-score of such a column is 0/0. `Reject` drops every value of the
/// column, `Keep` lets them all through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ZeroVariancePolicy {
    #[default]
    Reject,
    Keep,
}

/// Which day axis the rolling mean and year-over-year lag run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DayAxis {
    /// Every calendar day between the first and last observed day, with
    /// empty cells where nothing was observed. A lag of 365 is 365 days.
    #[default]
    Calendar,
    /// Only days that were observed. A lag of 365 is 365 columns, and an
    /// undefined rolling mean is padded with the last defined one before the
    /// percent change is taken.
    Observed,
}

/// Rolling mean and year-over-year settings shared by every daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesConfig {
    pub window: usize,
    pub lag: usize,
    pub day_axis: DayAxis,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            window: 7,
            lag: 365,
            day_axis: DayAxis::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnstileConfig {
    pub z_threshold: f64,
    /// Station-day aggregates with an absolute value at or above this are dropped.
    pub plausibility_cap: f64,
    pub zero_variance: ZeroVariancePolicy,
    pub series: SeriesConfig,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            z_threshold: 3.0,
            plausibility_cap: 5_000_000.0,
            zero_variance: ZeroVariancePolicy::default(),
            series: SeriesConfig::default(),
        }
    }
}

/// Listing pages of the monthly bus-ridership spreadsheets, newest first.
pub const DEFAULT_LISTING_URLS: &[&str] = &[
    "https://www.prefeitura.sp.gov.br/cidade/secretarias/transportes/institucional/sptrans/acesso_a_informacao/agenda/index.php?p=292723",
    "https://www.prefeitura.sp.gov.br/cidade/secretarias/transportes/institucional/sptrans/acesso_a_informacao/index.php?p=269652",
    "https://www.prefeitura.sp.gov.br/cidade/secretarias/transportes/institucional/sptrans/acesso_a_informacao/index.php?p=247850",
    "https://www.prefeitura.sp.gov.br/cidade/secretarias/transportes/institucional/sptrans/acesso_a_informacao/index.php?p=228269",
    "https://www.prefeitura.sp.gov.br/cidade/secretarias/transportes/institucional/sptrans/acesso_a_informacao/index.php?p=209427",
];

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub listing_urls: Vec<String>,
    pub workers: usize,
    pub max_attempts: usize,
    pub db_path: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            // Pages older than the third use a different column layout.
            listing_urls: DEFAULT_LISTING_URLS[..3]
                .iter()
                .map(|u| u.to_string())
                .collect(),
            workers: 3,
            max_attempts: 10,
            db_path: "sptrans.db".to_string(),
        }
    }
}
