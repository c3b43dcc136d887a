//! Named failures that callers match on.
//!
//! Orchestration code still returns `anyhow::Result`; these enums cover the
//! cases where the caller decides what to do next (skip a file, retry a
//! fetch, drop a spreadsheet).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file name {0:?} does not match *Turnstile_Usage_Data__<year>.csv")]
    UnrecognizedFileName(PathBuf),
    #[error("no usable turnstile files found in {0:?}")]
    NoInput(PathBuf),
}

/// Outcome of a failed HTTP fetch, classified by whether another attempt
/// could succeed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient fetch failure for {url}: {reason}")]
    Transient { url: String, reason: String },
    #[error("permanent fetch failure for {url}: {reason}")]
    Permanent { url: String, reason: String },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    /// Classifies a `reqwest` error raised while sending or reading a request.
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let reason = err.to_string();
        let url = url.to_string();
        if err.is_builder() || err.is_redirect() {
            return FetchError::Permanent { url, reason };
        }
        match err.status() {
            Some(status) if Self::status_is_retryable(status) => {
                FetchError::Transient { url, reason }
            }
            Some(_) => FetchError::Permanent { url, reason },
            None => FetchError::Transient { url, reason },
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(url: &str, status: reqwest::StatusCode) -> Self {
        let reason = format!("HTTP {status}");
        let url = url.to_string();
        if Self::status_is_retryable(status) {
            FetchError::Transient { url, reason }
        } else {
            FetchError::Permanent { url, reason }
        }
    }

    fn status_is_retryable(status: reqwest::StatusCode) -> bool {
        status.is_server_error()
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
    }
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("could not open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no worksheets")]
    Empty,
    #[error("no header row containing \"Data\" in the first two rows")]
    MissingHeader,
}
