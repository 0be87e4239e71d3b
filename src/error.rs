//! Error taxonomy for the sales fetch path.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesError {
    /// Missing or malformed caller input. Never retried.
    #[error("{0}")]
    InvalidRequest(String),

    /// The upstream credential (or another setting) is absent or unusable.
    #[error("{0}")]
    Configuration(String),

    /// The upstream answered with a non-2xx status.
    #[error("API request failed: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("API request timed out on page {page} after {after:?}")]
    Timeout { page: u32, after: Duration },

    #[error("Failed to fetch data from API: {0}")]
    Network(String),

    /// The upstream answered 2xx but the body was not the expected JSON.
    #[error("Invalid response from API: {0}")]
    InvalidResponse(String),
}

impl SalesError {
    /// Returns `true` when the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SalesError::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, SalesError>;
