//! Provider contracts and backends
//!
//! The router depends only on [`StatusProvider`] and [`AnalyticsProvider`];
//! concrete backends live in the submodules.

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::{Intent, ResolvedRequest};

pub mod aviationstack;
pub mod stub;
pub mod warehouse;

pub use aviationstack::AviationStackClient;
pub use stub::{StubAnalyticsProvider, StubStatusProvider};
pub use warehouse::WarehouseClient;

/// Downstream failure, surfaced to the user as text by the router
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no matching rows: {0}")]
    NoRows(String),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = format!("HTTP {} - {}", status, body.trim());
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Forbidden(detail),
            StatusCode::NOT_FOUND => ProviderError::NotFound(detail),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout,
            s if s.is_client_error() => ProviderError::BadRequest(detail),
            _ => ProviderError::Other(detail),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::Connection(e.to_string())
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::from_status(status, "")
        } else {
            ProviderError::Other(e.to_string())
        }
    }
}

/// Looks up live flight status
pub trait StatusProvider {
    fn get_status(&self, flight_number: &str) -> Result<String, ProviderError>;
}

/// Runs fare and delay analyses over historical data
pub trait AnalyticsProvider {
    /// Whether this backend can serve the given analysis
    fn supports(&self, _intent: Intent) -> bool {
        true
    }

    fn run_analysis(&self, request: &ResolvedRequest) -> Result<String, ProviderError>;
}
