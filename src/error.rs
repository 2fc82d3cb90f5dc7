//! Error types shared across the market-data, backend and search layers.

use thiserror::Error;

/// Failure of a single market-data fetch attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, CORS relay down, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("{origin} response was not ok ({status})")]
    Status { origin: &'static str, status: u16 },

    /// The body could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// A well-formed response without a usable payload.
    #[error("{0}")]
    Empty(&'static str),
}

impl FetchError {
    /// Whether the attempt failed in transport and is worth a second route.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Empty(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Errors returned by the MarketBrief backend client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("no data returned for {0}")]
    Empty(String),

    /// The envelope came back with `success = false`.
    #[error("{0}")]
    Rejected(String),

    /// 401: the session is gone and the user must log in again.
    #[error("session expired, please log in again")]
    AuthExpired,

    /// 403: possibly unauthenticated; not fatal.
    #[error("access forbidden, authentication may have expired")]
    AuthAmbiguous,

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Rejected search input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Please enter a valid stock symbol")]
    Empty,

    #[error("Stock symbol should only contain letters and dots (e.g., TCS.NS)")]
    Invalid,
}
