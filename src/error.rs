//! Error types shared by the data-source boundary and the loaders built on it.

use thiserror::Error;

use crate::address::AddressError;

/// Failure of a single request against the analytics proxy.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success status; `message` is the proxy's `{ "error": ... }` payload when present.
    #[error("{endpoint} request failed ({status}): {message}")]
    Status {
        endpoint: &'static str,
        status: u16,
        message: String,
    },

    /// Body did not match the expected schema.
    #[error("unexpected {endpoint} response: {reason}")]
    Schema {
        endpoint: &'static str,
        reason: String,
    },
}

impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

/// Failure of a whole holder load. Rendered to the UI as one message.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    #[error("Holders API {0}")]
    Holders(#[source] SourceError),

    #[error("No holder data found for this token")]
    NoHolders,
}
