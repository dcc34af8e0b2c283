//! Error types for ServiceNow access and ticket normalisation.
//!
//! Defines `SnowError` as the error type for every operation in
//! `snow-core`. Nothing in this crate catches or retries these errors; they
//! propagate to the caller.

use thiserror::Error;

/// Error type for snow-core operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnowError {
    /// Malformed input such as a ticket URL without `sys_id`, or a raw
    /// record that lacks the fields needed to build a link.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The table API answered with a non-2xx status.
    #[error("HTTP error: {status} from {url}")]
    Http {
        /// Response status code.
        status: u16,
        /// Request URL, without credentials.
        url: String,
    },

    /// The response body was not JSON or lacked the expected `result`.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A by-number lookup matched no record.
    #[error("No {table} record with number {number}")]
    NotFound {
        /// Table that was queried.
        table: String,
        /// Effective number that was searched for.
        number: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
