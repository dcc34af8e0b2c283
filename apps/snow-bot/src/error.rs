//! Error types for the snow-bot application.
//!
//! Defines [`ServerError`] as the error type for everything on the Slack
//! side of the bot. ServiceNow failures arrive wrapped as
//! [`ServerError::Snow`].

use thiserror::Error;

/// Error type for snow-bot operations.
///
/// Variants are grouped by subsystem: configuration, Slack API communication,
/// WebSocket transport, envelope dispatch and ServiceNow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// A configuration error (missing or invalid config file/values).
    #[error("Config error: {0}")]
    Config(String),

    /// An error from a Slack Web API call.
    #[error("Slack API error: {0}")]
    SlackApi(String),

    /// A WebSocket transport error (connection, read, write).
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An error while parsing or routing an envelope.
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// An error from the ServiceNow side.
    #[error(transparent)]
    Snow(#[from] snow_core::SnowError),
}
