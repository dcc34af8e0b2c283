//! Envelope parsing and routing for Socket Mode messages.
//!
//! Slack Socket Mode delivers envelopes over WebSocket. Every business
//! envelope is acknowledged by the socket loop; this module turns the raw
//! frame into a [`ParsedMessage`] and routes `events_api` envelopes to the
//! event handlers. Slash commands and interactive payloads are not used by
//! this bot and are dropped after acknowledgement.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::ServerError;
use crate::handlers;
use crate::state::AppState;

/// A Socket Mode envelope received from Slack.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Unique identifier for this envelope, echoed back in the ack.
    pub envelope_id: String,

    /// The kind of payload contained in this envelope.
    pub envelope_type: EnvelopeType,

    /// Type-specific payload data.
    pub payload: serde_json::Value,
}

/// The kind of a Socket Mode envelope payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeType {
    /// An Events API callback (`link_shared`, `reaction_added`, ...).
    EventsApi,

    /// Any other envelope type (`slash_commands`, `interactive`).
    Unhandled(String),
}

/// Raw Socket Mode frame for initial deserialization.
#[derive(Debug, Deserialize)]
struct RawSocketMessage {
    #[serde(rename = "type")]
    msg_type: String,

    #[serde(default)]
    envelope_id: Option<String>,

    #[serde(default)]
    payload: Option<serde_json::Value>,
}

/// Result of parsing a raw Socket Mode frame.
#[derive(Debug)]
pub enum ParsedMessage {
    /// A `hello` frame confirming the connection.
    Hello,

    /// A `disconnect` frame asking the client to reconnect.
    Disconnect,

    /// An envelope that needs acknowledgement and handling.
    Envelope(Envelope),
}

/// Best-effort event type for logging (`event.type` inside the payload).
fn event_type(payload: Option<&serde_json::Value>) -> &str {
    payload
        .and_then(|p| p.get("event"))
        .and_then(|e| e.get("type"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Parses a raw text frame from the WebSocket.
///
/// Frames without `envelope_id` (other than `hello`/`disconnect`) are
/// skipped with a warning.
///
/// # Errors
///
/// Returns `ServerError::Dispatch` if the frame is not valid JSON.
pub fn parse_message(text: &str) -> Result<Option<ParsedMessage>, ServerError> {
    let raw: RawSocketMessage =
        serde_json::from_str(text).map_err(|e| ServerError::Dispatch(format!("Bad JSON: {e}")))?;

    match raw.msg_type.as_str() {
        "hello" => {
            info!("Received hello from Slack, connection established");
            Ok(Some(ParsedMessage::Hello))
        }
        "disconnect" => {
            info!("Received disconnect from Slack, will reconnect");
            Ok(Some(ParsedMessage::Disconnect))
        }
        other => {
            let Some(envelope_id) = raw.envelope_id else {
                warn!(msg_type = other, "Frame without envelope_id, ignoring");
                return Ok(None);
            };
            let envelope_type = if other == "events_api" {
                EnvelopeType::EventsApi
            } else {
                EnvelopeType::Unhandled(other.to_string())
            };
            debug!(
                envelope_id,
                envelope_type = ?envelope_type,
                event_type = event_type(raw.payload.as_ref()),
                "Parsed envelope"
            );
            Ok(Some(ParsedMessage::Envelope(Envelope {
                envelope_id,
                envelope_type,
                payload: raw.payload.unwrap_or(serde_json::Value::Null),
            })))
        }
    }
}

/// Routes an acknowledged envelope to its handler.
#[instrument(
    skip(state, envelope),
    fields(
        envelope_id = %envelope.envelope_id,
        envelope_type = ?envelope.envelope_type,
    )
)]
pub async fn dispatch(state: Arc<AppState>, envelope: Envelope) {
    match envelope.envelope_type {
        EnvelopeType::EventsApi => {
            handlers::events::handle_event(state, envelope.payload).await;
        }
        EnvelopeType::Unhandled(kind) => {
            debug!(kind, "Ignoring envelope type this bot does not handle");
        }
    }
}
