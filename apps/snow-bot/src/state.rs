//! Shared application state for snow-bot.
//!
//! [`AppState`] is built once in `main` and passed as `Arc<AppState>` to
//! every handler. It holds no mutable data: each event builds its own
//! request state.

use snow_core::SnowClient;

use crate::config::TicketPatterns;
use crate::slack_client::SlackClient;

/// Bot version shown on the Home tab.
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// Shared application state, passed as `Arc<AppState>` to all handlers.
#[derive(Debug)]
pub struct AppState {
    slack: SlackClient,
    snow: SnowClient,
    patterns: TicketPatterns,
    reaction: String,
    app_id: Option<String>,
}

impl AppState {
    /// Creates the state from already-constructed clients.
    pub fn new(
        slack: SlackClient,
        snow: SnowClient,
        patterns: TicketPatterns,
        reaction: impl Into<String>,
        app_id: Option<String>,
    ) -> Self {
        Self {
            slack,
            snow,
            patterns,
            reaction: reaction.into(),
            app_id,
        }
    }

    /// Returns the Slack Web API client.
    pub fn slack(&self) -> &SlackClient {
        &self.slack
    }

    /// Returns the ServiceNow client.
    pub fn snow(&self) -> &SnowClient {
        &self.snow
    }

    /// Returns the compiled ticket-number patterns.
    pub fn patterns(&self) -> &TicketPatterns {
        &self.patterns
    }

    /// Returns the reaction name that triggers a lookup.
    pub fn reaction(&self) -> &str {
        &self.reaction
    }

    /// Returns `true` if `app_id` is this bot's own app.
    pub fn is_own_app(&self, app_id: Option<&str>) -> bool {
        matches!((self.app_id.as_deref(), app_id), (Some(own), Some(other)) if own == other)
    }
}
