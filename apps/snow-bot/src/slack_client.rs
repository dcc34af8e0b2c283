//! Thin async client for Slack Web API methods used by snow-bot.
//!
//! Wraps `reqwest::Client` with the bot token for authorization and provides
//! typed methods for the Slack endpoints needed by this application.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ServerError;

/// Base URL for Slack Web API.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Thin async client for Slack Web API methods used by snow-bot.
///
/// All methods authenticate with the bot token (`xoxb-...`) except
/// [`connections_open`](Self::connections_open) which uses the app-level
/// token (`xapp-...`) passed as a parameter.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    bot_token: String,
    api_base: String,
}

/// A message read back from `conversations.history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    /// Message timestamp.
    pub ts: String,

    /// Message text (empty for block-only messages).
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default)]
    email: Option<String>,
}

/// Generic Slack API response envelope for deserialization.
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
    #[serde(default)]
    profile: Option<Profile>,
}

impl SlackClient {
    /// Creates a new Slack Web API client with the given bot token.
    pub fn new(bot_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            api_base: SLACK_API_BASE.to_string(),
        }
    }

    /// Sends Web API calls to `api_base` instead of `https://slack.com/api`.
    #[cfg(test)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Attaches link previews to a message via `chat.unfurl`.
    ///
    /// `unfurls` maps each shared URL to an object with a `blocks` array.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the API call fails or returns an error.
    pub async fn chat_unfurl(
        &self,
        channel: &str,
        ts: &str,
        unfurls: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), ServerError> {
        debug!(channel, ts, count = unfurls.len(), "Unfurling links");
        let body = serde_json::json!({
            "channel": channel,
            "ts": ts,
            "unfurls": unfurls,
        });
        self.call_bot_api("chat.unfurl", &body).await?;
        Ok(())
    }

    /// Posts Block Kit blocks as a reply in a thread.
    ///
    /// `fallback` is the plain-text notification body. Returns the
    /// timestamp of the reply.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the API call fails or returns an error.
    pub async fn post_thread_blocks(
        &self,
        channel: &str,
        thread_ts: &str,
        fallback: &str,
        blocks: Vec<serde_json::Value>,
    ) -> Result<String, ServerError> {
        let body = serde_json::json!({
            "channel": channel,
            "thread_ts": thread_ts,
            "text": fallback,
            "blocks": blocks,
        });
        debug!(channel, thread_ts, "Posting thread reply");
        let resp = self.call_bot_api("chat.postMessage", &body).await?;
        resp.ts.ok_or_else(|| {
            ServerError::SlackApi("chat.postMessage thread reply missing 'ts'".into())
        })
    }

    /// Reads the single message posted at `ts` in `channel`.
    ///
    /// The window is pinned to `ts` on both ends so a newer message is never
    /// returned instead. Returns `None` if the window is empty (message
    /// deleted, a thread reply, or not visible to the bot).
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the API call fails or returns an error.
    pub async fn message_at(
        &self,
        channel: &str,
        ts: &str,
    ) -> Result<Option<HistoryMessage>, ServerError> {
        debug!(channel, ts, "Reading message from history");
        let resp = self
            .call_bot_form(
                "conversations.history",
                &[
                    ("channel", channel),
                    ("oldest", ts),
                    ("latest", ts),
                    ("inclusive", "true"),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(resp.messages.into_iter().next())
    }

    /// Publishes a Home tab view for a user.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the API call fails or returns an error.
    pub async fn views_publish(
        &self,
        user_id: &str,
        view: serde_json::Value,
    ) -> Result<(), ServerError> {
        let body = serde_json::json!({
            "user_id": user_id,
            "view": view,
        });
        debug!(user_id, "Publishing home view");
        self.call_bot_api("views.publish", &body).await?;
        Ok(())
    }

    /// Returns the email on a user's profile, if the bot may see it.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the API call fails or returns an error.
    pub async fn user_email(&self, user_id: &str) -> Result<Option<String>, ServerError> {
        debug!(user_id, "Reading user profile");
        let resp = self
            .call_bot_form("users.profile.get", &[("user", user_id)])
            .await?;
        Ok(resp.profile.and_then(|p| p.email))
    }

    /// Opens a Socket Mode connection and returns the WebSocket URL.
    ///
    /// Uses the app-level token (`xapp-...`) rather than the bot token.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::SlackApi` if the API call fails or returns an error.
    pub async fn connections_open(&self, app_token: &str) -> Result<String, ServerError> {
        debug!("Opening Socket Mode connection");
        let method = "apps.connections.open";
        let resp = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(app_token)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await
            .map_err(|e| ServerError::SlackApi(format!("{method} request failed: {e}")))?;

        let api_resp = Self::read_response(method, resp).await?;
        api_resp
            .url
            .ok_or_else(|| ServerError::SlackApi(format!("{method} response missing 'url'")))
    }

    /// Sends a JSON POST request to a Slack Web API method using the bot token.
    async fn call_bot_api(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<SlackApiResponse, ServerError> {
        let resp = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ServerError::SlackApi(format!("{method} request failed: {e}")))?;
        Self::read_response(method, resp).await
    }

    /// Sends a form-encoded POST; read methods such as
    /// `conversations.history` do not accept JSON bodies.
    async fn call_bot_form(
        &self,
        method: &str,
        form: &[(&str, &str)],
    ) -> Result<SlackApiResponse, ServerError> {
        let resp = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .form(form)
            .send()
            .await
            .map_err(|e| ServerError::SlackApi(format!("{method} request failed: {e}")))?;
        Self::read_response(method, resp).await
    }

    async fn read_response(
        method: &str,
        resp: reqwest::Response,
    ) -> Result<SlackApiResponse, ServerError> {
        let api_resp: SlackApiResponse = resp
            .json()
            .await
            .map_err(|e| ServerError::SlackApi(format!("{method} response parse failed: {e}")))?;

        if !api_resp.ok {
            let error_msg = api_resp.error.as_deref().unwrap_or("unknown");
            warn!(method, error = error_msg, "Slack API error");
            return Err(ServerError::SlackApi(format!(
                "{method} error: {error_msg}"
            )));
        }

        Ok(api_resp)
    }
}
