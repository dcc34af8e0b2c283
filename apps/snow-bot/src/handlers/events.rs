//! Events API handler for Slack Socket Mode envelopes.
//!
//! Routes `link_shared` to link unfurling, `reaction_added` to ticket-number
//! lookups, and `app_home_opened` to the Home tab. Plain `message` events
//! are only logged.
//!
//! A failed ticket lookup never produces a reply: it is logged and the
//! remaining links or matches are still processed.

use std::sync::Arc;

use serde::Deserialize;
use snow_core::{RecordKind, parse_ticket_url};
use tracing::{debug, error, info, instrument, warn};

use crate::error::ServerError;
use crate::formatter;
use crate::state::{AppState, VERSION};

/// Events API wrapper envelope containing the inner event.
#[derive(Debug, Deserialize)]
struct EventsApiPayload {
    event: EventPayload,
}

/// The inner event payload, tagged by its `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum EventPayload {
    #[serde(rename = "link_shared")]
    LinkShared(LinkSharedEvent),

    #[serde(rename = "reaction_added")]
    ReactionAdded(ReactionAddedEvent),

    #[serde(rename = "app_home_opened")]
    AppHomeOpened(AppHomeOpenedEvent),

    #[serde(rename = "message")]
    Message(MessageEvent),

    /// Any other event type, ignored.
    #[serde(other)]
    Other,
}

/// Links posted in a message in one of the app's unfurl domains.
#[derive(Debug, Deserialize)]
struct LinkSharedEvent {
    channel: String,
    message_ts: String,
    #[serde(default)]
    links: Vec<SharedLink>,
}

#[derive(Debug, Deserialize)]
struct SharedLink {
    url: String,
}

/// A reaction added to an item the bot can see.
#[derive(Debug, Deserialize)]
struct ReactionAddedEvent {
    #[serde(default)]
    user: Option<String>,
    reaction: String,
    item: ReactionItem,
}

#[derive(Debug, Deserialize)]
struct ReactionItem {
    #[serde(rename = "type")]
    item_type: String,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppHomeOpenedEvent {
    user: String,
    #[serde(default)]
    tab: Option<String>,
}

/// A message event. Only used for logging.
#[derive(Debug, Deserialize)]
struct MessageEvent {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    app_id: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

/// Handles an Events API envelope payload.
#[instrument(skip(state, payload))]
pub async fn handle_event(state: Arc<AppState>, payload: serde_json::Value) {
    let events_payload: EventsApiPayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Failed to parse events_api payload");
            return;
        }
    };

    match events_payload.event {
        EventPayload::LinkShared(ev) => handle_link_shared(&state, ev).await,
        EventPayload::ReactionAdded(ev) => handle_reaction_added(&state, ev).await,
        EventPayload::AppHomeOpened(ev) => handle_app_home_opened(&state, ev).await,
        EventPayload::Message(msg) => handle_message(&state, &msg),
        EventPayload::Other => debug!("Ignoring unsupported event type"),
    }
}

/// Unfurls every ServiceNow link in the message with one `chat.unfurl`.
#[instrument(skip(state, ev), fields(channel = %ev.channel, ts = %ev.message_ts))]
async fn handle_link_shared(state: &AppState, ev: LinkSharedEvent) {
    info!(links = ev.links.len(), "Link shared event");

    let mut unfurls = serde_json::Map::new();
    for link in &ev.links {
        if !link.url.contains("sys_id") || !link.url.contains("/target/") {
            debug!(url = link.url, "Not a ServiceNow record link");
            continue;
        }
        match unfurl_link(state, &link.url).await {
            Ok(Some(card)) => {
                unfurls.insert(link.url.clone(), card);
            }
            Ok(None) => debug!(url = link.url, "Unsupported ServiceNow table"),
            Err(e) => warn!(url = link.url, error = %e, "Failed to unfurl link"),
        }
    }

    if unfurls.is_empty() {
        return;
    }
    if let Err(e) = state
        .slack()
        .chat_unfurl(&ev.channel, &ev.message_ts, unfurls)
        .await
    {
        warn!(error = %e, "chat.unfurl failed");
    }
}

/// Builds the unfurl for one link, or `None` if its table is unsupported.
async fn unfurl_link(
    state: &AppState,
    url: &str,
) -> Result<Option<serde_json::Value>, ServerError> {
    let target = parse_ticket_url(url)?;
    let Ok(kind) = target.table.parse::<RecordKind>() else {
        return Ok(None);
    };
    debug!(kind = %kind, record_id = target.record_id, "Resolved link target");
    let ticket = state.snow().ticket_by_id(kind, &target.record_id).await?;
    Ok(Some(formatter::unfurl(&ticket)))
}

/// Replies in thread with a card for every ticket number in the reacted
/// message.
#[instrument(skip(state, ev), fields(reaction = %ev.reaction))]
async fn handle_reaction_added(state: &AppState, ev: ReactionAddedEvent) {
    if ev.reaction != state.reaction() || ev.item.item_type != "message" {
        return;
    }
    let (Some(channel), Some(ts)) = (ev.item.channel, ev.item.ts) else {
        debug!("Reaction item without channel or ts");
        return;
    };

    if let Some(user) = ev.user.as_deref() {
        log_actor(state, user).await;
    }

    let message = match state.slack().message_at(&channel, &ts).await {
        Ok(Some(message)) => message,
        Ok(None) => {
            debug!(channel, ts, "Reacted message not found in history");
            return;
        }
        Err(e) => {
            warn!(channel, ts, error = %e, "Failed to read reacted message");
            return;
        }
    };

    let found = state.patterns().find_all(&message.text);
    info!(channel, ts = message.ts, matches = found.len(), "Scanning reacted message");

    for (kind, number) in found {
        if let Err(e) = reply_with_ticket(state, &channel, &ts, kind, number).await {
            warn!(kind = %kind, number, error = %e, "Ticket lookup failed");
        }
    }
}

async fn reply_with_ticket(
    state: &AppState,
    channel: &str,
    thread_ts: &str,
    kind: RecordKind,
    number: &str,
) -> Result<(), ServerError> {
    let ticket = state.snow().ticket_by_number(kind, number).await?;
    state
        .slack()
        .post_thread_blocks(
            channel,
            thread_ts,
            &ticket.task_effective_number,
            formatter::ticket_card(&ticket),
        )
        .await?;
    Ok(())
}

/// Records who asked for the lookup. Best effort.
async fn log_actor(state: &AppState, user: &str) {
    match state.slack().user_email(user).await {
        Ok(email) => info!(user, email = email.as_deref().unwrap_or("-"), "Lookup requested"),
        Err(e) => debug!(user, error = %e, "Could not read actor profile"),
    }
}

async fn handle_app_home_opened(state: &AppState, ev: AppHomeOpenedEvent) {
    if ev.tab.as_deref().is_some_and(|tab| tab != "home") {
        return;
    }
    if let Err(e) = state
        .slack()
        .views_publish(&ev.user, formatter::home_view(VERSION))
        .await
    {
        error!(user = ev.user, error = %e, "Error publishing home tab");
    }
}

fn handle_message(state: &AppState, msg: &MessageEvent) {
    if msg.bot_id.is_some()
        || msg.subtype.as_deref() == Some("bot_message")
        || state.is_own_app(msg.app_id.as_deref())
    {
        return;
    }
    debug!(
        user = msg.user.as_deref().unwrap_or("-"),
        text = msg.text.trim(),
        "Message"
    );
}
