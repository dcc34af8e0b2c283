//! Socket Mode WebSocket connection management.
//!
//! [`SocketClient`] keeps one outbound WebSocket to Slack open, acks every
//! envelope as soon as it arrives and hands it to the event handler on a
//! tracked task. Lost connections are re-established with exponential
//! backoff.

use std::future::Future;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::dispatch::{self, Envelope, ParsedMessage};
use crate::error::ServerError;
use crate::slack_client::SlackClient;

/// First reconnect delay.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Reconnect delay cap.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a single connection ended.
#[derive(Debug, PartialEq, Eq)]
enum ConnectionExit {
    Shutdown,
    Disconnect,
}

/// Socket Mode client.
///
/// Obtains a WebSocket URL from `apps.connections.open` with the app-level
/// token, then reads frames until Slack disconnects or shutdown is
/// signalled.
#[derive(Debug)]
pub struct SocketClient {
    app_token: String,
    slack: SlackClient,
}

impl SocketClient {
    /// Creates a client that authenticates with `app_token`.
    pub fn new(app_token: String, slack: SlackClient) -> Self {
        Self { app_token, slack }
    }

    /// Runs the connect/read/reconnect loop until `shutdown` flips to `true`.
    ///
    /// Handler tasks still running at shutdown are aborted.
    ///
    /// # Errors
    ///
    /// Currently always returns `Ok`; connection failures are logged and
    /// retried.
    pub async fn run<F, Fut>(
        &self,
        handler: F,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ServerError>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut backoff = INITIAL_BACKOFF;
        let mut tasks = JoinSet::new();

        while !*shutdown.borrow() {
            match self.serve_connection(&handler, &mut shutdown, &mut tasks).await {
                Ok(ConnectionExit::Shutdown) => break,
                Ok(ConnectionExit::Disconnect) => {
                    backoff = INITIAL_BACKOFF;
                    info!("Socket closed by Slack, reconnecting");
                }
                Err(e) => {
                    warn!(error = %e, backoff_secs = backoff.as_secs(), "Socket connection failed");
                }
            }

            tokio::select! {
                () = tokio::time::sleep(backoff) => {}
                _ = shutdown.changed() => {}
            }
            backoff = next_backoff(backoff);
            while tasks.try_join_next().is_some() {}
        }

        if !tasks.is_empty() {
            info!(task_count = tasks.len(), "Aborting in-flight handler tasks");
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
        info!("Socket loop stopped");
        Ok(())
    }

    /// Serves one WebSocket connection from open to close.
    async fn serve_connection<F, Fut>(
        &self,
        handler: &F,
        shutdown: &mut watch::Receiver<bool>,
        tasks: &mut JoinSet<()>,
    ) -> Result<ConnectionExit, ServerError>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let wss_url = self.slack.connections_open(&self.app_token).await?;
        let (ws_stream, _response): (WsStream, _) = connect_async(wss_url.as_str())
            .await
            .map_err(|e| ServerError::WebSocket(format!("WebSocket connect failed: {e}")))?;
        info!("Connected to Slack Socket Mode");

        let (mut write, mut read) = ws_stream.split();

        loop {
            let frame = tokio::select! {
                frame = read.next() => frame,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(ConnectionExit::Shutdown);
                    }
                    continue;
                }
            };

            let Some(frame) = frame else {
                return Ok(ConnectionExit::Disconnect);
            };
            let frame =
                frame.map_err(|e| ServerError::WebSocket(format!("WebSocket read error: {e}")))?;

            match frame {
                WsMessage::Text(text) => match dispatch::parse_message(&text) {
                    Err(e) => warn!(error = %e, "Dropping unreadable frame"),
                    Ok(Some(ParsedMessage::Envelope(envelope))) => {
                        let ack = serde_json::json!({ "envelope_id": &envelope.envelope_id });
                        write
                            .send(WsMessage::Text(ack.to_string().into()))
                            .await
                            .map_err(|e| ServerError::WebSocket(format!("Ack send failed: {e}")))?;
                        track(tasks, handler(envelope));
                    }
                    Ok(Some(ParsedMessage::Disconnect)) => return Ok(ConnectionExit::Disconnect),
                    Ok(Some(ParsedMessage::Hello) | None) => {}
                },
                WsMessage::Ping(data) => {
                    write
                        .send(WsMessage::Pong(data))
                        .await
                        .map_err(|e| ServerError::WebSocket(format!("Pong send failed: {e}")))?;
                }
                WsMessage::Close(frame) => {
                    debug!(?frame, "Received close frame");
                    return Ok(ConnectionExit::Disconnect);
                }
                _ => {}
            }
        }
    }
}

/// Spawns a handler task and drops the entries of those already finished,
/// so a long-lived connection does not accumulate them.
fn track<Fut>(tasks: &mut JoinSet<()>, task: Fut)
where
    Fut: Future<Output = ()> + Send + 'static,
{
    tasks.spawn(task);
    while tasks.try_join_next().is_some() {}
}

/// Doubles the delay up to [`MAX_BACKOFF`].
fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_socket_client() {
        let slack = SlackClient::new("xoxb-test".into());
        let socket = SocketClient::new("xapp-1-test".into(), slack);
        assert!(format!("{socket:?}").contains("SocketClient"));
    }

    #[test]
    fn test_should_follow_exponential_backoff_sequence() {
        let mut backoff = INITIAL_BACKOFF;
        let mut sequence = vec![backoff];
        for _ in 0..6 {
            backoff = next_backoff(backoff);
            sequence.push(backoff);
        }
        let secs: Vec<u64> = sequence.iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[tokio::test]
    async fn test_should_reap_finished_handlers_on_spawn() {
        let mut tasks = JoinSet::new();
        for _ in 0..10 {
            track(&mut tasks, async {});
        }
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                tokio::task::yield_now().await;
                track(&mut tasks, async {});
                if tasks.len() == 1 {
                    break;
                }
            }
        })
        .await
        .expect("finished handlers should be reaped");
    }

    #[tokio::test]
    async fn test_should_exit_immediately_when_already_shut_down() {
        let slack = SlackClient::new("xoxb-test".into()).with_api_base("http://127.0.0.1:9");
        let socket = SocketClient::new("xapp-1-test".into(), slack);
        let (_tx, rx) = watch::channel(true);
        socket.run(|_envelope| async {}, rx).await.expect("run");
    }
}
