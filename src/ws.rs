//! Event-stream connection supervisor.
//!
//! Owns one live WebSocket connection: opens it with the bearer credential,
//! subscribes to the selected garden, classifies inbound frames, and forwards
//! them to the reduce loop over a channel. The lifecycle is an explicit state
//! machine (`Disconnected → Connecting → Connected → Reconnecting`) with
//! exponential backoff and a bounded reconnect budget, so a flapping backend
//! cannot produce a reconnect storm.
//!
//! Teardown is cooperative: a watch signal closes the socket, so a replaced
//! connection can never deliver updates to stale state.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::event::{classify_message, Rejection, StreamEvent};

/// Reconnect delays never grow past this, regardless of the attempt count.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

// ---

/// Observable connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

/// Exponential backoff schedule with a bounded attempt budget.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    // ---
    pub fn new(base: Duration, max_attempts: u32) -> Self {
        BackoffPolicy { base, max_attempts }
    }

    /// Delay before reconnect attempt `attempt` (0-based), or `None` once
    /// the budget is exhausted.
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        // ---
        if attempt >= self.max_attempts {
            return None;
        }
        let millis = (self.base.as_millis() as u64).saturating_mul(1u64 << attempt.min(20));
        Some(Duration::from_millis(millis).min(MAX_BACKOFF))
    }
}

/// Everything the supervisor reports to its reduce loop.
#[derive(Debug)]
pub enum SupervisorEvent {
    /// A classified inbound stream message.
    Stream(StreamEvent),
    /// Lifecycle transition, for logging and the sticky error flag.
    Transition(ConnState),
    /// Transport-level failure; sticky until the next successful connect.
    TransportError(String),
}

enum SessionEnd {
    Shutdown,
    Closed,
}

// ---

pub struct ConnectionSupervisor {
    ws_url: String,
    token: String,
    garden_id: Option<i64>,
    policy: BackoffPolicy,
}

impl ConnectionSupervisor {
    // ---
    pub fn new(
        ws_url: impl Into<String>,
        token: impl Into<String>,
        garden_id: Option<i64>,
        policy: BackoffPolicy,
    ) -> Self {
        // ---
        ConnectionSupervisor {
            ws_url: ws_url.into(),
            token: token.into(),
            garden_id,
            policy,
        }
    }

    /// The backend authenticates the stream via a query parameter; the space
    /// in the bearer scheme must be percent-encoded to keep the request line
    /// valid.
    fn request_url(&self) -> String {
        format!("{}?Authorization=Bearer%20{}", self.ws_url, self.token)
    }

    /// Drive the connection until shutdown or the reconnect budget runs out.
    ///
    /// Events are delivered on `events`; a closed receiver is treated as
    /// teardown. `shutdown` flipping to `true` closes the socket cleanly.
    pub async fn run(
        self,
        events: mpsc::Sender<SupervisorEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        // ---
        let connection_id = Uuid::new_v4();
        let mut attempt: u32 = 0;

        loop {
            let state = if attempt == 0 {
                ConnState::Connecting
            } else {
                ConnState::Reconnecting { attempt }
            };
            if events.send(SupervisorEvent::Transition(state)).await.is_err() {
                return Ok(());
            }

            match self.run_session(&events, &mut shutdown, connection_id).await {
                Ok(SessionEnd::Shutdown) => {
                    let _ = events
                        .send(SupervisorEvent::Transition(ConnState::Disconnected))
                        .await;
                    return Ok(());
                }
                Ok(SessionEnd::Closed) => {
                    // A session that reached Connected refills the budget.
                    attempt = 0;
                    tracing::info!("Stream {} closed by peer", connection_id);
                }
                Err(error) => {
                    tracing::warn!("Stream {} transport error: {:#}", connection_id, error);
                    if events
                        .send(SupervisorEvent::TransportError(format!("{error:#}")))
                        .await
                        .is_err()
                    {
                        return Ok(());
                    }
                }
            }

            let Some(delay) = self.policy.delay(attempt) else {
                tracing::warn!(
                    "Stream {} reconnect budget exhausted after {} attempts",
                    connection_id,
                    attempt
                );
                let _ = events
                    .send(SupervisorEvent::Transition(ConnState::Disconnected))
                    .await;
                return Ok(());
            };
            attempt += 1;

            tracing::info!(
                "Reconnecting stream {} in {:?} (attempt {})",
                connection_id,
                delay,
                attempt
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = events
                            .send(SupervisorEvent::Transition(ConnState::Disconnected))
                            .await;
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn run_session(
        &self,
        events: &mpsc::Sender<SupervisorEvent>,
        shutdown: &mut watch::Receiver<bool>,
        connection_id: Uuid,
    ) -> Result<SessionEnd> {
        // ---
        let (mut stream, _response) = connect_async(self.request_url())
            .await
            .context("stream connect failed")?;

        if events
            .send(SupervisorEvent::Transition(ConnState::Connected))
            .await
            .is_err()
        {
            let _ = stream.close(None).await;
            return Ok(SessionEnd::Shutdown);
        }
        tracing::info!("Stream {} connected to {}", connection_id, self.ws_url);

        if let Some(garden_id) = self.garden_id {
            let subscribe = json!({"type": "subscribe", "garden_id": garden_id});
            stream
                .send(Message::Text(subscribe.to_string()))
                .await
                .context("subscribe send failed")?;
            tracing::debug!("Stream {} subscribed to garden {}", connection_id, garden_id);
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = stream.close(None).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                message = stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match classify_message(&text, Utc::now()) {
                                Ok(event) => {
                                    if events.send(SupervisorEvent::Stream(event)).await.is_err() {
                                        return Ok(SessionEnd::Shutdown);
                                    }
                                }
                                Err(Rejection::UnknownType(kind)) => {
                                    tracing::debug!("Unknown message type: {}", kind);
                                }
                                Err(rejection) => {
                                    tracing::debug!("Discarding stream message: {}", rejection);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                        // Pings are answered by the protocol layer; binary
                        // frames are not part of the contract.
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            return Err(error).context("stream read failed");
                        }
                    }
                }
            }
        }
    }
}
