//! WebSocket push channel for dynamic snapshots.
//!
//! The server never pushes on a timer. Each connection gets one dynamic
//! snapshot when it opens and afterwards only answers client requests, in
//! arrival order, from a single task.

use crate::error::{Result, SystemError};
use crate::metrics::format::now_millis;
use crate::web::handlers;
use crate::web::messages::{ClientMessage, ServerMessage};
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle of a push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Whether this connection has already been given the static snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticDelivery {
    Awaiting,
    Sent,
}

/// What the connection task should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SendDynamic,
    SendStatic,
    Pong,
    Ignore,
}

/// Per-connection protocol state.
#[derive(Debug)]
pub struct PushSession {
    id: Uuid,
    state: ChannelState,
    static_delivery: StaticDelivery,
}

impl PushSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ChannelState::Connecting,
            static_delivery: StaticDelivery::Awaiting,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn static_delivery(&self) -> StaticDelivery {
        self.static_delivery
    }

    /// Enter `Open`; the initial dynamic push is owed exactly once.
    pub fn open(&mut self) -> Action {
        match self.state {
            ChannelState::Connecting => {
                self.state = ChannelState::Open;
                Action::SendDynamic
            }
            _ => Action::Ignore,
        }
    }

    /// Decide how to answer an inbound text frame.
    pub fn on_text(&mut self, text: &str) -> Action {
        if self.state != ChannelState::Open {
            return Action::Ignore;
        }

        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::RequestDynamic) => Action::SendDynamic,
            Ok(ClientMessage::Ping) => Action::Pong,
            Ok(ClientMessage::RequestStatic) => match self.static_delivery {
                StaticDelivery::Awaiting => {
                    self.static_delivery = StaticDelivery::Sent;
                    Action::SendStatic
                }
                StaticDelivery::Sent => {
                    debug!("Client {} already has static data", self.id);
                    Action::Ignore
                }
            },
            Ok(ClientMessage::Unknown) => {
                info!("Unknown WebSocket request type from {}: {}", self.id, text);
                Action::Ignore
            }
            Err(e) => {
                warn!("Error parsing WebSocket message from {}: {}", self.id, e);
                Action::Ignore
            }
        }
    }

    pub fn close(&mut self) {
        self.state = ChannelState::Closed;
    }
}

impl Default for PushSession {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade handler; a plain GET is treated as an unknown route.
pub async fn websocket_handler(
    ws: Option<WebSocketUpgrade>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Some(ws) => ws.on_upgrade(move |socket| handle_websocket(socket, state)),
        None => handlers::not_found().await.into_response(),
    }
}

/// Drive one push connection until either side closes it.
async fn handle_websocket(mut socket: WebSocket, state: AppState) {
    let mut session = PushSession::new();
    info!("WebSocket client connected: {}", session.id());

    let initial = session.open();
    if let Err(e) = perform(&mut socket, &state, &session, initial).await {
        warn!("Initial push to {} failed: {}", session.id(), e);
        session.close();
        return;
    }

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => {
                let action = session.on_text(&text);
                if let Err(e) = perform(&mut socket, &state, &session, action).await {
                    warn!("Failed to send message to client {}: {}", session.id(), e);
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary message from {}", session.id());
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                warn!("WebSocket error for client {}: {}", session.id(), e);
                break;
            }
        }
    }

    session.close();
    info!("WebSocket client disconnected: {}", session.id());
}

/// Carry out `action`, building any snapshot on the blocking pool.
///
/// A failed snapshot build is logged and left unanswered; only transport
/// errors are returned.
async fn perform(
    socket: &mut WebSocket,
    state: &AppState,
    session: &PushSession,
    action: Action,
) -> Result<()> {
    let message = match action {
        Action::Ignore => return Ok(()),
        Action::Pong => ServerMessage::Pong {
            timestamp: now_millis(),
        },
        Action::SendDynamic => {
            let source = state.source.clone();
            match tokio::task::spawn_blocking(move || source.dynamic_snapshot()).await {
                Ok(data) => ServerMessage::Dynamic {
                    data,
                    timestamp: now_millis(),
                },
                Err(e) => {
                    error!("Dynamic snapshot for {} failed: {}", session.id(), e);
                    return Ok(());
                }
            }
        }
        Action::SendStatic => {
            let source = state.source.clone();
            match tokio::task::spawn_blocking(move || source.static_snapshot()).await {
                Ok(data) => ServerMessage::Static {
                    data,
                    timestamp: now_millis(),
                },
                Err(e) => {
                    error!("Static snapshot for {} failed: {}", session.id(), e);
                    return Ok(());
                }
            }
        }
    };

    let json = serde_json::to_string(&message)?;
    socket
        .send(Message::Text(json))
        .await
        .map_err(|e| SystemError::web_server_error(e.to_string()))
}
