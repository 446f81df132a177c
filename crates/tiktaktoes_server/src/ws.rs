//! WebSocket adapter: a duplex observer that also submits moves.
//!
//! Route: `GET /ws/{id}`
//!
//! 1. Register the socket with the hub as a connection observer
//! 2. Send the current snapshot, if the session exists
//! 3. Apply each inbound move frame, broadcasting on success and replying
//!    with an error frame on failure
//! 4. Unregister when the peer closes or the read fails

use crate::api::{ErrorBody, MoveBody};
use crate::app::AppState;
use crate::hub::{ConnectionSink, DeliveryError, Observer};
use crate::session::{Session, SessionId};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, instrument, warn};

/// Outbound half of one WebSocket, as seen by the hub.
///
/// Frames go through a bounded queue drained by the socket's writer task, so
/// delivery never waits on the network. A peer that stops reading fills the
/// queue and further frames are dropped, as for push subscriptions.
#[derive(Debug, Clone)]
pub struct WsConnection {
    tx: mpsc::Sender<Message>,
}

impl WsConnection {
    /// Wraps the sending end of a writer queue.
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }

    fn send_json<T: Serialize>(&self, value: &T) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(value)
            .map_err(|e| DeliveryError::new(format!("serialization failed: {}", e)))?;
        match self.tx.try_send(Message::Text(json.into())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DeliveryError::new("socket writer queue full")),
            Err(TrySendError::Closed(_)) => Err(DeliveryError::new("socket writer closed")),
        }
    }
}

impl ConnectionSink for WsConnection {
    fn deliver(&self, session: &Session) -> Result<(), DeliveryError> {
        self.send_json(session)
    }
}

/// Upgrades the request and runs the socket until it closes.
#[instrument(skip(ws, state))]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<SessionId>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, id, state))
}

#[instrument(skip(socket, state))]
async fn handle_socket(socket: WebSocket, id: SessionId, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(state.hub.push_buffer());
    let conn = Arc::new(WsConnection::new(tx));

    let observer = state.hub.register(&id, Observer::Connection(conn.clone()));
    info!(%observer, "WebSocket connected");

    if let Some(session) = state.store.get(&id)
        && let Err(e) = conn.deliver(&session)
    {
        debug!(error = %e, "Failed to queue initial snapshot");
    }

    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                debug!(error = %e, "Send error, closing writer");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_frame(&state, &id, &conn, text.as_str()),
                Some(Ok(Message::Binary(_))) => {
                    warn!("Received unsupported binary frame");
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong are answered by axum
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "Receive error");
                    break;
                }
            },
        }
    }

    state.hub.unregister(&id, observer);
    writer.abort();
    info!(%observer, "WebSocket disconnected");
}

fn handle_frame(state: &AppState, id: &str, conn: &WsConnection, text: &str) {
    let result = serde_json::from_str::<MoveBody>(text)
        .map_err(ErrorBody::invalid_request)
        .and_then(|body| body.into_request().map_err(|e| ErrorBody::from(&e)))
        .and_then(|mv| state.store.apply_move(id, mv).map_err(|e| ErrorBody::from(&e)));

    match result {
        Ok(session) => state.publish(&session),
        Err(body) => {
            debug!(kind = %body.kind, "Move frame rejected");
            if let Err(e) = conn.send_json(&body) {
                debug!(error = %e, "Failed to queue error frame");
            }
        }
    }
}
