//! Websocket upgrade handler: one `invoke` frame in, a stream of
//! [`StreamEvent`] frames out, until `complete` or the client disconnects.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use kernel_core::ErrorKind;
use tokio::sync::mpsc;
use tracing::warn;

use crate::api::routes::AppState;
use crate::facade::{Facade, InvokeRequest};
use crate::streaming::StreamEvent;

use super::error::{WsError, WsResult};

const EVENT_CHANNEL_CAPACITY: usize = 128;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.facade))
}

async fn handle_socket(mut socket: WebSocket, facade: Arc<Facade>) {
    let request = match receive_invoke(&mut socket).await {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "websocket closed before a usable invoke frame arrived");
            let _ = send_event(
                &mut socket,
                &StreamEvent::Error { agent: None, message: err.to_string(), kind: ErrorKind::InvalidInput },
            )
            .await;
            return;
        }
    };

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let pump = tokio::spawn(pump_events(socket, rx));
    if let Err(err) = facade.invoke(request, Some(tx)).await {
        warn!(error = %err, "run ended in error");
    }
    let _ = pump.await;
}

/// Read frames until the client's one `invoke` message arrives; anything
/// else before it (pings, stray binary frames) is ignored.
async fn receive_invoke(socket: &mut WebSocket) -> WsResult<InvokeRequest> {
    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(Message::Text(text)) => {
                return serde_json::from_str(&text).map_err(|e| WsError::InvalidMessage(e.to_string()));
            }
            Ok(Message::Close(_)) | Err(_) => return Err(WsError::NoInvokeReceived),
            Ok(_) => continue,
        }
    }
    Err(WsError::NoInvokeReceived)
}

/// Owns the socket for the rest of the connection's life: forwards every
/// queued [`StreamEvent`] out, and watches for the client closing the
/// connection so `rx` (and therefore the façade's `subscriber`) gets dropped.
async fn pump_events(mut socket: WebSocket, mut rx: mpsc::Receiver<StreamEvent>) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &StreamEvent) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).expect("StreamEvent always serializes");
    socket.send(Message::Text(payload)).await
}
