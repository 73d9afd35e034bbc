//! WebSocket realtime channel
//!
//! One hub session per socket. Outbound events are drained from the session
//! queue by a writer task; inbound frames are parsed and dispatched. Long
//! commands run in their own task and complete even if the socket closes.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};
use verboard_core::event::{ErrorPayload, MessagePayload};
use verboard_core::{ClientMessage, ServerEvent, SessionId, VersionManager};

pub async fn ws_handler(
    State(manager): State<Arc<VersionManager>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, manager))
}

async fn handle_socket(socket: WebSocket, manager: Arc<VersionManager>) {
    let hub = Arc::clone(manager.hub());
    let (id, mut events) = hub.connect();
    let (mut ws_write, mut ws_read) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(t) => t,
                Err(e) => {
                    warn!(event = event.name(), error = %e, "Failed to encode event");
                    continue;
                }
            };
            if ws_write.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let reader = Arc::clone(&manager);
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = ws_read.next().await {
            match frame {
                Ok(Message::Text(text)) => dispatch(&reader, id, text.as_str()),
                Ok(Message::Binary(_)) => {
                    let error = ErrorPayload::new("binary frames are not supported");
                    reader.hub().emit_to(id, ServerEvent::ProtocolError(error));
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(session = %id, error = %e, "WebSocket read error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.disconnect(id);
}

/// Handle one inbound text frame
pub fn dispatch(manager: &Arc<VersionManager>, id: SessionId, text: &str) {
    let hub = manager.hub();

    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(session = %id, error = %e, "Unparseable client message");
            hub.emit_to(
                id,
                ServerEvent::ProtocolError(ErrorPayload::new(format!("invalid message: {}", e))),
            );
            return;
        }
    };

    // With a token configured, only authentication is allowed before it succeeds
    let authorized = hub.is_authenticated(id);

    match message {
        ClientMessage::Authenticate(token) => match hub.authenticate(id, &token) {
            Ok(()) => {
                hub.emit_to(id, ServerEvent::Authenticated);
            }
            Err(e) => {
                hub.emit_to(id, ServerEvent::AuthError(ErrorPayload::new(e.to_string())));
            }
        },
        ClientMessage::Subscribe(topic) => match hub.subscribe(id, topic) {
            Ok(()) => {
                hub.emit_to(id, ServerEvent::Subscribed(topic));
            }
            Err(e) => {
                hub.emit_to(id, ServerEvent::SubscribeError(ErrorPayload::new(e.to_string())));
            }
        },
        ClientMessage::Unsubscribe(topic) => {
            let _ = hub.unsubscribe(id, topic);
        }
        _ if !authorized => {
            hub.emit_to(
                id,
                ServerEvent::AuthError(ErrorPayload::new("Authentication required")),
            );
        }
        ClientMessage::GetStatus => {
            let manager = Arc::clone(manager);
            tokio::spawn(async move {
                let status = manager.status().await;
                manager.hub().emit_to(id, ServerEvent::StatusUpdate(status));
            });
        }
        ClientMessage::CreateBackup(request) => {
            let manager = Arc::clone(manager);
            tokio::spawn(async move {
                let hub = manager.hub();
                hub.emit_to(
                    id,
                    ServerEvent::BackupStarted(MessagePayload {
                        message: "Backup started".to_string(),
                    }),
                );
                let event = match manager.create_backup(request).await {
                    Ok(result) => ServerEvent::BackupCompleted(result),
                    Err(e) => ServerEvent::BackupError(ErrorPayload::new(e.to_string())),
                };
                if !hub.emit_to(id, event) {
                    debug!(session = %id, "Backup finished after client left");
                }
            });
        }
        ClientMessage::SwitchVersion(request) => {
            let manager = Arc::clone(manager);
            tokio::spawn(async move {
                let event = match manager.switch_version(request.version()).await {
                    Ok(result) => ServerEvent::SwitchCompleted(result),
                    Err(e) => ServerEvent::SwitchError(ErrorPayload::new(e.to_string())),
                };
                if !manager.hub().emit_to(id, event) {
                    debug!(session = %id, "Switch finished after client left");
                }
            });
        }
    }
}
