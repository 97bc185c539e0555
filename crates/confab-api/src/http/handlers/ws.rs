//! WebSocket handler: one task per authenticated connection.
//!
//! The `/ws` endpoint upgrades an HTTP connection, verifies the bearer
//! credential, registers the connection, and then runs a single
//! `tokio::select!` loop multiplexing three sources:
//!
//! - the connection's outbox (server events queued by any component),
//! - inbound frames, parsed as [`ClientEvent`] and dispatched with one
//!   component call per event kind,
//! - the cancellation token, tripped when a duplicate login evicts this
//!   connection.
//!
//! Authentication failure never touches the registry: the socket gets one
//! generic `error` event and a close frame. On any exit path the teardown
//! runs before the task ends, so the registry never points at a dead
//! connection.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use confab_core::auth::IdentityVerifier;
use confab_core::connection::ConnectionHandle;
use confab_core::room::RoomKey;
use confab_types::error::{AuthError, ChatError};
use confab_types::event::{ClientEvent, ServerEvent};
use confab_types::user::UserProfile;

use crate::state::AppState;

/// Query parameters accepted on the upgrade request.
///
/// Browser WebSocket clients cannot set headers, so the token is usually
/// here; the `Authorization` header still wins when present.
#[derive(Debug, serde::Deserialize, Default)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

/// GET /ws - upgrade to a WebSocket session.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .or(query.token);

    ws.on_upgrade(move |socket| handle_connection(socket, state, token))
}

/// Core connection task: authenticate, register, loop, tear down.
async fn handle_connection(mut socket: WebSocket, state: AppState, token: Option<String>) {
    // Connecting -> Rejected: a failed handshake never enters the registry.
    let profile = match authenticate(&state, token.as_deref()).await {
        Ok(profile) => profile,
        Err(err) => {
            debug!("websocket authentication rejected: {err:?}");
            let reply = ServerEvent::Error {
                message: err.to_string(),
            };
            if let Ok(json) = serde_json::to_string(&reply) {
                let _ = socket.send(WsMessage::Text(json.into())).await;
            }
            let _ = socket.close().await;
            return;
        }
    };

    let (handle, mut outbox) = ConnectionHandle::new(profile.summary());
    // Registration force-closes any previous connection of this user.
    state.registry.register(handle.clone());
    state.presence.announce_online(&handle);
    info!(user = %handle.username(), connection_id = %handle.id(), "connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            // A duplicate login evicted this connection.
            _ = handle.cancellation().cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break;
            }

            // Deliver queued server events as JSON text frames.
            event = outbox.recv() => {
                let Some(event) = event else { break };
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sink.send(WsMessage::Text(json.into())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    Err(err) => warn!("failed to serialize server event: {err}"),
                }
            }

            // One dispatch per inbound event kind.
            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => dispatch_client_event(&state, &handle, event).await,
                            Err(err) => {
                                debug!(user = %handle.username(),
                                    "ignoring malformed client event: {err}");
                                handle.send(ServerEvent::Error {
                                    message: "invalid event payload".to_string(),
                                });
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(err)) => {
                        debug!("websocket receive error: {err}");
                        break;
                    }
                    // Ping/pong/binary protocol frames, handled by the stack.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Teardown runs before the task exits, whatever the exit path: the
    // registry must never point at a dead connection. Eviction by a
    // duplicate login makes unregister a no-op, in which case the user is
    // still online and no offline broadcast goes out.
    let registered = state.registry.unregister(handle.id());
    state.rooms.leave_all(handle.id());
    if let Some(connection) = registered {
        state.presence.announce_offline(&connection);
    }
    info!(user = %handle.username(), connection_id = %handle.id(), "disconnected");
}

async fn authenticate(state: &AppState, token: Option<&str>) -> Result<UserProfile, AuthError> {
    match token {
        Some(token) => state.verifier.verify(token).await,
        None => Err(AuthError::MissingCredential),
    }
}

/// Map one client event to one component call.
async fn dispatch_client_event(state: &AppState, handle: &ConnectionHandle, event: ClientEvent) {
    match event {
        ClientEvent::JoinChat { other_user_id } => {
            let room = RoomKey::for_pair(handle.user_id(), other_user_id);
            debug!(user = %handle.username(), room = %room, "joined chat room");
            state.rooms.join(handle.id(), room);
        }

        ClientEvent::LeaveChat { other_user_id } => {
            let room = RoomKey::for_pair(handle.user_id(), other_user_id);
            debug!(user = %handle.username(), room = %room, "left chat room");
            state.rooms.leave(handle.id(), &room);
        }

        ClientEvent::SendMessage {
            receiver_id,
            content,
        } => {
            if let Err(err) = state.dispatcher.send(handle.user(), receiver_id, &content).await {
                // Persistence details stay in the server log.
                let message = match &err {
                    ChatError::Persistence(_) => "Failed to send message".to_string(),
                    other => other.to_string(),
                };
                handle.send(ServerEvent::Error { message });
            }
        }

        ClientEvent::Typing {
            receiver_id,
            is_typing,
        } => {
            state.relay.typing(handle, receiver_id, is_typing);
        }

        ClientEvent::MarkAsRead { sender_id } => {
            if let Err(err) = state.relay.mark_read(handle, sender_id).await {
                let message = match &err {
                    ChatError::Persistence(_) => "Failed to mark messages read".to_string(),
                    other => other.to_string(),
                };
                handle.send(ServerEvent::Error { message });
            }
        }

        ClientEvent::GetOnlineUsers => {
            handle.send(state.presence.online_users(handle));
        }
    }
}
