//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a map WebSocket connection.
//! One task owns the session state and handles client frames, due timers,
//! write acknowledgments, theme changes and sign-out one at a time.

use crate::web::{
    map_session::{handle_ack, handle_message, handle_timers, handle_user_change},
    middleware::AuthSessionId,
    protocol::{ClientMessage, ProjectionDto, ServerMessage},
    state::{AppState, SessionState},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use chrono::Utc;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use travel_tracker_core::visited::WriteAck;
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Extension(AuthSessionId(auth_session_id)): Extension<AuthSessionId>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id, auth_session_id))
}

async fn handle_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    user_id: Uuid,
    auth_session_id: String,
) {
    let (sender, receiver) = socket.split();
    run_session(receiver, sender, app_state, user_id, auth_session_id).await;
}

async fn send<K>(sender: &mut K, message: &ServerMessage) -> Result<(), K::Error>
where
    K: Sink<Message> + Unpin,
{
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("Failed to encode {:?}: {}", message, e);
            Ok(())
        }
    }
}

async fn send_all<K>(sender: &mut K, messages: &[ServerMessage]) -> Result<(), K::Error>
where
    K: Sink<Message> + Unpin,
{
    for message in messages {
        send(sender, message).await?;
    }
    Ok(())
}

/// Drives one map session over any frame stream and sink until the client
/// leaves or the server shuts down.
pub(crate) async fn run_session<S, K>(
    mut receiver: S,
    mut sender: K,
    app_state: Arc<AppState>,
    user_id: Uuid,
    auth_session_id: String,
) where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    K: Sink<Message> + Unpin,
    K::Error: Debug,
{
    info!("New map connection established for user: {}", user_id);

    // --- 1. Initialization Phase ---
    let (screen_width, prefers_dark) = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(&init_json) {
                Ok(ClientMessage::Init {
                    screen_width,
                    prefers_dark,
                }) => (screen_width, prefers_dark),
                _ => {
                    warn!("First message was not a valid Init message.");
                    let err_msg = ServerMessage::Error {
                        message: "First message must be init.".to_string(),
                    };
                    let _ = send(&mut sender, &err_msg).await;
                    return;
                }
            }
        }
        _ => {
            warn!("Connection closed before initialization.");
            return;
        }
    };

    let (mut state, loaded) =
        SessionState::new(&app_state, user_id, screen_width, prefers_dark).await;

    let init_msg = ServerMessage::SessionInitialized {
        user_id,
        geo_url: app_state.config.geo_url.clone(),
        projection: ProjectionDto::from(state.map.config()),
    };
    let mut opening = vec![init_msg, state.snapshot()];
    if let Err(e) = loaded {
        opening.push(ServerMessage::Error {
            message: e.to_string(),
        });
    }
    if let Err(e) = send_all(&mut sender, &opening).await {
        error!("Failed to send initial state: {:?}", e);
        return;
    }

    // --- 2. Main Event Loop ---
    let (ack_tx, mut ack_rx) = mpsc::unbounded_channel::<WriteAck>();
    let mut theme_rx = state.theme.subscribe();
    let mut gate_rx = app_state.gates.subscribe(&auth_session_id, user_id);

    loop {
        let deadline = state.map.next_deadline();
        let sleep_for = deadline
            .map(|at| (at - Utc::now()).to_std().unwrap_or_default())
            .unwrap_or(std::time::Duration::from_secs(3600));

        let outgoing = tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => {
                            let reply = handle_message(&mut state, message, Utc::now()).await;
                            // Writes are fired without waiting on earlier ones.
                            for write in reply.writes {
                                let repo = app_state.visited.clone();
                                let ack_tx = ack_tx.clone();
                                tokio::spawn(async move {
                                    let ack = write.execute(repo.as_ref()).await;
                                    let _ = ack_tx.send(ack);
                                });
                            }
                            reply.messages
                        }
                        Err(e) => {
                            warn!("Failed to parse client message: {}", e);
                            vec![ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            }]
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Map connection closed for user: {}", user_id);
                    break;
                }
                Some(Ok(_)) => Vec::new(),
                Some(Err(e)) => {
                    error!("WebSocket error for user {}: {:?}", user_id, e);
                    break;
                }
            },

            Some(ack) = ack_rx.recv() => handle_ack(&mut state, ack),

            Ok(()) = theme_rx.changed() => {
                let theme = *theme_rx.borrow_and_update();
                vec![ServerMessage::Theme { theme: theme.into() }]
            }

            Ok(()) = gate_rx.changed() => {
                let current = *gate_rx.borrow_and_update();
                info!("Map session for user {} now follows {:?}", user_id, current);
                handle_user_change(&mut state, current).await
            }

            _ = tokio::time::sleep(sleep_for), if deadline.is_some() => {
                handle_timers(&mut state, Utc::now())
            }

            _ = app_state.shutdown.cancelled() => {
                info!("Closing map connection for user {} on shutdown", user_id);
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        };

        if let Err(e) = send_all(&mut sender, &outgoing).await {
            error!("Failed to send to user {}: {:?}", user_id, e);
            break;
        }
    }

    drop(gate_rx);
    app_state.gates.release(&auth_session_id);
}
