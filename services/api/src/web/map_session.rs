//! services/api/src/web/map_session.rs
//!
//! Applies client messages, expired timers and write acknowledgments to a
//! session's state and works out what to tell the client. No I/O happens
//! here; the WebSocket loop sends the replies and fires the writes.

use chrono::{DateTime, Utc};
use travel_tracker_core::domain::ViewportState;
use travel_tracker_core::map::ClickOutcome;
use travel_tracker_core::session::apply_user_change;
use travel_tracker_core::stats::Progress;
use travel_tracker_core::visited::{AckOutcome, PendingWrite, WriteAck};
use uuid::Uuid;

use crate::web::protocol::{ClientMessage, SearchHitDto, ServerMessage, ViewportDto};
use crate::web::state::SessionState;

/// What a single event produced.
#[derive(Debug, Default)]
pub struct Reply {
    pub messages: Vec<ServerMessage>,
    /// Remote writes to fire without waiting on each other.
    pub writes: Vec<PendingWrite>,
}

impl Reply {
    fn message(message: ServerMessage) -> Self {
        Self {
            messages: vec![message],
            writes: Vec::new(),
        }
    }
}

impl SessionState {
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::Snapshot {
            countries: self
                .map
                .render(&self.store)
                .into_iter()
                .map(Into::into)
                .collect(),
            progress: Progress::from_visited(self.store.len()).into(),
            viewport: self.map.viewport().into(),
            theme: self.theme.current().into(),
        }
    }

    pub fn visited_changed(&self) -> ServerMessage {
        ServerMessage::VisitedChanged {
            visited: self.store.visited().to_vec(),
            progress: Progress::from_visited(self.store.len()).into(),
        }
    }

    fn search_results(&self) -> ServerMessage {
        let search = self.map.search();
        ServerMessage::SearchResults {
            query: search.query().to_string(),
            results: search.results().iter().map(SearchHitDto::from).collect(),
            animating: search.animating().map(str::to_string),
        }
    }

    fn viewport(&self) -> ServerMessage {
        ServerMessage::Viewport(ViewportDto::from(self.map.viewport()))
    }
}

pub async fn handle_message(
    state: &mut SessionState,
    message: ClientMessage,
    now: DateTime<Utc>,
) -> Reply {
    match message {
        ClientMessage::Init { .. } => Reply::message(ServerMessage::Error {
            message: "Session is already initialized.".to_string(),
        }),

        ClientMessage::Hover { feature } => match state.map.hover(feature, now) {
            Some(name) => Reply::message(ServerMessage::Tooltip {
                name: name.to_string(),
            }),
            None => Reply::default(),
        },

        ClientMessage::Click { feature } => {
            let outcome = state.map.click(feature, &mut state.store, now);
            let mut reply = Reply::default();
            match outcome {
                ClickOutcome::Toggled(toggle) => {
                    reply.messages.push(state.visited_changed());
                    reply.writes.extend(toggle.write);
                }
                ClickOutcome::Blocked => return reply,
                ClickOutcome::NoCode => {}
                ClickOutcome::Unknown => {
                    return Reply::message(ServerMessage::Error {
                        message: format!("Unknown feature {}", feature),
                    })
                }
            }
            if let Some(name) = state.map.tooltip() {
                reply.messages.push(ServerMessage::Tooltip {
                    name: name.to_string(),
                });
            }
            reply
        }

        ClientMessage::Search { query } => {
            state.map.set_search_query(&query);
            Reply::message(state.search_results())
        }

        ClientMessage::SelectResult { code } => {
            match state.map.select_search_result(&code, &mut state.store, now) {
                Some(toggle) => Reply {
                    messages: vec![state.visited_changed(), state.search_results()],
                    writes: toggle.write.into_iter().collect(),
                },
                None => Reply::default(),
            }
        }

        ClientMessage::DismissSearch => {
            state.map.dismiss_search();
            Reply::message(ServerMessage::SearchCleared)
        }

        ClientMessage::ZoomIn => {
            state.map.zoom_in();
            Reply::message(state.viewport())
        }

        ClientMessage::ZoomOut => {
            state.map.zoom_out();
            Reply::message(state.viewport())
        }

        ClientMessage::MoveEnd { center, zoom } => {
            state.map.move_end(ViewportState {
                center: (center[0], center[1]),
                zoom,
            });
            Reply::message(state.viewport())
        }

        // Theme changes reach the client through the provider's subscription.
        ClientMessage::ToggleTheme => {
            state.theme.toggle();
            Reply::default()
        }

        ClientMessage::SystemTheme { prefers_dark } => {
            state.theme.follow_system(prefers_dark);
            Reply::default()
        }

        ClientMessage::Reload => {
            let Some(user_id) = state.store.user_id() else {
                return Reply::message(ServerMessage::Error {
                    message: "Not signed in.".to_string(),
                });
            };
            match state.store.load(user_id).await {
                Ok(_) => Reply::message(state.snapshot()),
                Err(e) => Reply::message(ServerMessage::Error {
                    message: e.to_string(),
                }),
            }
        }
    }
}

/// Clears whichever timers are due.
pub fn handle_timers(state: &mut SessionState, now: DateTime<Utc>) -> Vec<ServerMessage> {
    let expired = state.map.expire(now);
    let mut messages = Vec::new();
    if expired.tooltip {
        messages.push(ServerMessage::TooltipCleared);
    }
    if expired.search {
        messages.push(ServerMessage::SearchCleared);
    }
    messages
}

/// Follows the session gate: sign-out empties the store and leaves it
/// local-only, a new user gets their own set loaded.
pub async fn handle_user_change(
    state: &mut SessionState,
    user_id: Option<Uuid>,
) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    if user_id.is_none() {
        messages.push(ServerMessage::SignedOut);
    }
    if let Err(e) = apply_user_change(&mut state.store, user_id).await {
        messages.push(ServerMessage::Error {
            message: e.to_string(),
        });
    }
    messages.push(state.snapshot());
    messages
}

/// Reconciles a finished write. Only a rollback changes what the client sees.
pub fn handle_ack(state: &mut SessionState, ack: WriteAck) -> Vec<ServerMessage> {
    match state.store.acknowledge(ack) {
        AckOutcome::RolledBack { .. } => vec![state.visited_changed()],
        AckOutcome::Confirmed | AckOutcome::Superseded | AckOutcome::Unknown => Vec::new(),
    }
}
