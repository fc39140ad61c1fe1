//! crates/travel_tracker_core/src/session.rs
//!
//! The session gate: the current user id (or none) and a stream of changes.
//! Credentials never pass through here; the auth provider decides who the
//! user is and the gate only relays it.

use tokio::sync::watch;
use uuid::Uuid;

use crate::ports::PortResult;
use crate::visited::{LoadOutcome, VisitedSetStore};

pub struct SessionGate {
    tx: watch::Sender<Option<Uuid>>,
}

impl SessionGate {
    pub fn new(user_id: Option<Uuid>) -> Self {
        let (tx, _rx) = watch::channel(user_id);
        Self { tx }
    }

    pub fn current(&self) -> Option<Uuid> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Uuid>> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn sign_in(&self, user_id: Uuid) {
        self.set(Some(user_id));
    }

    pub fn sign_out(&self) {
        self.set(None);
    }

    fn set(&self, user_id: Option<Uuid>) {
        self.tx.send_if_modified(|current| {
            let changed = *current != user_id;
            *current = user_id;
            changed
        });
    }
}

/// Rebuilds `store` for a new user id: discarded on sign-out, reloaded
/// wholesale on sign-in.
pub async fn apply_user_change(
    store: &mut VisitedSetStore,
    user_id: Option<Uuid>,
) -> PortResult<Option<LoadOutcome>> {
    store.set_user(user_id);
    match user_id {
        Some(id) => store.load(id).await.map(Some),
        None => Ok(None),
    }
}
