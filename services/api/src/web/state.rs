//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::config::Config;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use travel_tracker_core::catalog::CountryCatalog;
use travel_tracker_core::map::MapSurface;
use travel_tracker_core::ports::{
    DatabaseService, NotificationService, PortResult, VisitedCountriesRepository,
};
use travel_tracker_core::session::SessionGate;
use travel_tracker_core::theme::ThemeProvider;
use travel_tracker_core::visited::{LoadOutcome, VisitedSetStore};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    /// The same backend as `db`, seen through the narrower table port.
    pub visited: Arc<dyn VisitedCountriesRepository>,
    pub notifier: Arc<dyn NotificationService>,
    /// Loaded once at startup, read-only afterwards.
    pub catalog: Arc<CountryCatalog>,
    pub config: Arc<Config>,
    pub gates: Arc<SessionGates>,
    /// Cancelled once the server starts shutting down; open maps close on it.
    pub shutdown: CancellationToken,
}

/// Session gates of the open map connections, keyed by the auth session
/// (cookie) each connection was opened with.
#[derive(Default)]
pub struct SessionGates {
    gates: Mutex<HashMap<String, SessionGate>>,
}

impl SessionGates {
    /// Watches the signed-in user behind `auth_session_id`, starting at `user_id`.
    pub fn subscribe(&self, auth_session_id: &str, user_id: Uuid) -> watch::Receiver<Option<Uuid>> {
        self.lock()
            .entry(auth_session_id.to_string())
            .or_insert_with(|| SessionGate::new(Some(user_id)))
            .subscribe()
    }

    /// Signs out every map opened with `auth_session_id`.
    pub fn sign_out(&self, auth_session_id: &str) {
        if let Some(gate) = self.lock().get(auth_session_id) {
            gate.sign_out();
        }
    }

    /// Forgets the gate once no connection watches it anymore.
    pub fn release(&self, auth_session_id: &str) {
        let mut gates = self.lock();
        if gates
            .get(auth_session_id)
            .is_some_and(|gate| gate.subscribers() == 0)
        {
            gates.remove(auth_session_id);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionGate>> {
        self.gates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//=========================================================================================
// SessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single mounted map.
///
/// The signed-in user lives in `store`; it becomes `None` after sign-out.
pub struct SessionState {
    pub store: VisitedSetStore,
    pub map: MapSurface,
    pub theme: ThemeProvider,
}

impl SessionState {
    /// Mounts a map for `user_id` and loads their visited set.
    ///
    /// A failed load does not prevent the session from starting; the outcome
    /// is returned alongside so the caller can report it.
    pub async fn new(
        app_state: &AppState,
        user_id: Uuid,
        screen_width: u32,
        prefers_dark: bool,
    ) -> (Self, PortResult<LoadOutcome>) {
        let mut store = VisitedSetStore::new(app_state.visited.clone());
        let loaded = store.load(user_id).await;
        let map = MapSurface::new(
            app_state.catalog.clone(),
            app_state.config.map_max_zoom,
            screen_width,
        );

        let state = Self {
            store,
            map,
            theme: ThemeProvider::new(prefers_dark),
        };
        (state, loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_lifecycle() {
        let gates = SessionGates::default();
        let user = Uuid::new_v4();

        let mut rx = gates.subscribe("cookie-1", user);
        assert_eq!(*rx.borrow(), Some(user));

        gates.sign_out("cookie-2");
        assert!(!rx.has_changed().unwrap());

        gates.sign_out("cookie-1");
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), None);

        // Still watched, so it stays.
        gates.release("cookie-1");
        assert_eq!(gates.len(), 1);

        drop(rx);
        gates.release("cookie-1");
        assert!(gates.is_empty());
    }
}
