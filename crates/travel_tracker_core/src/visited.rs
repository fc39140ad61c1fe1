//! crates/travel_tracker_core/src/visited.rs
//!
//! The visited-set store: the local view of which countries the current user
//! has visited, with optimistic toggles mirrored into the remote table.
//!
//! A toggle mutates local state immediately and hands back a `PendingWrite`
//! tagged with a request id. The caller fires that write without waiting on
//! earlier ones and feeds the resulting `WriteAck` back through
//! `acknowledge`, which either confirms the toggle or rolls it back.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::ports::{PortError, PortResult, VisitedCountriesRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Delete,
}

/// A remote write produced by a toggle, not yet issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub country_code: String,
    pub op: WriteOp,
}

impl PendingWrite {
    /// Issues the write and packages its result for `VisitedSetStore::acknowledge`.
    pub async fn execute(self, repo: &dyn VisitedCountriesRepository) -> WriteAck {
        let result = match self.op {
            WriteOp::Insert => repo.insert_visited(self.user_id, &self.country_code).await,
            WriteOp::Delete => repo.delete_visited(self.user_id, &self.country_code).await,
        };
        WriteAck {
            request_id: self.request_id,
            country_code: self.country_code,
            result,
        }
    }
}

/// The backend's answer to a `PendingWrite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteAck {
    pub request_id: Uuid,
    pub country_code: String,
    pub result: PortResult<()>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// The remote table does not exist yet; the set was cleared.
    TableMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub country_code: String,
    /// Membership after the toggle.
    pub visited: bool,
    /// `None` while no user is signed in.
    pub write: Option<PendingWrite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    Confirmed,
    /// The write failed and the optimistic change was reverted.
    RolledBack { country_code: String, visited: bool },
    /// The write failed but a newer toggle of the same country is in flight.
    Superseded,
    /// The request id belongs to a discarded user session.
    Unknown,
}

pub struct VisitedSetStore {
    repo: Arc<dyn VisitedCountriesRepository>,
    user_id: Option<Uuid>,
    visited: Vec<String>,
    pending: HashMap<Uuid, (String, WriteOp)>,
    latest: HashMap<String, Uuid>,
}

impl VisitedSetStore {
    /// Creates an inert, empty store. Toggles stay local until a user is set.
    pub fn new(repo: Arc<dyn VisitedCountriesRepository>) -> Self {
        Self {
            repo,
            user_id: None,
            visited: Vec::new(),
            pending: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    /// Visited codes in the order they were added.
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    pub fn contains(&self, country_code: &str) -> bool {
        self.visited.iter().any(|c| c == country_code)
    }

    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Switches to another user (or none), discarding all local state.
    pub fn set_user(&mut self, user_id: Option<Uuid>) {
        self.user_id = user_id;
        self.visited.clear();
        self.pending.clear();
        self.latest.clear();
    }

    /// Replaces the local set with every row stored for `user_id`.
    ///
    /// A missing table loads as an empty set. Any other failure is logged and
    /// returned, leaving the current user's previous set in place.
    pub async fn load(&mut self, user_id: Uuid) -> PortResult<LoadOutcome> {
        if self.user_id != Some(user_id) {
            self.set_user(Some(user_id));
        }

        match self.repo.list_visited(user_id).await {
            Ok(rows) => {
                let mut visited: Vec<String> = Vec::with_capacity(rows.len());
                for code in rows {
                    if !visited.contains(&code) {
                        visited.push(code);
                    }
                }
                debug!("Loaded {} visited countries for user {}", visited.len(), user_id);
                self.visited = visited;
                Ok(LoadOutcome::Loaded(self.visited.len()))
            }
            Err(PortError::TableMissing(table)) => {
                warn!("Table {} not found, treating visited set as empty. Run the migrations.", table);
                self.visited.clear();
                Ok(LoadOutcome::TableMissing)
            }
            Err(e) => {
                error!("Error fetching visited countries for user {}: {:?}", user_id, e);
                Err(e)
            }
        }
    }

    /// Flips membership of `country_code` locally and returns the remote write
    /// that mirrors it.
    pub fn toggle(&mut self, country_code: &str) -> ToggleOutcome {
        let op = if let Some(pos) = self.visited.iter().position(|c| c == country_code) {
            self.visited.remove(pos);
            WriteOp::Delete
        } else {
            self.visited.push(country_code.to_string());
            WriteOp::Insert
        };

        let write = self.user_id.map(|user_id| {
            let request_id = Uuid::new_v4();
            self.pending
                .insert(request_id, (country_code.to_string(), op));
            self.latest.insert(country_code.to_string(), request_id);
            PendingWrite {
                request_id,
                user_id,
                country_code: country_code.to_string(),
                op,
            }
        });

        ToggleOutcome {
            country_code: country_code.to_string(),
            visited: op == WriteOp::Insert,
            write,
        }
    }

    /// Reconciles a finished remote write with local state.
    pub fn acknowledge(&mut self, ack: WriteAck) -> AckOutcome {
        let Some((country_code, op)) = self.pending.remove(&ack.request_id) else {
            debug!("Ignoring acknowledgment for unknown request {}", ack.request_id);
            return AckOutcome::Unknown;
        };

        let is_latest = self.latest.get(&country_code) == Some(&ack.request_id);
        if is_latest {
            self.latest.remove(&country_code);
        }

        let Err(e) = ack.result else {
            return AckOutcome::Confirmed;
        };

        if !is_latest {
            warn!(
                "Write {} for {} failed after a newer toggle: {:?}",
                ack.request_id, country_code, e
            );
            return AckOutcome::Superseded;
        }

        error!(
            "Write {} for {} failed, rolling back: {:?}",
            ack.request_id, country_code, e
        );
        let visited = match op {
            WriteOp::Insert => {
                self.visited.retain(|c| c != &country_code);
                false
            }
            WriteOp::Delete => {
                if !self.contains(&country_code) {
                    self.visited.push(country_code.clone());
                }
                true
            }
        };
        AckOutcome::RolledBack {
            country_code,
            visited,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory `visited_countries` table that records every call.
    #[derive(Default)]
    pub(crate) struct MemoryRepo {
        pub rows: Mutex<Vec<(Uuid, String)>>,
        pub calls: Mutex<Vec<String>>,
        pub fail_list: Mutex<Option<PortError>>,
        pub fail_writes: Mutex<bool>,
    }

    #[async_trait]
    impl VisitedCountriesRepository for MemoryRepo {
        async fn list_visited(&self, user_id: Uuid) -> PortResult<Vec<String>> {
            if let Some(e) = self.fail_list.lock().unwrap().clone() {
                return Err(e);
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, c)| c.clone())
                .collect())
        }

        async fn insert_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()> {
            self.calls.lock().unwrap().push(format!("insert {country_code}"));
            if *self.fail_writes.lock().unwrap() {
                return Err(PortError::Unexpected("connection reset".to_string()));
            }
            self.rows.lock().unwrap().push((user_id, country_code.to_string()));
            Ok(())
        }

        async fn delete_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()> {
            self.calls.lock().unwrap().push(format!("delete {country_code}"));
            if *self.fail_writes.lock().unwrap() {
                return Err(PortError::Unexpected("connection reset".to_string()));
            }
            self.rows
                .lock()
                .unwrap()
                .retain(|(u, c)| !(*u == user_id && c == country_code));
            Ok(())
        }
    }

    fn store_with(repo: &Arc<MemoryRepo>) -> VisitedSetStore {
        VisitedSetStore::new(repo.clone())
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_membership() {
        let repo = Arc::new(MemoryRepo::default());
        let mut store = store_with(&repo);
        store.load(Uuid::new_v4()).await.unwrap();

        let first = store.toggle("FRA");
        assert!(first.visited);
        assert!(store.contains("FRA"));
        let second = store.toggle("FRA");
        assert!(!second.visited);
        assert!(!store.contains("FRA"));
        assert_eq!(first.write.unwrap().op, WriteOp::Insert);
        assert_eq!(second.write.unwrap().op, WriteOp::Delete);
    }

    #[tokio::test]
    async fn test_load_replaces_set() {
        let repo = Arc::new(MemoryRepo::default());
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        {
            let mut rows = repo.rows.lock().unwrap();
            rows.push((user, "FRA".to_string()));
            rows.push((user, "JPN".to_string()));
            rows.push((user, "FRA".to_string()));
            rows.push((other, "BRA".to_string()));
        }
        let mut store = store_with(&repo);
        store.toggle("USA");

        let outcome = store.load(user).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded(2));
        assert_eq!(store.visited(), &["FRA".to_string(), "JPN".to_string()]);
        assert!(!store.contains("USA"));
        assert!(!store.contains("BRA"));
    }

    #[tokio::test]
    async fn test_load_missing_table_is_empty() {
        let repo = Arc::new(MemoryRepo::default());
        *repo.fail_list.lock().unwrap() =
            Some(PortError::TableMissing("visited_countries".to_string()));
        let mut store = store_with(&repo);

        let outcome = store.load(Uuid::new_v4()).await.unwrap();
        assert_eq!(outcome, LoadOutcome::TableMissing);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_set() {
        let repo = Arc::new(MemoryRepo::default());
        let user = Uuid::new_v4();
        repo.rows.lock().unwrap().push((user, "PER".to_string()));
        let mut store = store_with(&repo);
        store.load(user).await.unwrap();

        *repo.fail_list.lock().unwrap() = Some(PortError::Unexpected("timeout".to_string()));
        let result = store.load(user).await;
        assert!(matches!(result, Err(PortError::Unexpected(_))));
        assert_eq!(store.visited(), &["PER".to_string()]);
    }

    #[tokio::test]
    async fn test_signed_out_store_is_local_only() {
        let repo = Arc::new(MemoryRepo::default());
        let mut store = store_with(&repo);

        let outcome = store.toggle("ITA");
        assert!(outcome.visited);
        assert_eq!(outcome.write, None);
        assert_eq!(store.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back() {
        let repo = Arc::new(MemoryRepo::default());
        *repo.fail_writes.lock().unwrap() = true;
        let mut store = store_with(&repo);
        store.load(Uuid::new_v4()).await.unwrap();

        let write = store.toggle("CHL").write.unwrap();
        let ack = write.execute(repo.as_ref()).await;
        let outcome = store.acknowledge(ack);

        assert_eq!(
            outcome,
            AckOutcome::RolledBack {
                country_code: "CHL".to_string(),
                visited: false
            }
        );
        assert!(!store.contains("CHL"));
        assert_eq!(store.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_failed_delete_rolls_back() {
        let repo = Arc::new(MemoryRepo::default());
        let user = Uuid::new_v4();
        repo.rows.lock().unwrap().push((user, "CHL".to_string()));
        let mut store = store_with(&repo);
        store.load(user).await.unwrap();
        *repo.fail_writes.lock().unwrap() = true;

        let write = store.toggle("CHL").write.unwrap();
        let ack = write.execute(repo.as_ref()).await;
        assert!(matches!(store.acknowledge(ack), AckOutcome::RolledBack { visited: true, .. }));
        assert!(store.contains("CHL"));
    }

    #[tokio::test]
    async fn test_superseded_failure_keeps_newer_state() {
        let repo = Arc::new(MemoryRepo::default());
        let mut store = store_with(&repo);
        store.load(Uuid::new_v4()).await.unwrap();

        let first = store.toggle("NOR").write.unwrap();
        let _second = store.toggle("NOR").write.unwrap();
        let failed = WriteAck {
            request_id: first.request_id,
            country_code: first.country_code.clone(),
            result: Err(PortError::Unexpected("boom".to_string())),
        };

        assert_eq!(store.acknowledge(failed), AckOutcome::Superseded);
        assert!(!store.contains("NOR"));
        assert_eq!(store.pending_writes(), 1);
    }

    #[tokio::test]
    async fn test_ack_after_user_switch_is_ignored() {
        let repo = Arc::new(MemoryRepo::default());
        let mut store = store_with(&repo);
        store.load(Uuid::new_v4()).await.unwrap();
        let write = store.toggle("GRC").write.unwrap();

        store.set_user(None);
        let ack = write.execute(repo.as_ref()).await;
        assert_eq!(store.acknowledge(ack), AckOutcome::Unknown);
        assert!(store.is_empty());
    }
}
