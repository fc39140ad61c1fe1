//! services/api/src/adapters/memory.rs
//!
//! Process-local implementations of the persistence and notification ports
//! for the service's tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use travel_tracker_core::domain::{AuthSession, PasswordResetToken, User, UserCredentials};
use travel_tracker_core::ports::{
    DatabaseService, NotificationService, PortError, PortResult, VisitedCountriesRepository,
};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    sessions: HashMap<String, AuthSession>,
    resets: HashMap<String, PasswordResetToken>,
    visited: Vec<(Uuid, String)>,
    fail_writes: bool,
}

#[derive(Default)]
pub struct InMemoryDb {
    tables: Mutex<Tables>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later insert or delete on `visited_countries` fail.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.fail_writes = fail;
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> PortResult<T>) -> PortResult<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        f(&mut tables)
    }
}

#[async_trait]
impl VisitedCountriesRepository for InMemoryDb {
    async fn list_visited(&self, user_id: Uuid) -> PortResult<Vec<String>> {
        self.with(|t| {
            Ok(t.visited
                .iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, c)| c.clone())
                .collect())
        })
    }

    async fn insert_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()> {
        self.with(|t| {
            if t.fail_writes {
                return Err(PortError::Unexpected("writes disabled".to_string()));
            }
            if !t.visited.iter().any(|(u, c)| *u == user_id && c == country_code) {
                t.visited.push((user_id, country_code.to_string()));
            }
            Ok(())
        })
    }

    async fn delete_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()> {
        self.with(|t| {
            if t.fail_writes {
                return Err(PortError::Unexpected("writes disabled".to_string()));
            }
            t.visited.retain(|(u, c)| !(*u == user_id && c == country_code));
            Ok(())
        })
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        self.with(|t| {
            if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
                return Err(PortError::Conflict("User already registered".to_string()));
            }
            let user = UserCredentials {
                user_id: Uuid::new_v4(),
                email: email.to_string(),
                hashed_password: hashed_password.to_string(),
            };
            t.users.push(user.clone());
            Ok(User {
                user_id: user.user_id,
                email: user.email,
            })
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.with(|t| {
            t.users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
        })
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.with(|t| {
            t.users
                .iter()
                .find(|u| u.user_id == user_id)
                .map(|u| User {
                    user_id: u.user_id,
                    email: u.email.clone(),
                })
                .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
        })
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        self.with(|t| {
            let user = t
                .users
                .iter_mut()
                .find(|u| u.user_id == user_id)
                .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
            user.hashed_password = hashed_password.to_string();
            Ok(())
        })
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        self.with(|t| {
            t.sessions.insert(session.id.clone(), session.clone());
            Ok(())
        })
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.with(|t| {
            t.sessions
                .get(session_id)
                .filter(|s| s.expires_at > Utc::now())
                .map(|s| s.user_id)
                .ok_or(PortError::Unauthorized)
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.with(|t| {
            t.sessions.remove(session_id);
            Ok(())
        })
    }

    async fn create_password_reset(&self, token: &PasswordResetToken) -> PortResult<()> {
        self.with(|t| {
            t.resets.insert(token.token.clone(), token.clone());
            Ok(())
        })
    }

    async fn redeem_password_reset(&self, token: &str) -> PortResult<Uuid> {
        self.with(|t| {
            t.resets
                .remove(token)
                .filter(|r| r.expires_at > Utc::now())
                .map(|r| r.user_id)
                .ok_or(PortError::Unauthorized)
        })
    }
}

/// Records every reset link instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn send_password_reset(&self, email: &str, link: &str) -> PortResult<()> {
        self.sent
            .lock()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .push((email.to_string(), link.to_string()));
        Ok(())
    }
}
