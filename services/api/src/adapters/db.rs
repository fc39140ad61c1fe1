//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` and `VisitedCountriesRepository` ports from the `core`
//! crate. It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use travel_tracker_core::domain::{
    AuthSession, PasswordResetToken, User, UserCredentials, VisitedEntry,
};
use travel_tracker_core::ports::{
    DatabaseService, PortError, PortResult, VisitedCountriesRepository,
};
use uuid::Uuid;

/// SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";
/// SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the core's persistence ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps a `sqlx` error onto the port's error vocabulary.
fn port_error(e: sqlx::Error, what: &str) -> PortError {
    if let sqlx::Error::Database(db_err) = &e {
        match db_err.code().as_deref() {
            Some(UNDEFINED_TABLE) => return PortError::TableMissing(db_err.message().to_string()),
            Some(UNIQUE_VIOLATION) => return PortError::Conflict(what.to_string()),
            _ => {}
        }
    }
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what.to_string()),
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct VisitedRecord {
    user_id: Uuid,
    country_code: String,
}
impl VisitedRecord {
    fn to_domain(self) -> VisitedEntry {
        VisitedEntry {
            user_id: self.user_id,
            country_code: self.country_code,
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }

    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ResetRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

//=========================================================================================
// `VisitedCountriesRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl VisitedCountriesRepository for DbAdapter {
    async fn list_visited(&self, user_id: Uuid) -> PortResult<Vec<String>> {
        let records = sqlx::query_as::<_, VisitedRecord>(
            "SELECT user_id, country_code FROM visited_countries WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| port_error(e, "visited countries"))?;

        Ok(records
            .into_iter()
            .map(|r| r.to_domain().country_code)
            .collect())
    }

    async fn insert_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO visited_countries (user_id, country_code) VALUES ($1, $2) ON CONFLICT (user_id, country_code) DO NOTHING",
        )
        .bind(user_id)
        .bind(country_code)
        .execute(&self.pool)
        .await
        .map_err(|e| port_error(e, "visited country"))?;
        Ok(())
    }

    async fn delete_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM visited_countries WHERE user_id = $1 AND country_code = $2")
            .bind(user_id)
            .bind(country_code)
            .execute(&self.pool)
            .await
            .map_err(|e| port_error(e, "visited country"))?;
        Ok(())
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) RETURNING user_id, email, hashed_password",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, "User already registered"))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, &format!("User {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, &format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE user_id = $2")
            .bind(hashed_password)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| port_error(e, "user"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| port_error(e, "auth session"))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| port_error(e, "auth session"))?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| port_error(e, "auth session"))?;
        Ok(())
    }

    async fn create_password_reset(&self, token: &PasswordResetToken) -> PortResult<()> {
        sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token.token)
            .bind(token.user_id)
            .bind(token.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| port_error(e, "password reset"))?;
        Ok(())
    }

    async fn redeem_password_reset(&self, token: &str) -> PortResult<Uuid> {
        let record = sqlx::query_as::<_, ResetRecord>(
            "DELETE FROM password_resets WHERE token = $1 RETURNING user_id, expires_at",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| port_error(e, "password reset"))?
        .ok_or(PortError::Unauthorized)?;

        if record.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(record.user_id)
    }
}
