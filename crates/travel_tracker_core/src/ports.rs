//! crates/travel_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete backend, dataset host and mail delivery.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AuthSession, CountryFeature, PasswordResetToken, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The backing table has not been provisioned yet.
    #[error("Table not found: {0}")]
    TableMissing(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The row-oriented `visited_countries` table.
///
/// Only these three query shapes are ever issued against it.
#[async_trait]
pub trait VisitedCountriesRepository: Send + Sync {
    async fn list_visited(&self, user_id: Uuid) -> PortResult<Vec<String>>;

    async fn insert_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()>;

    async fn delete_visited(&self, user_id: Uuid, country_code: &str) -> PortResult<()>;
}

#[async_trait]
pub trait DatabaseService: VisitedCountriesRepository {
    // --- User Management ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> PortResult<()>;

    // --- Auth Sessions ---
    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Password Reset ---
    async fn create_password_reset(&self, token: &PasswordResetToken) -> PortResult<()>;

    /// Consumes a reset token, returning the user it was issued for.
    async fn redeem_password_reset(&self, token: &str) -> PortResult<Uuid>;
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches every country feature of the geographic dataset.
    async fn fetch_features(&self) -> PortResult<Vec<CountryFeature>>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Delivers a password-reset link to the given address.
    async fn send_password_reset(&self, email: &str, link: &str) -> PortResult<()>;
}
