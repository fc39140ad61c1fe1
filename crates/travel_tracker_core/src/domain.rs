//! crates/travel_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or wire format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One polygon feature of the world catalog.
///
/// `code` is `None` when none of the identifying properties resolved; such a
/// feature is still drawn but clicking it does nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryFeature {
    pub code: Option<String>,
    pub name: String,
    /// Opaque polygon data, passed through to renderers untouched.
    pub geometry: serde_json::Value,
}

/// A single "user has visited this country" row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitedEntry {
    pub user_id: Uuid,
    pub country_code: String,
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A single-use token mailed out by a password-reset request.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Pan/zoom position of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    /// (longitude, latitude)
    pub center: (f64, f64),
    pub zoom: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            center: (0.0, 0.0),
            zoom: 1.0,
        }
    }
}
