//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: signup, login, logout, session check and the
//! password-reset flow.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use travel_tracker_core::domain::{AuthSession, PasswordResetToken};
use travel_tracker_core::ports::PortError;
use travel_tracker_core::validation::{validate_credentials, validate_email, validate_password};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_id_from_headers;
use crate::web::state::AppState;

const SESSION_DAYS: i64 = 30;
const RESET_TOKEN_MINUTES: i64 = 60;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RecoverRequest {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Helpers
//=========================================================================================

type HandlerError = (StatusCode, String);

fn hash_password(password: &str) -> Result<String, HandlerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })
}

/// Creates an auth session for `user_id` and returns its `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<String, HandlerError> {
    let session = AuthSession {
        id: Uuid::new_v4().to_string(),
        user_id,
        expires_at: Utc::now() + Duration::days(SESSION_DAYS),
    };

    state.db.create_auth_session(&session).await.map_err(|e| {
        error!("Failed to create auth session: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
    })?;

    Ok(format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session.id,
        Duration::days(SESSION_DAYS).num_seconds()
    ))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_credentials(&req.email, &req.password)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let password_hash = hash_password(&req.password)?;

    let user = state
        .db
        .create_user_with_email(&req.email, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => (StatusCode::CONFLICT, "User already registered".to_string()),
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
            }
        })?;

    let cookie = start_session(&state, user.user_id).await?;
    info!("New account created for user {}", user.user_id);

    let response = AuthResponse {
        user_id: user.user_id,
        email: user.email,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid email"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_email(&req.email).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    // 1. Get user by email
    let user_creds = state.db.get_user_by_email(&req.email).await.map_err(|e| {
        error!("Failed to get user: {:?}", e);
        (StatusCode::UNAUTHORIZED, "Invalid login credentials".to_string())
    })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid login credentials".to_string()));
    }

    // 3. Start the session
    let cookie = start_session(&state, user_creds.user_id).await?;

    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
///
/// Maps opened with this session are signed out and stop writing.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HandlerError> {
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;
    state.gates.sign_out(auth_session_id);

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/session - The user behind the current session cookie
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Active session", body = AuthResponse),
        (status = 401, description = "No active session")
    )
)]
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| {
        error!("Session points at a missing user {}: {:?}", user_id, e);
        (StatusCode::UNAUTHORIZED, "No active session".to_string())
    })?;
    Ok(Json(AuthResponse {
        user_id: user.user_id,
        email: user.email,
    }))
}

/// POST /auth/reset-password - Email a password-reset link
///
/// Answers the same way whether or not the address is registered.
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 202, description = "Reset link sent if the account exists", body = MessageResponse),
        (status = 400, description = "Invalid email"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_email(&req.email).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.db.get_user_by_email(&req.email).await {
        Ok(user) => {
            let token = PasswordResetToken {
                token: Uuid::new_v4().simple().to_string(),
                user_id: user.user_id,
                expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES),
            };
            let link = format!(
                "{}/update-password?token={}",
                state.config.public_url, token.token
            );
            let delivered = async {
                state.db.create_password_reset(&token).await?;
                state.notifier.send_password_reset(&user.email, &link).await
            }
            .await;
            delivered.map_err(|e| {
                error!("Failed to issue password reset: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Error sending reset email".to_string())
            })?;
        }
        Err(PortError::NotFound(_)) => {
            info!("Password reset requested for an unknown address");
        }
        Err(e) => {
            error!("Failed to look up user for reset: {:?}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Error sending reset email".to_string()));
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "Check your email for the password reset link".to_string(),
        }),
    ))
}

/// POST /auth/recover - Trade a reset token for a session
#[utoipa::path(
    post,
    path = "/auth/recover",
    request_body = RecoverRequest,
    responses(
        (status = 200, description = "Signed in via reset link", body = AuthResponse),
        (status = 401, description = "Invalid or expired reset link"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn recover_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoverRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid or expired reset link. Please request a new one.".to_string(),
        )
    };

    let user_id = state
        .db
        .redeem_password_reset(&req.token)
        .await
        .map_err(|e| {
            info!("Rejected reset token: {:?}", e);
            invalid()
        })?;
    let user = state.db.get_user_by_id(user_id).await.map_err(|e| {
        error!("Reset token for missing user {}: {:?}", user_id, e);
        invalid()
    })?;

    let cookie = start_session(&state, user.user_id).await?;
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            user_id: user.user_id,
            email: user.email,
        }),
    ))
}

/// POST /auth/update-password - Set a new password for the signed-in user
#[utoipa::path(
    post,
    path = "/auth/update-password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Password too short"),
        (status = 401, description = "No active session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    validate_password(&req.password).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let password_hash = hash_password(&req.password)?;
    state
        .db
        .update_password(user_id, &password_hash)
        .await
        .map_err(|e| {
            error!("Failed to update password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error updating password".to_string())
        })?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully!".to_string(),
    }))
}
