//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{
    AuthResponse, LoginRequest, MessageResponse, RecoverRequest, ResetPasswordRequest,
    SignupRequest, UpdatePasswordRequest,
};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use travel_tracker_core::domain::VisitedEntry;
use travel_tracker_core::ports::PortError;
use travel_tracker_core::stats::Progress;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_visited_handler,
        add_visited_handler,
        remove_visited_handler,
        search_countries_handler,
        stats_handler,
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::session_handler,
        crate::web::auth::reset_password_handler,
        crate::web::auth::recover_handler,
        crate::web::auth::update_password_handler,
    ),
    components(
        schemas(
            VisitedListResponse,
            VisitedRequest,
            VisitedEntryResponse,
            CountryResponse,
            StatsResponse,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            ResetPasswordRequest,
            RecoverRequest,
            UpdatePasswordRequest,
            MessageResponse,
        )
    ),
    tags(
        (name = "Travel Tracker API", description = "Visited-country tracking and account endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct VisitedListResponse {
    pub user_id: Uuid,
    pub visited: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct VisitedRequest {
    pub country_code: String,
}

#[derive(Serialize, ToSchema)]
pub struct VisitedEntryResponse {
    pub user_id: Uuid,
    pub country_code: String,
}

impl From<VisitedEntry> for VisitedEntryResponse {
    fn from(entry: VisitedEntry) -> Self {
        Self {
            user_id: entry.user_id,
            country_code: entry.country_code,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct CountryResponse {
    pub code: Option<String>,
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub visited: usize,
    pub to_visit: usize,
    pub percentage: u32,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Substring of the country name; at least two characters.
    pub q: String,
}

/// Maps a port failure onto a status code, logging the detail.
fn port_failure(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::TableMissing(table) => {
            warn!("{}: table {} not found", context, table);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Visited countries table not found. Run the database migrations.".to_string(),
            )
        }
        other => {
            error!("{}: {:?}", context, other);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

fn normalize_code(code: &str) -> Result<String, (StatusCode, String)> {
    let code = code.trim();
    if code.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "country_code is required".to_string()));
    }
    Ok(code.to_string())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every country the caller has visited.
///
/// A backend without the table yet answers with an empty list.
#[utoipa::path(
    get,
    path = "/visited",
    responses(
        (status = 200, description = "Visited country codes", body = VisitedListResponse),
        (status = 401, description = "No active session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_visited_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let visited = match app_state.visited.list_visited(user_id).await {
        Ok(visited) => visited,
        Err(PortError::TableMissing(table)) => {
            warn!("Table {} not found, answering with an empty list.", table);
            Vec::new()
        }
        Err(e) => return Err(port_failure("Failed to fetch visited countries", e)),
    };
    Ok(Json(VisitedListResponse { user_id, visited }))
}

/// Mark a country as visited. Marking it twice is a no-op.
#[utoipa::path(
    post,
    path = "/visited",
    request_body = VisitedRequest,
    responses(
        (status = 201, description = "Country marked visited", body = VisitedEntryResponse),
        (status = 400, description = "Missing country code"),
        (status = 401, description = "No active session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_visited_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<VisitedRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entry = VisitedEntry {
        user_id,
        country_code: normalize_code(&req.country_code)?,
    };
    app_state
        .visited
        .insert_visited(entry.user_id, &entry.country_code)
        .await
        .map_err(|e| port_failure("Failed to save visited country", e))?;
    Ok((StatusCode::CREATED, Json(VisitedEntryResponse::from(entry))))
}

/// Unmark a visited country.
#[utoipa::path(
    delete,
    path = "/visited/{country_code}",
    params(("country_code" = String, Path, description = "The country code to remove.")),
    responses(
        (status = 204, description = "Country unmarked"),
        (status = 401, description = "No active session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn remove_visited_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(country_code): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let country_code = normalize_code(&country_code)?;
    app_state
        .visited
        .delete_visited(user_id, &country_code)
        .await
        .map_err(|e| port_failure("Failed to remove visited country", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search the country catalog by name.
#[utoipa::path(
    get,
    path = "/countries/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Up to five matches in catalog order", body = [CountryResponse])
    )
)]
pub async fn search_countries_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<CountryResponse>> {
    let results = app_state
        .catalog
        .search(&params.q)
        .into_iter()
        .map(|f| CountryResponse {
            code: f.code.clone(),
            name: f.name.clone(),
        })
        .collect();
    Json(results)
}

/// Progress figures for the caller.
#[utoipa::path(
    get,
    path = "/stats",
    responses(
        (status = 200, description = "Visited count and completion percentage", body = StatsResponse),
        (status = 401, description = "No active session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn stats_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let visited = match app_state.visited.list_visited(user_id).await {
        Ok(visited) => visited.len(),
        Err(PortError::TableMissing(_)) => 0,
        Err(e) => return Err(port_failure("Failed to compute stats", e)),
    };
    let progress = Progress::from_visited(visited);
    Ok(Json(StatsResponse {
        visited: progress.visited,
        to_visit: progress.to_visit,
        percentage: progress.percentage,
    }))
}
