//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser map and the API
//! server. Every frame is a JSON text message tagged by `type`.

use serde::{Deserialize, Serialize};
use travel_tracker_core::map::RenderedCountry;
use travel_tracker_core::search::SearchHit;
use travel_tracker_core::stats::Progress;
use travel_tracker_core::theme::Theme;
use travel_tracker_core::viewport::{MapConfig, Viewport};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// Features are addressed by their index in the `snapshot` country list.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Mounts the map. This must be the first message sent on the connection.
    Init { screen_width: u32, prefers_dark: bool },

    Hover { feature: usize },

    Click { feature: usize },

    Search { query: String },

    /// Toggles a search result directly.
    SelectResult { code: String },

    /// A click on the search overlay.
    DismissSearch,

    ZoomIn,

    ZoomOut,

    /// End of a pan/zoom gesture.
    MoveEnd { center: [f64; 2], zoom: f64 },

    ToggleTheme,

    /// The system color-scheme preference changed.
    SystemTheme { prefers_dark: bool },

    /// Re-fetch the visited set from the backend.
    Reload,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the map was mounted; `geo_url` is where the drawable dataset lives.
    SessionInitialized {
        user_id: Uuid,
        geo_url: String,
        projection: ProjectionDto,
    },

    /// Full state, sent after init and after every reload.
    Snapshot {
        countries: Vec<CountryDto>,
        progress: ProgressDto,
        viewport: ViewportDto,
        theme: ThemeName,
    },

    VisitedChanged {
        visited: Vec<String>,
        progress: ProgressDto,
    },

    Tooltip { name: String },

    TooltipCleared,

    SearchResults {
        query: String,
        results: Vec<SearchHitDto>,
        animating: Option<String>,
    },

    SearchCleared,

    Viewport(ViewportDto),

    Theme { theme: ThemeName },

    /// The auth session behind this map ended. Toggles stay local from now on.
    SignedOut,

    /// Reports an error to the client, which should display the message.
    Error { message: String },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProjectionDto {
    pub scale: f64,
    pub center: [f64; 2],
}

impl From<MapConfig> for ProjectionDto {
    fn from(config: MapConfig) -> Self {
        Self {
            scale: config.scale,
            center: [config.center.0, config.center.1],
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CountryDto {
    pub code: Option<String>,
    pub name: String,
    pub visited: bool,
}

impl From<RenderedCountry> for CountryDto {
    fn from(c: RenderedCountry) -> Self {
        Self {
            code: c.code,
            name: c.name,
            visited: c.visited,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ProgressDto {
    pub visited: usize,
    pub to_visit: usize,
    pub percentage: u32,
}

impl From<Progress> for ProgressDto {
    fn from(p: Progress) -> Self {
        Self {
            visited: p.visited,
            to_visit: p.to_visit,
            percentage: p.percentage,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ViewportDto {
    pub center: [f64; 2],
    pub zoom: f64,
    pub max_zoom: f64,
    pub can_zoom_in: bool,
    pub can_zoom_out: bool,
}

impl From<&Viewport> for ViewportDto {
    fn from(v: &Viewport) -> Self {
        let state = v.state();
        Self {
            center: [state.center.0, state.center.1],
            zoom: state.zoom,
            max_zoom: v.max_zoom(),
            can_zoom_in: v.can_zoom_in(),
            can_zoom_out: v.can_zoom_out(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchHitDto {
    pub code: Option<String>,
    pub name: String,
}

impl From<&SearchHit> for SearchHitDto {
    fn from(hit: &SearchHit) -> Self {
        Self {
            code: hit.code.clone(),
            name: hit.name.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThemeName {
    Light,
    Dark,
}

impl From<Theme> for ThemeName {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Light => ThemeName::Light,
            Theme::Dark => ThemeName::Dark,
        }
    }
}
