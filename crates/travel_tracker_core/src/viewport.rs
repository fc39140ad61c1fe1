//! crates/travel_tracker_core/src/viewport.rs
//!
//! Pan/zoom state of the map and the projection settings picked at mount time.

use crate::domain::ViewportState;

pub const MIN_ZOOM: f64 = 1.0;
pub const DEFAULT_MAX_ZOOM: f64 = 4.0;

/// Screens narrower than this get the enlarged projection.
pub const NARROW_SCREEN_BREAKPOINT: u32 = 768;
const NARROW_SCALE: f64 = 260.0;
const WIDE_SCALE: f64 = 147.0;

/// Projection settings, chosen once when the map mounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    pub scale: f64,
    pub center: (f64, f64),
}

impl MapConfig {
    pub fn for_screen_width(width: u32) -> Self {
        let scale = if width < NARROW_SCREEN_BREAKPOINT {
            NARROW_SCALE
        } else {
            WIDE_SCALE
        };
        Self {
            scale,
            center: (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Viewport {
    state: ViewportState,
    max_zoom: f64,
}

impl Viewport {
    /// `max_zoom` below `MIN_ZOOM` is raised to it.
    pub fn new(max_zoom: f64) -> Self {
        Self {
            state: ViewportState::default(),
            max_zoom: max_zoom.max(MIN_ZOOM),
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn can_zoom_in(&self) -> bool {
        self.state.zoom < self.max_zoom
    }

    pub fn can_zoom_out(&self) -> bool {
        self.state.zoom > MIN_ZOOM
    }

    /// Doubles the zoom, clamped to the maximum. Returns whether it changed.
    pub fn zoom_in(&mut self) -> bool {
        if !self.can_zoom_in() {
            return false;
        }
        self.state.zoom = (self.state.zoom * 2.0).min(self.max_zoom);
        true
    }

    /// Halves the zoom, clamped to 1. Returns whether it changed.
    pub fn zoom_out(&mut self) -> bool {
        if !self.can_zoom_out() {
            return false;
        }
        self.state.zoom = (self.state.zoom / 2.0).max(MIN_ZOOM);
        true
    }

    /// Stores the position reported at the end of a pan/zoom gesture.
    pub fn move_end(&mut self, state: ViewportState) {
        let zoom = if state.zoom.is_finite() {
            state.zoom.clamp(MIN_ZOOM, self.max_zoom)
        } else {
            self.state.zoom
        };
        self.state = ViewportState {
            center: state.center,
            zoom,
        };
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ZOOM)
    }
}
