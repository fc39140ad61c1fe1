//! crates/travel_tracker_core/src/map.rs
//!
//! The map interaction surface: turns clicks, hovers and search selections on
//! catalog features into visited-set toggles, and owns the viewport, the
//! tooltip and the search overlay.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::catalog::CountryCatalog;
use crate::domain::ViewportState;
use crate::search::{SearchHit, SearchOverlay};
use crate::viewport::{MapConfig, Viewport};
use crate::visited::{ToggleOutcome, VisitedSetStore};

/// The tooltip clears this long after it was last shown, whatever the pointer does.
pub const TOOLTIP_CLEAR_DELAY_MS: i64 = 2000;

/// One feature as it should be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCountry {
    pub code: Option<String>,
    pub name: String,
    pub visited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Toggled(ToggleOutcome),
    /// The search overlay swallowed the click.
    Blocked,
    /// The feature has no resolvable code.
    NoCode,
    /// No feature at that index.
    Unknown,
}

/// What `MapSurface::expire` cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expired {
    pub tooltip: bool,
    pub search: bool,
}

#[derive(Debug, Clone, Default)]
struct Tooltip {
    name: Option<String>,
    clear_at: Option<DateTime<Utc>>,
}

impl Tooltip {
    fn show(&mut self, name: &str, now: DateTime<Utc>) {
        self.name = Some(name.to_string());
        self.clear_at = Some(now + Duration::milliseconds(TOOLTIP_CLEAR_DELAY_MS));
    }

    fn expire(&mut self, now: DateTime<Utc>) -> bool {
        match self.clear_at {
            Some(at) if at <= now => {
                self.name = None;
                self.clear_at = None;
                true
            }
            _ => false,
        }
    }
}

pub struct MapSurface {
    catalog: Arc<CountryCatalog>,
    config: MapConfig,
    viewport: Viewport,
    tooltip: Tooltip,
    search: SearchOverlay,
}

impl MapSurface {
    /// Mounts the map. The projection is fixed from `screen_width` here and
    /// never recomputed.
    pub fn new(catalog: Arc<CountryCatalog>, max_zoom: f64, screen_width: u32) -> Self {
        Self {
            catalog,
            config: MapConfig::for_screen_width(screen_width),
            viewport: Viewport::new(max_zoom),
            tooltip: Tooltip::default(),
            search: SearchOverlay::default(),
        }
    }

    pub fn catalog(&self) -> &CountryCatalog {
        &self.catalog
    }

    pub fn config(&self) -> MapConfig {
        self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn search(&self) -> &SearchOverlay {
        &self.search
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.name.as_deref()
    }

    pub fn render(&self, store: &VisitedSetStore) -> Vec<RenderedCountry> {
        self.catalog
            .features()
            .iter()
            .map(|f| RenderedCountry {
                code: f.code.clone(),
                name: f.name.clone(),
                visited: f.code.as_deref().is_some_and(|c| store.contains(c)),
            })
            .collect()
    }

    /// Shows the hovered feature's name. Returns the name, if the index exists.
    pub fn hover(&mut self, feature: usize, now: DateTime<Utc>) -> Option<&str> {
        let name = self.catalog.features().get(feature)?.name.clone();
        self.tooltip.show(&name, now);
        self.tooltip.name.as_deref()
    }

    pub fn click(
        &mut self,
        feature: usize,
        store: &mut VisitedSetStore,
        now: DateTime<Utc>,
    ) -> ClickOutcome {
        if self.search.is_active() {
            return ClickOutcome::Blocked;
        }
        let Some(feature) = self.catalog.features().get(feature) else {
            return ClickOutcome::Unknown;
        };
        self.tooltip.show(&feature.name, now);
        match &feature.code {
            Some(code) => ClickOutcome::Toggled(store.toggle(code)),
            None => ClickOutcome::NoCode,
        }
    }

    pub fn set_search_query(&mut self, query: &str) -> &[SearchHit] {
        self.search.set_query(&self.catalog, query)
    }

    /// Toggles a search result directly, bypassing the click block.
    pub fn select_search_result(
        &mut self,
        code: &str,
        store: &mut VisitedSetStore,
        now: DateTime<Utc>,
    ) -> Option<ToggleOutcome> {
        let code = self.search.select(code, now)?;
        Some(store.toggle(&code))
    }

    pub fn dismiss_search(&mut self) {
        self.search.dismiss();
    }

    pub fn zoom_in(&mut self) -> bool {
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.viewport.zoom_out()
    }

    pub fn move_end(&mut self, state: ViewportState) {
        self.viewport.move_end(state);
    }

    /// The earliest pending timer, if any.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        match (self.tooltip.clear_at, self.search.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Expired {
        Expired {
            tooltip: self.tooltip.expire(now),
            search: self.search.expire(now),
        }
    }
}
