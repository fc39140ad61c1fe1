//! crates/travel_tracker_core/src/search.rs
//!
//! The search overlay shown above the map. While it holds results it blocks
//! map clicks; selecting a result toggles that country directly.

use chrono::{DateTime, Duration, Utc};

use crate::catalog::CountryCatalog;

/// How long a selected result stays on screen before the overlay clears.
pub const SEARCH_CLEAR_DELAY_MS: i64 = 1500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub code: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOverlay {
    query: String,
    results: Vec<SearchHit>,
    animating: Option<String>,
    clear_at: Option<DateTime<Utc>>,
}

impl SearchOverlay {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchHit] {
        &self.results
    }

    /// The code of the result currently playing its selection animation.
    pub fn animating(&self) -> Option<&str> {
        self.animating.as_deref()
    }

    /// True while results are shown, i.e. while map clicks are intercepted.
    pub fn is_active(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn set_query(&mut self, catalog: &CountryCatalog, query: &str) -> &[SearchHit] {
        self.query = query.to_string();
        self.results = catalog
            .search(query)
            .into_iter()
            .map(|f| SearchHit {
                code: f.code.clone(),
                name: f.name.clone(),
            })
            .collect();
        &self.results
    }

    /// Marks a shown result as selected and schedules the overlay to clear.
    ///
    /// Returns the code to toggle, or `None` if no shown result has that code.
    pub fn select(&mut self, code: &str, now: DateTime<Utc>) -> Option<String> {
        let hit = self
            .results
            .iter()
            .find(|hit| hit.code.as_deref() == Some(code))?;
        let code = hit.code.clone()?;
        self.animating = Some(code.clone());
        self.clear_at = Some(now + Duration::milliseconds(SEARCH_CLEAR_DELAY_MS));
        Some(code)
    }

    /// Clears query and results immediately (a click on the overlay).
    pub fn dismiss(&mut self) {
        self.query.clear();
        self.results.clear();
        self.animating = None;
        self.clear_at = None;
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.clear_at
    }

    /// Applies a due clear. Returns true if the overlay was cleared.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        match self.clear_at {
            Some(at) if at <= now => {
                self.dismiss();
                true
            }
            _ => false,
        }
    }
}
