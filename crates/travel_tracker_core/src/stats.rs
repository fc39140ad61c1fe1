//! crates/travel_tracker_core/src/stats.rs
//!
//! Progress figures shown next to the map.

/// Approximate number of countries in the world.
pub const TOTAL_COUNTRIES: usize = 195;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub visited: usize,
    pub to_visit: usize,
    /// Whole percent of `TOTAL_COUNTRIES` visited, rounded half up.
    pub percentage: u32,
}

impl Progress {
    pub fn from_visited(visited: usize) -> Self {
        let percentage = (visited as f64 / TOTAL_COUNTRIES as f64 * 100.0).round() as u32;
        Self {
            visited,
            to_visit: TOTAL_COUNTRIES.saturating_sub(visited),
            percentage,
        }
    }
}
