//! crates/travel_tracker_core/src/catalog.rs
//!
//! The read-only country catalog: feature construction from raw dataset
//! properties, lookup by code, and the name search used by the search overlay.

use serde_json::{Map, Value};

use crate::domain::CountryFeature;

/// Property keys tried, in order, when resolving a feature's country code.
pub const CODE_PROPERTY_KEYS: [&str; 2] = ["ISO_A3", "ADM0_A3"];
/// Property keys tried, in order, when resolving a feature's display name.
pub const NAME_PROPERTY_KEYS: [&str; 2] = ["name", "NAME"];

/// Queries must be longer than this many characters to produce results.
pub const SEARCH_MIN_QUERY_CHARS: usize = 2;
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Builds a feature from its dataset id, property bag and geometry.
///
/// The code comes from the first non-empty code property, then the feature id.
pub fn feature_from_properties(
    id: Option<&Value>,
    properties: Option<&Map<String, Value>>,
    geometry: Value,
) -> CountryFeature {
    let code = properties
        .and_then(|props| first_present(props, &CODE_PROPERTY_KEYS))
        .or_else(|| id.and_then(value_as_text));

    let name = properties
        .and_then(|props| first_present(props, &NAME_PROPERTY_KEYS))
        .unwrap_or_default();

    CountryFeature {
        code,
        name,
        geometry,
    }
}

fn first_present(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| props.get(*key).and_then(value_as_text))
}

// Numeric ids ("250" or 250) read as the same text.
fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The loaded set of country features. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct CountryCatalog {
    features: Vec<CountryFeature>,
}

impl CountryCatalog {
    /// Builds a catalog, dropping later features whose code repeats an earlier one.
    pub fn new(features: Vec<CountryFeature>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let features = features
            .into_iter()
            .filter(|f| match &f.code {
                Some(code) => seen.insert(code.clone()),
                None => true,
            })
            .collect();
        Self { features }
    }

    pub fn features(&self) -> &[CountryFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn find_by_code(&self, code: &str) -> Option<&CountryFeature> {
        self.features
            .iter()
            .find(|f| f.code.as_deref() == Some(code))
    }

    /// Case-insensitive substring match on display name.
    ///
    /// Returns nothing for queries of one character or less, otherwise at most
    /// `SEARCH_RESULT_LIMIT` matches in catalog order.
    pub fn search(&self, query: &str) -> Vec<&CountryFeature> {
        if query.chars().count() < SEARCH_MIN_QUERY_CHARS {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        self.features
            .iter()
            .filter(|f| f.name.to_lowercase().contains(&needle))
            .take(SEARCH_RESULT_LIMIT)
            .collect()
    }
}
