//! services/api/src/adapters/geo.rs
//!
//! Downloads the world dataset and turns it into catalog features. It
//! implements the `CatalogSource` port from the `core` crate.
//!
//! Both GeoJSON feature collections and TopoJSON topologies are accepted.
//! Geometry is never interpreted, only carried along for the renderer.

use async_trait::async_trait;
use geojson::{feature::Id, GeoJson};
use serde_json::Value;
use tracing::info;
use travel_tracker_core::catalog::feature_from_properties;
use travel_tracker_core::domain::CountryFeature;
use travel_tracker_core::ports::{CatalogSource, PortError, PortResult};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to download dataset: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Dataset is not valid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("Unsupported dataset layout: {0}")]
    Layout(String),
}

impl From<CatalogError> for PortError {
    fn from(e: CatalogError) -> Self {
        PortError::Unexpected(e.to_string())
    }
}

/// Fetches the dataset over HTTP on every call; callers keep the result.
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    async fn download(&self) -> Result<String, CatalogError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_features(&self) -> PortResult<Vec<CountryFeature>> {
        info!("Fetching country dataset from {}", self.url);
        let body = self.download().await?;
        let features = parse_catalog(&body)?;
        info!("Loaded {} country features", features.len());
        Ok(features)
    }
}

/// Parses a GeoJSON or TopoJSON document into catalog features.
pub fn parse_catalog(body: &str) -> Result<Vec<CountryFeature>, CatalogError> {
    let value: Value = serde_json::from_str(body)?;
    if value.get("type").and_then(Value::as_str) == Some("Topology") {
        parse_topology(&value)
    } else {
        parse_geojson(value)
    }
}

fn parse_geojson(value: Value) -> Result<Vec<CountryFeature>, CatalogError> {
    let collection = match GeoJson::from_json_value(value)? {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(CatalogError::Layout(
                "GeoJSON must be a FeatureCollection".to_string(),
            ))
        }
    };

    Ok(collection
        .features
        .into_iter()
        .map(|feature| {
            let id = feature.id.map(|id| match id {
                Id::String(s) => Value::String(s),
                Id::Number(n) => Value::Number(n),
            });
            let geometry = feature
                .geometry
                .and_then(|g| serde_json::to_value(g).ok())
                .unwrap_or(Value::Null);
            feature_from_properties(id.as_ref(), feature.properties.as_ref(), geometry)
        })
        .collect())
}

// Uses the `countries` object when present, otherwise the first one.
fn parse_topology(value: &Value) -> Result<Vec<CountryFeature>, CatalogError> {
    let objects = value
        .get("objects")
        .and_then(Value::as_object)
        .ok_or_else(|| CatalogError::Layout("topology has no objects".to_string()))?;
    let object = objects
        .get("countries")
        .or_else(|| objects.values().next())
        .ok_or_else(|| CatalogError::Layout("topology objects are empty".to_string()))?;
    let geometries = object
        .get("geometries")
        .and_then(Value::as_array)
        .ok_or_else(|| CatalogError::Layout("topology object has no geometries".to_string()))?;

    Ok(geometries
        .iter()
        .map(|geometry| {
            let mut shape = geometry.as_object().cloned().unwrap_or_default();
            let id = shape.remove("id");
            let properties = shape.remove("properties");
            feature_from_properties(
                id.as_ref(),
                properties.as_ref().and_then(Value::as_object),
                Value::Object(shape),
            )
        })
        .collect())
}
