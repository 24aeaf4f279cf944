use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::types::Coordinates;

/// Per-address failures. These are row-local: the joiner collects them and
/// keeps processing the remaining rows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("no candidate returned for address")]
    NoMatch,

    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Resolves a street address to a coordinate pair. The pipeline only ever
/// sees this contract; the provider behind it is swappable for tests.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

const ARCGIS_ENDPOINT: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

/// ArcGIS single-line geocoder, the one provider this pipeline supports.
pub struct ArcGisGeocoder {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for ArcGisGeocoder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ArcGisGeocoder {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| ARCGIS_ENDPOINT.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CandidateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    location: CandidateLocation,
}

#[derive(Debug, Deserialize)]
struct CandidateLocation {
    x: f64,
    y: f64,
}

#[async_trait]
impl Geocoder for ArcGisGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("f", "json"),
                ("maxLocations", "1"),
                ("singleLine", address),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        let body: CandidateResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        let best = body.candidates.into_iter().next().ok_or(GeocodeError::NoMatch)?;
        debug!(address = %address, "geocoded address");
        // ArcGIS returns x = longitude, y = latitude
        Ok(Coordinates {
            latitude: best.location.y,
            longitude: best.location.x,
        })
    }
}

/// Fixed-answer geocoder for tests and offline runs.
pub struct StubGeocoder {
    default: Coordinates,
    by_address: HashMap<String, Coordinates>,
    failures: HashMap<String, GeocodeError>,
}

impl StubGeocoder {
    pub fn returning(latitude: f64, longitude: f64) -> Self {
        Self {
            default: Coordinates {
                latitude,
                longitude,
            },
            by_address: HashMap::new(),
            failures: HashMap::new(),
        }
    }

    pub fn with_address(mut self, address: &str, latitude: f64, longitude: f64) -> Self {
        self.by_address.insert(
            address.to_string(),
            Coordinates {
                latitude,
                longitude,
            },
        );
        self
    }

    pub fn failing_for(mut self, address: &str, error: GeocodeError) -> Self {
        self.failures.insert(address.to_string(), error);
        self
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        if let Some(error) = self.failures.get(address) {
            return Err(error.clone());
        }
        Ok(self
            .by_address
            .get(address)
            .copied()
            .unwrap_or(self.default))
    }
}
