use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;

/// Pipeline configuration, loaded from a TOML file. Every section has
/// defaults so a bare checkout runs without a config file.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    #[serde(default)]
    pub boundaries: BoundariesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Label overrides layered on the default density scale. Earlier data
    /// revisions used a different scale; that difference is configuration,
    /// not a separate code path.
    #[serde(default)]
    pub density_scale: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub struct InputsConfig {
    pub population: String,
    pub facilities: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            population: "data/kid_density.csv".to_string(),
            facilities: "data/clinics.csv".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GeocoderConfig {
    /// Override the ArcGIS endpoint (useful for pointing at a local stub).
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
    pub max_in_flight: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: 10,
            max_in_flight: 4,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BoundariesConfig {
    /// Local cache of the boundary GeoJSON; fetched from `url` when absent.
    pub cache_path: String,
    pub url: String,
    /// Feature property carrying the zip key. The NYC dataset uses "ZIP".
    pub property_key: String,
}

impl Default for BoundariesConfig {
    fn default() -> Self {
        Self {
            cache_path: "data/nyc-zip-code.json".to_string(),
            url: "https://raw.githubusercontent.com/gdobler/nycep/master/d3/data/nyc-zip-code.json"
                .to_string(),
            property_key: "ZIP".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory the cleaned snapshot is published into.
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
        }
    }
}

impl Config {
    /// Loads the config file if it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            debug!(path, "no config file; using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_complete() {
        let config = Config::default();
        assert_eq!(config.geocoder.max_in_flight, 4);
        assert_eq!(config.boundaries.property_key, "ZIP");
        assert!(config.density_scale.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [geocoder]
            endpoint = "http://localhost:9000/geocode"
            timeout_seconds = 2
            max_in_flight = 1

            [density_scale]
            "very high" = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(
            config.geocoder.endpoint.as_deref(),
            Some("http://localhost:9000/geocode")
        );
        assert_eq!(config.geocoder.timeout_seconds, 2);
        assert_eq!(config.output.dir, "output");
        assert_eq!(config.density_scale.get("very high"), Some(&1.0));
    }
}
