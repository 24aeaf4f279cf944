use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, instrument};

use crate::config::BoundariesConfig;
use crate::error::{PipelineError, Result};
use crate::zipcode;

/// Loads the reference zip universe for the region: every zip key present in
/// the boundary GeoJSON. The geometry itself is only consumed downstream by
/// the renderer; the pipeline depends on the flat key list alone.
#[instrument(skip(config))]
pub async fn reference_zips(config: &BoundariesConfig) -> Result<Vec<String>> {
    let geojson = load_or_fetch(config).await?;
    extract_zips(&geojson, &config.property_key)
}

async fn load_or_fetch(config: &BoundariesConfig) -> Result<Value> {
    let cache = Path::new(&config.cache_path);
    if cache.exists() {
        let content = fs::read_to_string(cache)?;
        return Ok(serde_json::from_str(&content)?);
    }

    info!(url = %config.url, "boundary cache missing; fetching");
    let body = reqwest::get(&config.url)
        .await?
        .error_for_status()?
        .text()
        .await?;
    let geojson: Value = serde_json::from_str(&body)?;

    if let Some(parent) = cache.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(cache, &body)?;
    info!(path = %cache.display(), "cached boundary dataset");
    Ok(geojson)
}

/// Pulls the zip key out of each boundary feature and canonicalizes it.
/// A malformed reference zip is a structural failure, not a row-local one.
pub fn extract_zips(geojson: &Value, property_key: &str) -> Result<Vec<String>> {
    let features = geojson
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| {
            PipelineError::Config("boundary dataset has no features array".to_string())
        })?;

    let mut zips = Vec::with_capacity(features.len());
    for feature in features {
        let raw = feature
            .pointer(&format!("/properties/{property_key}"))
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "boundary feature missing property {property_key:?}"
                ))
            })?;
        // Some datasets store the key as a number rather than a string
        let raw = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(PipelineError::Config(format!(
                    "boundary property {property_key:?} has unsupported type: {other}"
                )))
            }
        };
        zips.push(zipcode::normalize(&raw)?);
    }

    if zips.is_empty() {
        return Err(PipelineError::EmptyReferenceUniverse);
    }
    Ok(zips)
}
