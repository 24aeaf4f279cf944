use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{PipelineError, Result};

/// The default label scale. Earlier data revisions lacked "missing" and used
/// 0.0 for "low"; the current scale keeps them distinct.
static DEFAULT_SCALE: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("missing", 0.0),
        ("low", 0.33),
        ("med", 0.5),
        ("medium", 0.5),
        ("high", 1.0),
    ])
});

/// Maps categorical density labels onto the numeric scale used downstream.
#[derive(Debug, Clone)]
pub struct DensityCodec {
    scale: HashMap<String, f64>,
}

impl Default for DensityCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl DensityCodec {
    pub fn new() -> Self {
        Self {
            scale: DEFAULT_SCALE
                .iter()
                .map(|(label, score)| (label.to_string(), *score))
                .collect(),
        }
    }

    /// Builds a codec with config-supplied overrides layered on the default
    /// scale. Override labels go through the same trim/lowercase as lookups.
    pub fn with_overrides(overrides: &HashMap<String, f64>) -> Self {
        let mut codec = Self::new();
        for (label, score) in overrides {
            codec.scale.insert(label.trim().to_lowercase(), *score);
        }
        codec
    }

    /// Encodes a raw label cell. A blank cell is `Ok(None)`: the record stays
    /// unset rather than being conflated with an explicit "missing" (0.0).
    /// An unrecognized label is an error; silently defaulting it would be
    /// indistinguishable from a legitimate "missing" zip.
    pub fn encode(&self, label: &str) -> Result<Option<f64>> {
        let key = label.trim().to_lowercase();
        if key.is_empty() {
            return Ok(None);
        }
        self.scale
            .get(&key)
            .copied()
            .map(Some)
            .ok_or_else(|| PipelineError::UnknownDensityLabel(label.to_string()))
    }
}
