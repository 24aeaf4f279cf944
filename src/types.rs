use serde::{Deserialize, Serialize};

/// Canonical digit-string form of a zip code, produced by `zipcode::normalize`.
pub type ZipKey = String;

/// One zip code's child population density on the normalized [0.0, 1.0] scale.
///
/// `density` is `None` only when the source row carried a blank label cell.
/// Completion against the reference universe never overwrites a present row,
/// so an unset density survives to the join, where it is a hard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipRecord {
    pub zip: ZipKey,
    pub density: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A clinic record after cleaning: canonical zip, geocoded coordinates, and
/// the density copied from the matching `ZipRecord`.
///
/// `zip` is `None` when the raw value was unparseable (the row is kept but
/// excluded from the density lookup). Coordinates are `None` only for a
/// failed geocode; those rows are reported in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub name: String,
    pub address: String,
    pub zip: Option<ZipKey>,
    pub acceptance: String,
    pub notes: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub density: f64,
}

/// Raw row from the kid population sheet, column names as exported.
/// The trailing space in "Density " is present in the source data.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPopulationRow {
    #[serde(rename = "Zip code")]
    pub zip_code: String,
    #[serde(rename = "Density ")]
    pub density: String,
}

/// Raw row from the clinic sheet. `notes` is carried through unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFacilityRow {
    #[serde(rename = "Clinic Name")]
    pub clinic_name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Zip code")]
    pub zip_code: String,
    #[serde(rename = "Acceptance")]
    pub acceptance: String,
    #[serde(rename = "Notes", default)]
    pub notes: String,
}
