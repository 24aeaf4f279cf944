use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::error::{PipelineError, Result};
use crate::geocode::{GeocodeError, Geocoder};
use crate::population::PopulationTable;
use crate::types::{Coordinates, FacilityRecord, RawFacilityRow};
use crate::zipcode;

/// One facility whose address could not be geocoded. The record itself is
/// kept (coordinates unset); this is reporting, not an abort.
#[derive(Debug)]
pub struct GeocodeFailure {
    pub row: usize,
    pub name: String,
    pub address: String,
    pub error: GeocodeError,
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub records: Vec<FacilityRecord>,
    pub geocode_failures: Vec<GeocodeFailure>,
    pub invalid_zips: usize,
}

/// Enriches each clinic row with a canonical zip, geocoded coordinates, and
/// the density of its zip from the population table.
pub struct FacilityJoiner {
    geocoder: Arc<dyn Geocoder>,
    max_in_flight: usize,
    call_timeout: Duration,
}

impl FacilityJoiner {
    pub fn new(geocoder: Arc<dyn Geocoder>, max_in_flight: usize, call_timeout: Duration) -> Self {
        Self {
            geocoder,
            max_in_flight: max_in_flight.max(1),
            call_timeout,
        }
    }

    /// Geocode calls run concurrently (the provider is rate-limited, so
    /// in-flight calls are bounded by a semaphore) and results are written
    /// back by row index, so output order is always input order.
    async fn geocode_all(
        &self,
        rows: &[RawFacilityRow],
    ) -> Result<Vec<std::result::Result<Coordinates, GeocodeError>>> {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks: JoinSet<(usize, std::result::Result<Coordinates, GeocodeError>)> =
            JoinSet::new();

        for (idx, row) in rows.iter().enumerate() {
            let geocoder = Arc::clone(&self.geocoder);
            let semaphore = Arc::clone(&semaphore);
            let address = row.address.clone();
            let call_timeout = self.call_timeout;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let result = match timeout(call_timeout, geocoder.geocode(&address)).await {
                    Ok(result) => result,
                    Err(_) => Err(GeocodeError::Timeout(call_timeout.as_secs())),
                };
                (idx, result)
            });
        }

        let mut slots: Vec<Option<std::result::Result<Coordinates, GeocodeError>>> =
            (0..rows.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (idx, result) = joined?;
            slots[idx] = Some(result);
        }

        // One task was spawned per row and all were awaited
        Ok(slots
            .into_iter()
            .map(|slot| slot.expect("geocode slot not filled"))
            .collect())
    }

    #[instrument(skip(self, rows, table), fields(rows = rows.len()))]
    pub async fn join(
        &self,
        rows: &[RawFacilityRow],
        table: &PopulationTable,
    ) -> Result<JoinOutcome> {
        let coordinates = self.geocode_all(rows).await?;

        let mut records = Vec::with_capacity(rows.len());
        let mut geocode_failures = Vec::new();
        let mut invalid_zips = 0;

        for ((idx, row), coords) in rows.iter().enumerate().zip(coordinates) {
            let zip = match zipcode::normalize(&row.zip_code) {
                Ok(zip) => Some(zip),
                Err(e) => {
                    warn!(row = idx, clinic = %row.clinic_name, error = %e,
                        "unparseable zip; record kept without a density key");
                    invalid_zips += 1;
                    None
                }
            };

            // Clinics can sit in zips with no recorded kid population; those
            // default to 0.0. A matched record whose density never got set
            // means a blank label slipped through the build, which is fatal.
            let density = match zip.as_deref().and_then(|z| table.lookup(z)) {
                Some(record) => record
                    .density
                    .ok_or_else(|| PipelineError::BlankDensity(record.zip.clone()))?,
                None => 0.0,
            };

            let (latitude, longitude) = match coords {
                Ok(c) => (Some(c.latitude), Some(c.longitude)),
                Err(error) => {
                    warn!(row = idx, clinic = %row.clinic_name, %error, "geocoding failed");
                    geocode_failures.push(GeocodeFailure {
                        row: idx,
                        name: row.clinic_name.clone(),
                        address: row.address.clone(),
                        error,
                    });
                    (None, None)
                }
            };

            records.push(FacilityRecord {
                name: row.clinic_name.clone(),
                address: row.address.clone(),
                zip,
                acceptance: row.acceptance.clone(),
                notes: row.notes.clone(),
                latitude,
                longitude,
                density,
            });
        }

        debug!(
            records = records.len(),
            failures = geocode_failures.len(),
            "facility join complete"
        );
        Ok(JoinOutcome {
            records,
            geocode_failures,
            invalid_zips,
        })
    }
}
