use std::collections::HashMap;

use tracing::{debug, warn};

use crate::density::DensityCodec;
use crate::error::{PipelineError, Result};
use crate::types::{RawPopulationRow, ZipRecord};
use crate::zipcode;

/// Counts accumulated while building the table, surfaced in the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub duplicate_zips: usize,
    pub invalid_zips: usize,
    pub backfilled_zips: usize,
}

/// Zip-level density records keyed for O(1) joins.
///
/// Built once per run; the key set is exactly the reference universe plus
/// whatever extra zips the raw input carried, each key appearing once.
/// Insertion order (raw rows first, then back-fill) is preserved so snapshot
/// output is deterministic.
pub struct PopulationTable {
    records: HashMap<String, ZipRecord>,
    order: Vec<String>,
}

impl PopulationTable {
    /// Builds the table from raw rows and completes it against the reference
    /// zip universe. Rows with unparseable zips are logged and dropped;
    /// duplicate zips are last-write-wins with a warning; an unknown density
    /// label aborts the build.
    pub fn build(
        rows: &[RawPopulationRow],
        reference_zips: &[String],
        codec: &DensityCodec,
    ) -> Result<(Self, BuildStats)> {
        if reference_zips.is_empty() {
            return Err(PipelineError::EmptyReferenceUniverse);
        }

        let mut table = Self {
            records: HashMap::with_capacity(rows.len() + reference_zips.len()),
            order: Vec::with_capacity(rows.len() + reference_zips.len()),
        };
        let mut stats = BuildStats::default();

        for (idx, row) in rows.iter().enumerate() {
            let zip = match zipcode::normalize(&row.zip_code) {
                Ok(zip) => zip,
                Err(e) => {
                    warn!(row = idx, error = %e, "skipping population row with unparseable zip");
                    stats.invalid_zips += 1;
                    continue;
                }
            };
            let density = codec.encode(&row.density)?;

            let record = ZipRecord {
                zip: zip.clone(),
                density,
            };
            if table.records.insert(zip.clone(), record).is_some() {
                warn!(zip = %zip, "duplicate zip in population input; keeping the later row");
                stats.duplicate_zips += 1;
            } else {
                table.order.push(zip);
            }
        }

        // Every reference zip must end up in the table; zips with no raw row
        // get an explicit 0.0 so the choropleth has a value for each boundary.
        for zip in reference_zips {
            if !table.records.contains_key(zip) {
                table.records.insert(
                    zip.clone(),
                    ZipRecord {
                        zip: zip.clone(),
                        density: Some(0.0),
                    },
                );
                table.order.push(zip.clone());
                stats.backfilled_zips += 1;
            }
        }

        debug!(
            total = table.len(),
            backfilled = stats.backfilled_zips,
            "population table built"
        );
        Ok((table, stats))
    }

    /// Rebuilds a table from already-cleaned records, as loaded from a
    /// snapshot. Record order is preserved.
    pub fn from_records(records: Vec<ZipRecord>) -> Self {
        let mut table = Self {
            records: HashMap::with_capacity(records.len()),
            order: Vec::with_capacity(records.len()),
        };
        for record in records {
            if table
                .records
                .insert(record.zip.clone(), record.clone())
                .is_none()
            {
                table.order.push(record.zip);
            }
        }
        table
    }

    pub fn lookup(&self, zip: &str) -> Option<&ZipRecord> {
        self.records.get(zip)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &ZipRecord> {
        self.order.iter().map(|zip| &self.records[zip])
    }
}
