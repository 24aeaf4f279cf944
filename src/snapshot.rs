use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::Result;
use crate::population::PopulationTable;
use crate::types::{FacilityRecord, ZipRecord};

pub const POPULATION_FILE: &str = "population.csv";
pub const FACILITIES_FILE: &str = "facilities.csv";

/// True when a complete snapshot (both tables) is present.
pub fn exists(dir: &Path) -> bool {
    dir.join(POPULATION_FILE).exists() && dir.join(FACILITIES_FILE).exists()
}

fn write_table<T: serde::Serialize>(dir: &Path, file: &str, rows: &[T]) -> Result<PathBuf> {
    // Write to a temp path, then rename, so readers never see a partial table
    let final_path = dir.join(file);
    let tmp_path = dir.join(format!("{file}.tmp"));
    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, &final_path)?;
    Ok(final_path)
}

/// Writes both cleaned tables. Called exactly once, at the end of a
/// successful run; a run that fails structurally never reaches this.
#[instrument(skip(table, facilities))]
pub fn write(dir: &Path, table: &PopulationTable, facilities: &[FacilityRecord]) -> Result<()> {
    fs::create_dir_all(dir)?;

    let population: Vec<ZipRecord> = table.records().cloned().collect();
    let population_path = write_table(dir, POPULATION_FILE, &population)?;
    let facilities_path = write_table(dir, FACILITIES_FILE, facilities)?;

    info!(
        population = %population_path.display(),
        facilities = %facilities_path.display(),
        "snapshot published"
    );
    Ok(())
}

/// Reloads a previously published snapshot verbatim, in place of re-deriving
/// from raw input and re-calling the geocoder.
pub fn load(dir: &Path) -> Result<(PopulationTable, Vec<FacilityRecord>)> {
    let mut population_reader = csv::Reader::from_path(dir.join(POPULATION_FILE))?;
    let population = population_reader
        .deserialize()
        .collect::<std::result::Result<Vec<ZipRecord>, _>>()?;

    let mut facility_reader = csv::Reader::from_path(dir.join(FACILITIES_FILE))?;
    let facilities = facility_reader
        .deserialize()
        .collect::<std::result::Result<Vec<FacilityRecord>, _>>()?;

    info!(
        zips = population.len(),
        facilities = facilities.len(),
        "loaded cleaned snapshot"
    );
    Ok((PopulationTable::from_records(population), facilities))
}
