use std::path::Path;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::types::{RawFacilityRow, RawPopulationRow};

/// Columns the population sheet must carry. The trailing space in
/// "Density " is real; the source spreadsheet was exported that way.
const POPULATION_COLUMNS: &[&str] = &["Zip code", "Density "];
const FACILITY_COLUMNS: &[&str] = &["Clinic Name", "Address", "Zip code", "Acceptance"];

fn check_columns(headers: &csv::StringRecord, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(PipelineError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

pub fn read_population_rows(path: &Path) -> Result<Vec<RawPopulationRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    check_columns(&reader.headers()?.clone(), POPULATION_COLUMNS)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<RawPopulationRow>, _>>()?;
    info!(rows = rows.len(), path = %path.display(), "read population rows");
    Ok(rows)
}

pub fn read_facility_rows(path: &Path) -> Result<Vec<RawFacilityRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    check_columns(&reader.headers()?.clone(), FACILITY_COLUMNS)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<RawFacilityRow>, _>>()?;
    info!(rows = rows.len(), path = %path.display(), "read facility rows");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_population_rows() {
        let file = write_temp("Zip code,Density \n10001.0,High\n10002,\n");
        let rows = read_population_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].zip_code, "10001.0");
        assert_eq!(rows[0].density, "High");
        assert_eq!(rows[1].density, "");
    }

    #[test]
    fn test_read_population_rejects_missing_column() {
        // "Density" without the trailing space is a different column
        let file = write_temp("Zip code,Density\n10001,High\n");
        assert!(matches!(
            read_population_rows(file.path()),
            Err(PipelineError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_read_facility_rows_carries_notes() {
        let file = write_temp(
            "Clinic Name,Address,Zip code,Acceptance,Notes\nA,1 Main St,10001-0001,yes,walk-ins\n",
        );
        let rows = read_facility_rows(file.path()).unwrap();
        assert_eq!(rows[0].clinic_name, "A");
        assert_eq!(rows[0].notes, "walk-ins");
    }
}
