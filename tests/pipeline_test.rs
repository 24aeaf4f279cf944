use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use clinic_density::density::DensityCodec;
use clinic_density::geocode::{GeocodeError, StubGeocoder};
use clinic_density::joiner::FacilityJoiner;
use clinic_density::pipeline::{CleaningPipeline, PipelineState};
use clinic_density::snapshot;
use clinic_density::types::{RawFacilityRow, RawPopulationRow, ZipRecord};

fn kid_row(zip: &str, density: &str) -> RawPopulationRow {
    RawPopulationRow {
        zip_code: zip.to_string(),
        density: density.to_string(),
    }
}

fn clinic_row(name: &str, address: &str, zip: &str) -> RawFacilityRow {
    RawFacilityRow {
        clinic_name: name.to_string(),
        address: address.to_string(),
        zip_code: zip.to_string(),
        acceptance: "yes".to_string(),
        notes: String::new(),
    }
}

fn pipeline(geocoder: StubGeocoder) -> CleaningPipeline {
    CleaningPipeline::new(
        DensityCodec::new(),
        FacilityJoiner::new(Arc::new(geocoder), 4, Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn test_end_to_end_scenario() -> Result<()> {
    let kid_rows = vec![kid_row("10001.0", "High")];
    let clinic_rows = vec![clinic_row("A", "1 Main St", "10001-0001")];
    let reference = vec!["10001".to_string(), "10002".to_string()];

    let mut pipeline = pipeline(StubGeocoder::returning(40.0, -74.0));
    let (table, facilities, report) = pipeline
        .run(&kid_rows, &clinic_rows, &reference)
        .await?;

    assert_eq!(pipeline.state(), PipelineState::Done);

    // Population table: raw 10001 coded high, 10002 back-filled at 0.0
    assert_eq!(table.len(), 2);
    assert_eq!(table.lookup("10001").unwrap().density, Some(1.0));
    assert_eq!(table.lookup("10002").unwrap().density, Some(0.0));

    // Facility: canonical zip, stub coordinates, density copied from 10001
    let record = &facilities[0];
    assert_eq!(record.zip.as_deref(), Some("10001"));
    assert_eq!(record.latitude, Some(40.0));
    assert_eq!(record.longitude, Some(-74.0));
    assert_eq!(record.density, 1.0);

    assert!(report.geocode_failures.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_geocode_failure_keeps_order_and_reaches_done() -> Result<()> {
    let kid_rows = vec![kid_row("10001", "med")];
    let clinic_rows = vec![
        clinic_row("A", "1 First Ave", "10001"),
        clinic_row("B", "2 Second Ave", "10001"),
        clinic_row("C", "3 Third Ave", "10001"),
    ];
    let reference = vec!["10001".to_string()];

    let mut pipeline = pipeline(
        StubGeocoder::returning(40.0, -74.0).failing_for("2 Second Ave", GeocodeError::NoMatch),
    );
    let (_, facilities, report) = pipeline
        .run(&kid_rows, &clinic_rows, &reference)
        .await?;

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(facilities.len(), 3);

    let names: Vec<_> = facilities.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);

    assert!(facilities[0].latitude.is_some());
    assert_eq!(facilities[1].latitude, None);
    assert_eq!(facilities[1].longitude, None);
    assert!(facilities[2].latitude.is_some());
    assert_eq!(report.geocode_failures.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_round_trip_matches_fresh_run() -> Result<()> {
    let kid_rows = vec![
        kid_row("10001.0", "High"),
        kid_row("11215", "low"),
        kid_row("11430", "missing"),
    ];
    let clinic_rows = vec![
        clinic_row("A", "1 Main St", "10001-0001"),
        clinic_row("B", "2 Side St", "11215.0"),
    ];
    let reference = vec![
        "10001".to_string(),
        "10002".to_string(),
        "11215".to_string(),
        "11430".to_string(),
    ];

    let mut first = pipeline(StubGeocoder::returning(40.7, -73.9));
    let (table, facilities, _) = first.run(&kid_rows, &clinic_rows, &reference).await?;

    let dir = tempfile::tempdir()?;
    snapshot::write(dir.path(), &table, &facilities)?;
    let (loaded_table, loaded_facilities) = snapshot::load(dir.path())?;

    let written: Vec<ZipRecord> = table.records().cloned().collect();
    let reloaded: Vec<ZipRecord> = loaded_table.records().cloned().collect();
    assert_eq!(written, reloaded);
    assert_eq!(facilities, loaded_facilities);

    // A second run over the same inputs and the same deterministic geocoder
    // produces tables equal to the reloaded snapshot.
    let mut second = pipeline(StubGeocoder::returning(40.7, -73.9));
    let (table_again, facilities_again, _) =
        second.run(&kid_rows, &clinic_rows, &reference).await?;
    let rebuilt: Vec<ZipRecord> = table_again.records().cloned().collect();
    assert_eq!(rebuilt, reloaded);
    assert_eq!(facilities_again, loaded_facilities);
    Ok(())
}
