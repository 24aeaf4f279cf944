use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::density::DensityCodec;
use crate::error::Result;
use crate::joiner::FacilityJoiner;
use crate::population::PopulationTable;
use crate::types::{FacilityRecord, RawFacilityRow, RawPopulationRow};

/// Where a run currently is. Row-local failures (bad zip, failed geocode)
/// never leave the happy path; `Failed` is reserved for structural errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    BuildingPopulation,
    Joining,
    Done,
    Failed,
}

/// Summary of one run, returned alongside the cleaned tables.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub population_rows: usize,
    pub facility_rows: usize,
    pub duplicate_zips: usize,
    pub invalid_population_zips: usize,
    pub invalid_facility_zips: usize,
    pub backfilled_zips: usize,
    /// One line per facility whose address could not be geocoded.
    pub geocode_failures: Vec<String>,
}

/// Orchestrates the cleaning run: build the population table, then join the
/// facility rows against it. Pure sequencing; all real logic lives in
/// `PopulationTable` and `FacilityJoiner`.
pub struct CleaningPipeline {
    codec: DensityCodec,
    joiner: FacilityJoiner,
    state: PipelineState,
}

impl CleaningPipeline {
    pub fn new(codec: DensityCodec, joiner: FacilityJoiner) -> Self {
        Self {
            codec,
            joiner,
            state: PipelineState::NotStarted,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[instrument(skip_all, fields(population_rows = kid_rows.len(), facility_rows = clinic_rows.len()))]
    pub async fn run(
        &mut self,
        kid_rows: &[RawPopulationRow],
        clinic_rows: &[RawFacilityRow],
        reference_zips: &[String],
    ) -> Result<(PopulationTable, Vec<FacilityRecord>, RunReport)> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        counter!("clinic_pipeline_runs_total").increment(1);
        let t_run = std::time::Instant::now();

        self.state = PipelineState::BuildingPopulation;
        info!(%run_id, "building population table");
        let (table, build_stats) =
            match PopulationTable::build(kid_rows, reference_zips, &self.codec) {
                Ok(built) => built,
                Err(e) => {
                    self.state = PipelineState::Failed;
                    return Err(e);
                }
            };

        self.state = PipelineState::Joining;
        info!(zips = table.len(), "joining facilities against population table");
        let outcome = match self.joiner.join(clinic_rows, &table).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state = PipelineState::Failed;
                return Err(e);
            }
        };

        self.state = PipelineState::Done;
        let duration = t_run.elapsed().as_secs_f64();
        histogram!("clinic_pipeline_duration_seconds").record(duration);
        counter!("clinic_geocode_failures_total")
            .increment(outcome.geocode_failures.len() as u64);

        if !outcome.geocode_failures.is_empty() {
            warn!(
                count = outcome.geocode_failures.len(),
                "some facilities could not be geocoded"
            );
        }

        let report = RunReport {
            run_id,
            started_at,
            population_rows: kid_rows.len(),
            facility_rows: clinic_rows.len(),
            duplicate_zips: build_stats.duplicate_zips,
            invalid_population_zips: build_stats.invalid_zips,
            invalid_facility_zips: outcome.invalid_zips,
            backfilled_zips: build_stats.backfilled_zips,
            geocode_failures: outcome
                .geocode_failures
                .iter()
                .map(|f| format!("row {} ({} @ {}): {}", f.row, f.name, f.address, f.error))
                .collect(),
        };

        info!(
            zips = table.len(),
            facilities = outcome.records.len(),
            failures = report.geocode_failures.len(),
            duration_secs = duration,
            "pipeline run complete"
        );
        Ok((table, outcome.records, report))
    }
}
