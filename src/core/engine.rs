use crate::core::Pipeline;
use crate::domain::model::{BasicStats, LookupResults};
use crate::utils::error::Result;
use std::time::Instant;

/// What a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub output_path: String,
    pub dataset: String,
    pub stats: BasicStats,
    pub lookups: LookupResults,
}

pub struct ReportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<ReportOutcome> {
        let started = Instant::now();
        tracing::info!("Starting report run");

        // Extract
        let database = self.pipeline.extract()?;
        tracing::info!("Loaded datasets: {}", database.names().join(", "));

        // Transform
        let report = self.pipeline.transform(database)?;
        tracing::info!(
            "Aggregated {} stays across {} cities and {} countries",
            report.stats.number_of_stays,
            report.cities.len(),
            report.countries.len()
        );

        // Load
        let output_path = self.pipeline.load(&report)?;
        tracing::info!("Report written to {} in {:?}", output_path, started.elapsed());

        Ok(ReportOutcome {
            output_path,
            dataset: report.dataset,
            stats: report.stats,
            lookups: report.lookups,
        })
    }
}
