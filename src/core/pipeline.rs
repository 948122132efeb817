use crate::adapters::csv_loader::CsvLoader;
use crate::core::aggregator::{
    check_rank_filter, country_intensities, year_series, IntervalAggregator,
};
use crate::core::database::LocationDatabase;
use crate::core::{ConfigProvider, Pipeline, ReportBundle, Storage};
use crate::domain::model::{LookupRequest, LookupResults};
use crate::utils::error::{LivedError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub struct ReportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ReportPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn aggregator(&self) -> IntervalAggregator {
        match self.config.as_of() {
            Some(as_of) => IntervalAggregator::new(as_of),
            None => IntervalAggregator::today(),
        }
    }

    fn wants(&self, format: &str) -> bool {
        self.config.output_formats().iter().any(|f| f == format)
    }

    /// Renders every requested table as `(file name, contents)`.
    fn render(&self, report: &ReportBundle) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::new();

        if self.wants("csv") {
            files.push(("cities.csv".to_string(), render_totals("city", &report.cities)?));
            files.push((
                "countries.csv".to_string(),
                render_totals("country", &report.countries)?,
            ));
            files.push(("years.csv".to_string(), render_city_years(report)?));
            files.push(("year_series.csv".to_string(), render_year_series(report)?));
            files.push((
                "country_intensity.csv".to_string(),
                render_intensity(report)?,
            ));
        }

        if self.wants("json") {
            files.push((
                "report.json".to_string(),
                serde_json::to_vec_pretty(report)?,
            ));
        }

        Ok(files)
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for ReportPipeline<S, C> {
    fn extract(&self) -> Result<LocationDatabase> {
        let loader = CsvLoader::new(self.config.date_formats().to_vec());
        tracing::debug!("Reading {} input file(s)", self.config.input_files().len());

        LocationDatabase::load(self.config.input_files(), &loader, self.aggregator())
    }

    fn transform(&self, database: LocationDatabase) -> Result<ReportBundle> {
        let top_n = self.config.top_n();
        let exclude_top_n = self.config.exclude_top_n();
        check_rank_filter(top_n, exclude_top_n)?;

        let key = self.config.dataset();
        let dataset = database.dataset(key)?;
        let aggregator = database.aggregator();
        tracing::debug!(
            "Aggregating dataset '{}' ({} records) as of {}",
            dataset.name,
            dataset.records.len(),
            aggregator.as_of()
        );
        if dataset.records.is_empty() {
            tracing::warn!("Dataset '{}' has no records", dataset.name);
        }

        let aggregate = database.location_aggregate(key)?;
        let city_years = database.city_years(key, top_n, exclude_top_n)?;
        let series = year_series(&city_years, self.config.cumulative());

        let LookupRequest {
            cities,
            countries,
            years,
            match_mode,
        } = self.config.lookups();
        let lookups = LookupResults {
            cities: cities
                .iter()
                .map(|city| database.city_summary(key, city, match_mode))
                .collect::<Result<_>>()?,
            countries: countries
                .iter()
                .map(|country| database.country_summary(key, country, match_mode))
                .collect::<Result<_>>()?,
            years: years
                .iter()
                .map(|year| database.year_summary(key, *year))
                .collect::<Result<_>>()?,
        };

        Ok(ReportBundle {
            dataset: dataset.name.clone(),
            as_of: dataset
                .records
                .last()
                .filter(|r| r.end_date.is_none())
                .map(|_| aggregator.as_of()),
            stats: database.basic_stats(key)?,
            cities: aggregate.ranked_cities(),
            countries: aggregate.ranked_countries(),
            country_intensity: country_intensities(&aggregate),
            city_years,
            year_series: series,
            lookups,
        })
    }

    fn load(&self, report: &ReportBundle) -> Result<String> {
        let files = self.render(report)?;
        tracing::debug!("Rendered {} output file(s)", files.len());

        let Some(bundle_name) = self.config.bundle_filename() else {
            for (name, data) in &files {
                self.storage.write_file(name, data)?;
                tracing::debug!("Wrote {} ({} bytes)", name, data.len());
            }
            return Ok(self.config.output_path().to_string());
        };

        // Bundle every table into a single ZIP
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, data) in &files {
                zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                zip.write_all(data)?;
            }
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(bundle_name, &zip_data)?;
        Ok(self.storage.location(bundle_name))
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| LivedError::IoError(e.into_error()))
}

fn render_totals(key: &str, totals: &[crate::domain::model::RankedTotal]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([key, "total_days_lived"])?;
    for total in totals {
        writer.write_record([total.name.clone(), total.days.to_string()])?;
    }
    finish(writer)
}

fn render_city_years(report: &ReportBundle) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["year", "city", "days_lived"])?;
    for row in &report.city_years {
        writer.write_record([row.year.to_string(), row.city.clone(), row.days.to_string()])?;
    }
    finish(writer)
}

fn render_year_series(report: &ReportBundle) -> Result<Vec<u8>> {
    let series = &report.year_series;
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["city".to_string()];
    header.extend(series.years.iter().map(|y| y.to_string()));
    writer.write_record(&header)?;

    for city in &series.series {
        let mut row = vec![city.city.clone()];
        row.extend(city.values.iter().map(|v| v.to_string()));
        writer.write_record(&row)?;
    }
    finish(writer)
}

fn render_intensity(report: &ReportBundle) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["country", "total_days_lived", "intensity"])?;
    for country in &report.country_intensity {
        writer.write_record([
            country.country.clone(),
            country.days.to_string(),
            format!("{:.4}", country.intensity),
        ])?;
    }
    finish(writer)
}
