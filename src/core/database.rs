use crate::adapters::csv_loader::CsvLoader;
use crate::core::aggregator::IntervalAggregator;
use crate::core::summary;
use crate::domain::model::{
    BasicStats, CitySummary, CityYearDays, CountrySummary, LocationAggregate, LocationRecord,
    MatchMode, RankedTotal, YearSummary,
};
use crate::utils::error::{LivedError, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub name: String,
    pub records: Vec<LocationRecord>,
}

/// Location histories loaded from one or more CSV files, one dataset per
/// file keyed by file stem. Lookups without a key use the first dataset.
#[derive(Debug, Clone)]
pub struct LocationDatabase {
    datasets: Vec<Dataset>,
    aggregator: IntervalAggregator,
}

impl LocationDatabase {
    pub fn new(aggregator: IntervalAggregator) -> Self {
        Self {
            datasets: Vec::new(),
            aggregator,
        }
    }

    pub fn from_records(
        name: impl Into<String>,
        records: Vec<LocationRecord>,
        aggregator: IntervalAggregator,
    ) -> Self {
        let mut database = Self::new(aggregator);
        database.insert(name, records);
        database
    }

    /// Loads every path. Files without a `.csv` extension are kept as empty
    /// datasets with a warning.
    pub fn load<P: AsRef<Path>>(
        paths: &[P],
        loader: &CsvLoader,
        aggregator: IntervalAggregator,
    ) -> Result<Self> {
        let mut database = Self::new(aggregator);

        for path in paths {
            let path = path.as_ref();
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();

            let is_csv = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv {
                tracing::warn!("The file {} is not a CSV.", path.display());
                database.insert(name, Vec::new());
                continue;
            }

            let records = loader.load_path(path)?;
            tracing::info!("Loaded {} records from {}", records.len(), path.display());
            database.insert(name, records);
        }

        Ok(database)
    }

    /// Replaces a dataset with the same name, otherwise appends.
    pub fn insert(&mut self, name: impl Into<String>, records: Vec<LocationRecord>) {
        let name = name.into();
        match self.datasets.iter_mut().find(|d| d.name == name) {
            Some(existing) => existing.records = records,
            None => self.datasets.push(Dataset { name, records }),
        }
    }

    pub fn aggregator(&self) -> &IntervalAggregator {
        &self.aggregator
    }

    pub fn names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn dataset(&self, key: Option<&str>) -> Result<&Dataset> {
        match key {
            Some(name) => self.datasets.iter().find(|d| d.name == name),
            None => self.datasets.first(),
        }
        .ok_or_else(|| LivedError::DatasetNotFound {
            name: key.unwrap_or("<default>").to_string(),
        })
    }

    fn records(&self, key: Option<&str>) -> Result<&[LocationRecord]> {
        Ok(&self.dataset(key)?.records)
    }

    pub fn basic_stats(&self, key: Option<&str>) -> Result<BasicStats> {
        summary::basic_stats(&self.aggregator, self.records(key)?)
    }

    pub fn city_summary(&self, key: Option<&str>, city: &str, mode: MatchMode) -> Result<CitySummary> {
        summary::city_summary(&self.aggregator, self.records(key)?, city, mode)
    }

    pub fn country_summary(
        &self,
        key: Option<&str>,
        country: &str,
        mode: MatchMode,
    ) -> Result<CountrySummary> {
        summary::country_summary(&self.aggregator, self.records(key)?, country, mode)
    }

    pub fn year_summary(&self, key: Option<&str>, year: i32) -> Result<YearSummary> {
        summary::year_summary(&self.aggregator, self.records(key)?, year)
    }

    /// Per-city and per-country totals; an empty dataset yields empty maps.
    pub fn location_aggregate(&self, key: Option<&str>) -> Result<LocationAggregate> {
        let records = self.records(key)?;
        if records.is_empty() {
            return Ok(LocationAggregate::default());
        }
        Ok(self.aggregator.aggregate_by_location(records)?)
    }

    pub fn cities_days_lived(&self, key: Option<&str>) -> Result<Vec<RankedTotal>> {
        Ok(self.location_aggregate(key)?.ranked_cities())
    }

    pub fn countries_days_lived(&self, key: Option<&str>) -> Result<Vec<RankedTotal>> {
        Ok(self.location_aggregate(key)?.ranked_countries())
    }

    pub fn city_years(
        &self,
        key: Option<&str>,
        top_n: Option<usize>,
        exclude_top_n: Option<usize>,
    ) -> Result<Vec<CityYearDays>> {
        let records = self.records(key)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .aggregator
            .aggregate_by_year(records, top_n, exclude_top_n)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn aggregator() -> IntervalAggregator {
        IntervalAggregator::new(date(2024, 1, 1))
    }

    #[test]
    fn test_load_keys_datasets_by_stem() {
        let dir = TempDir::new().unwrap();
        let ferran = dir.path().join("ferran.csv");
        let mut file = std::fs::File::create(&ferran).unwrap();
        writeln!(file, "city,country,start_date,end_date").unwrap();
        writeln!(file, "Castelló,Spain,01/01/2020,31/01/2020").unwrap();

        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "not a csv").unwrap();

        let database =
            LocationDatabase::load(&[ferran, notes], &CsvLoader::default(), aggregator()).unwrap();

        assert_eq!(database.names(), vec!["ferran", "notes"]);
        assert_eq!(database.dataset(None).unwrap().records.len(), 1);
        assert!(database.dataset(Some("notes")).unwrap().records.is_empty());
        assert_eq!(
            database.basic_stats(Some("notes")).unwrap(),
            BasicStats::default()
        );
        assert!(database.location_aggregate(Some("notes")).unwrap().cities.is_empty());
    }

    #[test]
    fn test_missing_dataset_is_an_error() {
        let database = LocationDatabase::new(aggregator());
        assert!(matches!(
            database.dataset(None),
            Err(LivedError::DatasetNotFound { .. })
        ));

        let database = LocationDatabase::from_records("a", Vec::new(), aggregator());
        assert!(matches!(
            database.dataset(Some("b")),
            Err(LivedError::DatasetNotFound { name }) if name == "b"
        ));
    }

    #[test]
    fn test_wrappers_use_selected_dataset() {
        let mut database = LocationDatabase::from_records(
            "first",
            vec![LocationRecord::new("Oslo", "Norway", date(2021, 1, 1), Some(date(2021, 1, 10)))],
            aggregator(),
        );
        database.insert(
            "second",
            vec![LocationRecord::new("Kyoto", "Japan", date(2022, 4, 1), Some(date(2022, 4, 30)))],
        );

        assert_eq!(database.cities_days_lived(None).unwrap()[0].name, "Oslo");
        let second = database.countries_days_lived(Some("second")).unwrap();
        assert_eq!(second[0].name, "Japan");
        assert_eq!(second[0].days, 30);

        let rows = database.city_years(Some("second"), Some(1), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year, 2022);
    }
}
